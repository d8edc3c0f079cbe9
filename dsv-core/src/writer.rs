use memchr::{memchr, memchr2};

use crate::tokenizer::{ConfigError, Terminator};

/// The quoting style to use when writing delimited text.
#[derive(Clone, Copy, Debug)]
pub enum QuoteStyle {
    /// This puts quotes around every field. Always.
    Always,
    /// This puts quotes around fields only when necessary.
    ///
    /// They are necessary when a field contains the delimiter, the quote
    /// character, a record terminator, a backslash when backslash escapes
    /// are in use, or when its first character would be misread as a comment
    /// marker or a leading equal sign under the configured dialect.
    ///
    /// This is the default.
    Necessary,
    /// This *never* writes quotes.
    ///
    /// If a field requires quotes, then the writer will report an error.
    Never,
}

impl Default for QuoteStyle {
    fn default() -> QuoteStyle {
        QuoteStyle::Necessary
    }
}

/// A builder for configuring a field escaper.
#[derive(Clone, Debug, Default)]
pub struct WriterBuilder {
    wtr: Writer,
}

impl WriterBuilder {
    /// Create a new builder for configuring a field escaper.
    pub fn new() -> WriterBuilder {
        WriterBuilder::default()
    }

    /// Build a field escaper from this configuration.
    ///
    /// Contradictory configurations are rejected here, before any field is
    /// written.
    pub fn build(&self) -> Result<Writer, ConfigError> {
        let w = &self.wtr;
        let d = w.delimiter;
        if d == w.quote
            || w.term == d
            || d == '\r'
            || d == '\n'
            || (w.escapes && d == '\\')
            || (w.comments && d == '#')
            || (w.leading_equal && d == '=')
        {
            return Err(ConfigError::Delimiter(d));
        }
        if let Terminator::Any(c) = w.term {
            if c == w.quote
                || (w.escapes && c == '\\')
                || (w.comments && c == '#')
            {
                return Err(ConfigError::Terminator(c));
            }
        }
        if w.quote == '\r' || w.quote == '\n' || (w.escapes && w.quote == '\\')
        {
            return Err(ConfigError::Quote(w.quote));
        }
        Ok(self.wtr.clone())
    }

    /// The field delimiter to use when writing.
    ///
    /// The default is `,`.
    pub fn delimiter(&mut self, delimiter: char) -> &mut WriterBuilder {
        self.wtr.delimiter = delimiter;
        self
    }

    /// The record terminator to use when writing.
    ///
    /// The default is `Terminator::Any('\n')`. Use `Terminator::CRLF` for
    /// `\r\n` line endings.
    pub fn terminator(&mut self, term: Terminator) -> &mut WriterBuilder {
        self.wtr.term = term;
        self
    }

    /// The quote character to use when writing.
    ///
    /// The default is `"`.
    pub fn quote(&mut self, quote: char) -> &mut WriterBuilder {
        self.wtr.quote = quote;
        self
    }

    /// The escape character used to escape quotes when `double_quote` is
    /// disabled.
    ///
    /// The default is `\`.
    pub fn escape(&mut self, escape: char) -> &mut WriterBuilder {
        self.wtr.escape = escape;
        self
    }

    /// The quoting escape mechanism to use when writing.
    ///
    /// When enabled (which is the default), quotes are escaped by doubling
    /// them. e.g., `"` escapes to `""`.
    ///
    /// When disabled, quotes are escaped with the escape character (which
    /// is `\` by default).
    pub fn double_quote(&mut self, yes: bool) -> &mut WriterBuilder {
        self.wtr.double_quote = yes;
        self
    }

    /// Declare that the dialect being written recognizes `\` as an escape
    /// character.
    ///
    /// Fields containing a backslash are then quoted and the backslash is
    /// written as `\\` so it reads back as one literal backslash.
    ///
    /// This is disabled by default.
    pub fn backslash_escapes(&mut self, yes: bool) -> &mut WriterBuilder {
        self.wtr.escapes = yes;
        self
    }

    /// Declare that the dialect being written recognizes `#` comment lines.
    ///
    /// A field starting with `#` in the first column of a record is then
    /// quoted so it does not read back as a comment.
    ///
    /// This is disabled by default.
    pub fn comments(&mut self, yes: bool) -> &mut WriterBuilder {
        self.wtr.comments = yes;
        self
    }

    /// Declare that the dialect being written recognizes the `="…"` idiom.
    ///
    /// A field starting with `=` is then quoted so it does not read back
    /// with its equal sign suppressed.
    ///
    /// This is disabled by default.
    pub fn leading_equal(&mut self, yes: bool) -> &mut WriterBuilder {
        self.wtr.leading_equal = yes;
        self
    }
}

/// A field escaper for delimited text.
///
/// This is the structural inverse of the tokenizer: a field passed through
/// [`quoted_field_into`] and re-tokenized under the same dialect yields the
/// original text. The escaper produces text only; the caller owns the output
/// destination and the delimiter/terminator bookkeeping.
///
/// [`quoted_field_into`]: #method.quoted_field_into
#[derive(Clone, Debug)]
pub struct Writer {
    delimiter: char,
    term: Terminator,
    quote: char,
    escape: char,
    double_quote: bool,
    escapes: bool,
    comments: bool,
    leading_equal: bool,
}

impl Default for Writer {
    fn default() -> Writer {
        Writer {
            delimiter: ',',
            term: Terminator::Any('\n'),
            quote: '"',
            escape: '\\',
            double_quote: true,
            escapes: false,
            comments: false,
            leading_equal: false,
        }
    }
}

impl Writer {
    /// Creates a new field escaper with the default configuration.
    pub fn new() -> Writer {
        Writer::default()
    }

    /// The configured field delimiter.
    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// The configured record terminator.
    pub fn terminator(&self) -> Terminator {
        self.term
    }

    /// The configured quote character.
    pub fn quote(&self) -> char {
        self.quote
    }

    /// Returns true if and only if writing this field without quotes would
    /// not read back as the same field under the configured dialect.
    ///
    /// `first_in_record` distinguishes the first column, where a leading `#`
    /// would otherwise start a comment line.
    pub fn needs_quotes(&self, field: &str, first_in_record: bool) -> bool {
        let bytes = field.as_bytes();
        if memchr2(b'\r', b'\n', bytes).is_some() {
            return true;
        }
        if contains_char(field, self.quote) {
            return true;
        }
        if contains_char(field, self.delimiter) {
            return true;
        }
        if let Terminator::Any(c) = self.term {
            if contains_char(field, c) {
                return true;
            }
        }
        if self.escapes && memchr(b'\\', bytes).is_some() {
            return true;
        }
        if self.comments && first_in_record && field.starts_with('#') {
            return true;
        }
        if self.leading_equal && field.starts_with('=') {
            return true;
        }
        false
    }

    /// Append the quoted, escaped rendition of `field` to `dst`.
    ///
    /// Quote characters are doubled (or escaped, when `double_quote` is
    /// disabled) and backslashes are self-escaped when the dialect
    /// recognizes them.
    pub fn quoted_field_into(&self, field: &str, dst: &mut String) {
        dst.reserve(field.len() + 2);
        dst.push(self.quote);
        for c in field.chars() {
            if c == self.quote {
                if self.double_quote {
                    dst.push(self.quote);
                    dst.push(self.quote);
                } else {
                    dst.push(self.escape);
                    dst.push(self.quote);
                }
            } else if self.escapes && c == '\\' {
                dst.push('\\');
                dst.push('\\');
            } else {
                dst.push(c);
            }
        }
        dst.push(self.quote);
    }
}

fn contains_char(s: &str, c: char) -> bool {
    if c.is_ascii() {
        memchr(c as u8, s.as_bytes()).is_some()
    } else {
        s.contains(c)
    }
}

#[cfg(test)]
mod tests {
    use super::{Writer, WriterBuilder};
    use crate::tokenizer::{ConfigError, Terminator};

    fn quoted(wtr: &Writer, field: &str) -> String {
        let mut out = String::new();
        wtr.quoted_field_into(field, &mut out);
        out
    }

    #[test]
    fn plain_fields_need_no_quotes() {
        let wtr = Writer::new();
        assert!(!wtr.needs_quotes("abc", true));
        assert!(!wtr.needs_quotes("", false));
        assert!(!wtr.needs_quotes("#note", false));
        assert!(!wtr.needs_quotes("=1", true));
    }

    #[test]
    fn special_characters_need_quotes() {
        let wtr = Writer::new();
        assert!(wtr.needs_quotes("a,b", false));
        assert!(wtr.needs_quotes("a\"b", false));
        assert!(wtr.needs_quotes("a\nb", false));
        assert!(wtr.needs_quotes("a\rb", false));
    }

    #[test]
    fn dialect_extensions_extend_the_trigger_set() {
        let mut b = WriterBuilder::new();
        b.backslash_escapes(true).comments(true).leading_equal(true);
        let wtr = b.build().unwrap();
        assert!(wtr.needs_quotes("a\\b", false));
        assert!(wtr.needs_quotes("#note", true));
        assert!(!wtr.needs_quotes("#note", false));
        assert!(wtr.needs_quotes("=1", true));
    }

    #[test]
    fn quotes_are_doubled() {
        let wtr = Writer::new();
        assert_eq!(quoted(&wtr, "a\"b"), "\"a\"\"b\"");
        assert_eq!(quoted(&wtr, ""), "\"\"");
    }

    #[test]
    fn quotes_are_escaped_without_double_quote() {
        let mut b = WriterBuilder::new();
        b.double_quote(false);
        let wtr = b.build().unwrap();
        assert_eq!(quoted(&wtr, "a\"b"), "\"a\\\"b\"");
    }

    #[test]
    fn backslashes_are_self_escaped() {
        let mut b = WriterBuilder::new();
        b.backslash_escapes(true);
        let wtr = b.build().unwrap();
        assert_eq!(quoted(&wtr, "a\\b"), "\"a\\\\b\"");
    }

    #[test]
    fn custom_terminator_triggers_quoting() {
        let mut b = WriterBuilder::new();
        b.terminator(Terminator::Any(';'));
        let wtr = b.build().unwrap();
        assert!(wtr.needs_quotes("a;b", false));
    }

    #[test]
    fn illegal_configurations_are_rejected() {
        let mut b = WriterBuilder::new();
        b.delimiter('#').comments(true);
        assert_eq!(b.build().unwrap_err(), ConfigError::Delimiter('#'));

        let mut b = WriterBuilder::new();
        b.delimiter(';').terminator(Terminator::Any(';'));
        assert_eq!(b.build().unwrap_err(), ConfigError::Delimiter(';'));
    }
}
