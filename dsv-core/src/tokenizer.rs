use std::error::Error as StdError;
use std::fmt;

/// A record terminator.
///
/// Use this to specify the record terminator while tokenizing. The default is
/// CRLF, which treats `\r`, `\n` or `\r\n` as a single record terminator.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Terminator {
    /// Parses `\r`, `\n` or `\r\n` as a single record terminator.
    CRLF,
    /// Parses the character given as a record terminator.
    Any(char),
}

impl Terminator {
    fn is_crlf(&self) -> bool {
        match *self {
            Terminator::CRLF => true,
            Terminator::Any(_) => false,
        }
    }
}

impl Default for Terminator {
    fn default() -> Terminator {
        Terminator::CRLF
    }
}

impl PartialEq<char> for Terminator {
    #[inline]
    fn eq(&self, &other: &char) -> bool {
        match *self {
            Terminator::CRLF => other == '\r' || other == '\n',
            Terminator::Any(c) => other == c,
        }
    }
}

/// An error produced when a dialect configuration is contradictory.
///
/// A delimiter that collides with a character that is special under the
/// configured dialect (the quote, the record terminator, `\` when backslash
/// escapes are enabled, `#` when comment lines are enabled, `=` when leading
/// equal signs are recognized) would make the grammar ambiguous, so such
/// configurations are rejected before any input is consumed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    /// The delimiter collides with another special character.
    Delimiter(char),
    /// The record terminator collides with another special character.
    Terminator(char),
    /// The quote character collides with another special character.
    Quote(char),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ConfigError::Delimiter(c) => {
                write!(f, "illegal delimiter: {:?}", c)
            }
            ConfigError::Terminator(c) => {
                write!(f, "illegal record terminator: {:?}", c)
            }
            ConfigError::Quote(c) => write!(f, "illegal quote: {:?}", c),
        }
    }
}

impl StdError for ConfigError {}

/// The kind of a grammar violation found while tokenizing.
///
/// All of these are terminal: once one is reported, the tokenizer refuses to
/// make further progress.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParseErrorKind {
    /// The input ended inside a quoted field.
    UnbalancedQuote,
    /// The input ended in the middle of a backslash escape sequence.
    UnbalancedEscape,
    /// A character other than the delimiter or a record terminator followed
    /// the closing quote of a quoted field.
    UnexpectedCharacter {
        /// The offending character.
        found: char,
    },
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ParseErrorKind::UnbalancedQuote => {
                write!(f, "unclosed quote at end of input")
            }
            ParseErrorKind::UnbalancedEscape => {
                write!(f, "unfinished escape sequence at end of input")
            }
            ParseErrorKind::UnexpectedCharacter { found } => {
                write!(f, "unexpected character {:?} after closing quote", found)
            }
        }
    }
}

/// The result of tokenizing at most one boundary from a chunk of input.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Tokenized {
    /// The caller provided input was exhausted before a boundary was found.
    ///
    /// The tokenizer keeps its state, accumulator and balance flags, and
    /// resumes at the first character of the next chunk.
    InputEmpty,
    /// The end of a field was found. The field text is available from
    /// `Tokenizer::field` until the next call.
    Field {
        /// Whether this field also ends its record.
        record_end: bool,
    },
    /// The end of a comment line was found. The comment text is available
    /// from `Tokenizer::comment` until the next call.
    Comment,
    /// All input has been tokenized.
    ///
    /// This is only returned once the caller signals end of input by
    /// providing an empty chunk.
    End,
    /// A grammar violation was found.
    Error(ParseErrorKind),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    StartRecord,
    StartField,
    AfterEqual,
    InField,
    InFieldEscape,
    InQuotedField,
    InQuotedEscape,
    AfterQuote,
    AfterQuotedField,
    InComment,
    InCommentEscape,
    CRLF,
    Failed,
    End,
}

/// A pull based tokenizer for delimiter-separated text.
///
/// The tokenizer is driven by repeatedly calling [`tokenize`] with chunks of
/// decoded text. Each call consumes a prefix of the chunk and reports at most
/// one boundary. An empty chunk signals the end of input; the caller should
/// continue calling `tokenize` with empty input until `Tokenized::End` (or an
/// error) is returned, since the final field, record and document boundaries
/// are reported one at a time.
///
/// Input may be split anywhere. The tokenizer carries its state, its field
/// accumulator and its quote/escape balance across calls, so feeding a
/// document one character at a time produces exactly the same sequence of
/// results as feeding it whole.
///
/// [`tokenize`]: #method.tokenize
#[derive(Clone, Debug)]
pub struct Tokenizer {
    state: State,
    delimiter: char,
    term: Terminator,
    quote: char,
    escapes: bool,
    comments: bool,
    leading_equal: bool,
    sanitize: bool,
    trim: bool,
    /// Field text as it appeared in the input, quoting and escaping intact.
    raw: String,
    /// Field text with quoting and escaping artifacts removed.
    clean: String,
    /// Whether the current field was quoted.
    quoted: bool,
    chars: u64,
    clear_pending: bool,
}

impl Default for Tokenizer {
    fn default() -> Tokenizer {
        Tokenizer {
            state: State::StartRecord,
            delimiter: ',',
            term: Terminator::default(),
            quote: '"',
            escapes: false,
            comments: false,
            leading_equal: false,
            sanitize: true,
            trim: false,
            raw: String::new(),
            clean: String::new(),
            quoted: false,
            chars: 0,
            clear_pending: false,
        }
    }
}

/// Builds a tokenizer with various configuration knobs.
///
/// Once a `Tokenizer` is built, its configuration cannot be changed.
#[derive(Clone, Debug, Default)]
pub struct TokenizerBuilder {
    tok: Tokenizer,
}

impl TokenizerBuilder {
    /// Create a new builder.
    pub fn new() -> TokenizerBuilder {
        TokenizerBuilder::default()
    }

    /// Build a tokenizer from this configuration.
    ///
    /// Contradictory configurations are rejected here, before any input is
    /// consumed.
    pub fn build(&self) -> Result<Tokenizer, ConfigError> {
        let t = &self.tok;
        let d = t.delimiter;
        if d == t.quote
            || t.term == d
            || d == '\r'
            || d == '\n'
            || (t.escapes && d == '\\')
            || (t.comments && d == '#')
            || (t.leading_equal && d == '=')
        {
            return Err(ConfigError::Delimiter(d));
        }
        if let Terminator::Any(c) = t.term {
            if c == t.quote
                || (t.escapes && c == '\\')
                || (t.comments && c == '#')
            {
                return Err(ConfigError::Terminator(c));
            }
        }
        if t.quote == '\r'
            || t.quote == '\n'
            || (t.escapes && t.quote == '\\')
            || (t.comments && t.quote == '#')
            || (t.leading_equal && t.quote == '=')
        {
            return Err(ConfigError::Quote(t.quote));
        }
        Ok(self.tok.clone())
    }

    /// The field delimiter to use when tokenizing.
    ///
    /// The default is `,`.
    pub fn delimiter(&mut self, delimiter: char) -> &mut TokenizerBuilder {
        self.tok.delimiter = delimiter;
        self
    }

    /// The record terminator to use when tokenizing.
    ///
    /// The default is a special value, `Terminator::CRLF`, which treats any
    /// occurrence of `\r`, `\n` or `\r\n` as a single record terminator.
    pub fn terminator(&mut self, term: Terminator) -> &mut TokenizerBuilder {
        self.tok.term = term;
        self
    }

    /// The quote character to use when tokenizing.
    ///
    /// The default is `"`.
    pub fn quote(&mut self, quote: char) -> &mut TokenizerBuilder {
        self.tok.quote = quote;
        self
    }

    /// Recognize `\` as an escape character.
    ///
    /// When enabled, a backslash inside a field (quoted or not) causes the
    /// following character to be taken verbatim. Doubled quotes are
    /// recognized as an escaped quote regardless of this setting.
    ///
    /// This is disabled by default.
    pub fn backslash_escapes(&mut self, yes: bool) -> &mut TokenizerBuilder {
        self.tok.escapes = yes;
        self
    }

    /// Recognize lines starting with `#` as comments.
    ///
    /// A comment line is reported as a single `Tokenized::Comment` boundary.
    /// It does not open a record and does not advance the record count. A
    /// `#` anywhere other than the first column of a record is ordinary
    /// field content.
    ///
    /// This is disabled by default.
    pub fn comments(&mut self, yes: bool) -> &mut TokenizerBuilder {
        self.tok.comments = yes;
        self
    }

    /// Recognize the spreadsheet-style `="…"` forced-text idiom.
    ///
    /// When enabled, an equal sign at the start of a field that is
    /// immediately followed by a quote opens a quoted field, and the equal
    /// sign itself is suppressed from the field text. An equal sign followed
    /// by anything else is ordinary content.
    ///
    /// This is disabled by default.
    pub fn leading_equal(&mut self, yes: bool) -> &mut TokenizerBuilder {
        self.tok.leading_equal = yes;
        self
    }

    /// Strip quoting and escaping artifacts from reported field text.
    ///
    /// When enabled (the default), `"a,b"` is reported as `a,b`, a doubled
    /// quote decodes to one literal quote and escape markers are dropped.
    /// When disabled, fields are reported exactly as they appeared in the
    /// input, quotes and escape markers included.
    pub fn sanitize_fields(&mut self, yes: bool) -> &mut TokenizerBuilder {
        self.tok.sanitize = yes;
        self
    }

    /// Strip leading and trailing whitespace from unquoted fields.
    ///
    /// This also permits whitespace around a quoted field, which is
    /// otherwise an error after the closing quote. Whitespace inside quotes
    /// is always preserved.
    ///
    /// This is disabled by default.
    pub fn trim_whitespace(&mut self, yes: bool) -> &mut TokenizerBuilder {
        self.tok.trim = yes;
        self
    }
}

impl Tokenizer {
    /// Create a new tokenizer with the default configuration.
    pub fn new() -> Tokenizer {
        Tokenizer::default()
    }

    /// Return the number of characters consumed so far.
    pub fn chars_read(&self) -> u64 {
        self.chars
    }

    /// The text of the most recently reported field.
    ///
    /// The sanitize and trim policies are applied here, at emission time,
    /// not during accumulation. The text is valid until the next call to
    /// `tokenize`.
    pub fn field(&self) -> &str {
        let text = if self.sanitize { &self.clean } else { &self.raw };
        if self.trim && !self.quoted {
            text.trim()
        } else {
            text
        }
    }

    /// The text of the most recently reported comment.
    ///
    /// Sanitized comments have the leading `#` removed; raw comments keep
    /// it. The text is valid until the next call to `tokenize`.
    pub fn comment(&self) -> &str {
        let text = if self.sanitize { &self.clean } else { &self.raw };
        if self.trim {
            text.trim()
        } else {
            text
        }
    }

    /// Tokenize a chunk of input, reporting at most one boundary.
    ///
    /// Returns the boundary found (if any) and the number of bytes of
    /// `input` consumed. The caller should slice off the consumed prefix and
    /// call again; `Tokenized::InputEmpty` means the next chunk is needed.
    ///
    /// An empty `input` signals that there is no data left. The caller
    /// should then keep calling `tokenize` with empty input until
    /// `Tokenized::End` or `Tokenized::Error` is returned, since the closing
    /// boundaries are reported one at a time.
    pub fn tokenize(&mut self, input: &str) -> (Tokenized, usize) {
        if self.clear_pending {
            self.clear_pending = false;
            self.raw.clear();
            self.clean.clear();
            self.quoted = false;
        }
        if input.is_empty() {
            return (self.finish(), 0);
        }
        let mut nin = 0;
        let mut iter = input.char_indices().peekable();
        while let Some(&(pos, c)) = iter.peek() {
            // Consumes the peeked character. Transitions that do not invoke
            // this re-examine the same character under the new state.
            macro_rules! bump {
                () => {{
                    iter.next();
                    nin = pos + c.len_utf8();
                    self.chars += 1;
                }};
            }
            match self.state {
                State::StartRecord => {
                    if self.comments && c == '#' {
                        bump!();
                        self.raw.push('#');
                        self.state = State::InComment;
                    } else {
                        self.state = State::StartField;
                    }
                }
                State::StartField => {
                    if c == self.quote {
                        bump!();
                        self.raw.push(self.quote);
                        self.quoted = true;
                        self.state = State::InQuotedField;
                    } else if self.leading_equal && c == '=' {
                        bump!();
                        self.state = State::AfterEqual;
                    } else if c == self.delimiter {
                        bump!();
                        self.state = State::StartField;
                        return (self.emit_field(false), nin);
                    } else if self.term == c {
                        bump!();
                        self.state = self.end_state(c);
                        return (self.emit_field(true), nin);
                    } else if self.trim && self.is_padding(c) {
                        bump!();
                    } else {
                        bump!();
                        self.raw.push(c);
                        self.clean.push(c);
                        self.state = State::InField;
                    }
                }
                State::AfterEqual => {
                    if c == self.quote {
                        bump!();
                        self.raw.push(self.quote);
                        self.quoted = true;
                        self.state = State::InQuotedField;
                    } else {
                        // Not the `="` idiom; the equal sign was content.
                        self.raw.push('=');
                        self.clean.push('=');
                        self.state = State::InField;
                    }
                }
                State::InField => {
                    if self.escapes && c == '\\' {
                        bump!();
                        self.raw.push('\\');
                        self.state = State::InFieldEscape;
                    } else if c == self.delimiter {
                        bump!();
                        self.state = State::StartField;
                        return (self.emit_field(false), nin);
                    } else if self.term == c {
                        bump!();
                        self.state = self.end_state(c);
                        return (self.emit_field(true), nin);
                    } else {
                        bump!();
                        self.raw.push(c);
                        self.clean.push(c);
                    }
                }
                State::InFieldEscape => {
                    bump!();
                    self.raw.push(c);
                    self.clean.push(c);
                    self.state = State::InField;
                }
                State::InQuotedField => {
                    if self.escapes && c == '\\' {
                        bump!();
                        self.raw.push('\\');
                        self.state = State::InQuotedEscape;
                    } else if c == self.quote {
                        bump!();
                        self.state = State::AfterQuote;
                    } else {
                        bump!();
                        self.raw.push(c);
                        self.clean.push(c);
                    }
                }
                State::InQuotedEscape => {
                    bump!();
                    self.raw.push(c);
                    self.clean.push(c);
                    self.state = State::InQuotedField;
                }
                State::AfterQuote => {
                    if c == self.quote {
                        // A doubled quote is one literal quote.
                        bump!();
                        self.raw.push(self.quote);
                        self.raw.push(self.quote);
                        self.clean.push(self.quote);
                        self.state = State::InQuotedField;
                    } else {
                        // The previous quote closed the field.
                        self.raw.push(self.quote);
                        self.state = State::AfterQuotedField;
                    }
                }
                State::AfterQuotedField => {
                    if c == self.delimiter {
                        bump!();
                        self.state = State::StartField;
                        return (self.emit_field(false), nin);
                    } else if self.term == c {
                        bump!();
                        self.state = self.end_state(c);
                        return (self.emit_field(true), nin);
                    } else if self.trim && self.is_padding(c) {
                        bump!();
                    } else {
                        self.state = State::Failed;
                        let kind = ParseErrorKind::UnexpectedCharacter {
                            found: c,
                        };
                        return (Tokenized::Error(kind), nin);
                    }
                }
                State::InComment => {
                    if self.escapes && c == '\\' {
                        bump!();
                        self.raw.push('\\');
                        self.state = State::InCommentEscape;
                    } else if self.term == c {
                        bump!();
                        self.state = self.end_state(c);
                        return (self.emit_comment(), nin);
                    } else {
                        bump!();
                        self.raw.push(c);
                        self.clean.push(c);
                    }
                }
                State::InCommentEscape => {
                    bump!();
                    self.raw.push(c);
                    self.clean.push(c);
                    self.state = State::InComment;
                }
                State::CRLF => {
                    if c == '\n' {
                        bump!();
                    }
                    self.state = State::StartRecord;
                }
                State::Failed | State::End => {
                    return (Tokenized::End, nin);
                }
            }
        }
        (Tokenized::InputEmpty, nin)
    }

    /// Walk the remaining boundaries once the input is exhausted.
    fn finish(&mut self) -> Tokenized {
        match self.state {
            State::StartRecord | State::CRLF | State::End => {
                self.state = State::End;
                Tokenized::End
            }
            State::Failed => Tokenized::End,
            State::StartField | State::InField => {
                self.state = State::End;
                self.emit_field(true)
            }
            State::AfterEqual => {
                self.raw.push('=');
                self.clean.push('=');
                self.state = State::End;
                self.emit_field(true)
            }
            State::AfterQuote => {
                self.raw.push(self.quote);
                self.state = State::End;
                self.emit_field(true)
            }
            State::AfterQuotedField => {
                self.state = State::End;
                self.emit_field(true)
            }
            State::InComment => {
                self.state = State::End;
                self.emit_comment()
            }
            State::InQuotedField => {
                self.state = State::Failed;
                Tokenized::Error(ParseErrorKind::UnbalancedQuote)
            }
            State::InFieldEscape
            | State::InQuotedEscape
            | State::InCommentEscape => {
                self.state = State::Failed;
                Tokenized::Error(ParseErrorKind::UnbalancedEscape)
            }
        }
    }

    fn emit_field(&mut self, record_end: bool) -> Tokenized {
        self.clear_pending = true;
        Tokenized::Field { record_end }
    }

    fn emit_comment(&mut self) -> Tokenized {
        self.clear_pending = true;
        Tokenized::Comment
    }

    fn end_state(&self, c: char) -> State {
        if self.term.is_crlf() && c == '\r' {
            State::CRLF
        } else {
            State::StartRecord
        }
    }

    fn is_padding(&self, c: char) -> bool {
        c.is_whitespace() && c != self.delimiter && !(self.term == c)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ParseErrorKind, Terminator, Tokenized, Tokenizer, TokenizerBuilder,
    };

    #[derive(Debug, Default, Eq, PartialEq)]
    struct Doc {
        rows: Vec<Vec<String>>,
        comments: Vec<String>,
    }

    macro_rules! csv {
        ($([$($field:expr),*]),* $(,)?) => {{
            #[allow(unused_mut)]
            fn x() -> Doc {
                let mut doc = Doc::default();
                $(
                    let mut row: Vec<String> = vec![];
                    $(
                        row.push($field.to_string());
                    )*
                    doc.rows.push(row);
                )*
                doc
            }
            x()
        }};
    }

    fn drive(
        tok: &mut Tokenizer,
        chunks: Vec<&str>,
    ) -> Result<Doc, ParseErrorKind> {
        let mut doc = Doc::default();
        let mut row: Vec<String> = vec![];
        let mut iter = chunks.into_iter();
        let mut chunk = "";
        loop {
            if chunk.is_empty() {
                chunk = iter.next().unwrap_or("");
            }
            let (res, nin) = tok.tokenize(chunk);
            chunk = &chunk[nin..];
            match res {
                Tokenized::InputEmpty => {}
                Tokenized::Field { record_end } => {
                    row.push(tok.field().to_string());
                    if record_end {
                        doc.rows.push(std::mem::replace(&mut row, vec![]));
                    }
                }
                Tokenized::Comment => {
                    doc.comments.push(tok.comment().to_string());
                }
                Tokenized::End => return Ok(doc),
                Tokenized::Error(kind) => return Err(kind),
            }
        }
    }

    fn split_chars(data: &str) -> Vec<&str> {
        let mut chunks = vec![];
        let mut rest = data;
        while let Some(c) = rest.chars().next() {
            let (chunk, tail) = rest.split_at(c.len_utf8());
            chunks.push(chunk);
            rest = tail;
        }
        chunks
    }

    macro_rules! parses_to {
        ($name:ident, $data:expr, $expected:expr) => {
            parses_to!($name, $data, $expected, |builder| builder);
        };
        ($name:ident, $data:expr, $expected:expr, $config:expr) => {
            #[test]
            fn $name() {
                let mut builder = TokenizerBuilder::new();
                $config(&mut builder);
                let mut tok = builder.build().unwrap();
                let got = drive(&mut tok, vec![$data]).unwrap();
                assert_eq!($expected, got, "whole input");

                let mut builder = TokenizerBuilder::new();
                $config(&mut builder);
                let mut tok = builder.build().unwrap();
                let got = drive(&mut tok, split_chars($data)).unwrap();
                assert_eq!($expected, got, "char at a time");
            }
        };
    }

    macro_rules! fails_with {
        ($name:ident, $data:expr, $expected:expr) => {
            fails_with!($name, $data, $expected, |builder| builder);
        };
        ($name:ident, $data:expr, $expected:expr, $config:expr) => {
            #[test]
            fn $name() {
                let mut builder = TokenizerBuilder::new();
                $config(&mut builder);
                let mut tok = builder.build().unwrap();
                let got = drive(&mut tok, vec![$data]).unwrap_err();
                assert_eq!($expected, got, "whole input");

                let mut builder = TokenizerBuilder::new();
                $config(&mut builder);
                let mut tok = builder.build().unwrap();
                let got = drive(&mut tok, split_chars($data)).unwrap_err();
                assert_eq!($expected, got, "char at a time");
            }
        };
    }

    parses_to!(one_row_one_field, "a", csv![["a"]]);
    parses_to!(one_row_many_fields, "a,b,c", csv![["a", "b", "c"]]);
    parses_to!(one_row_trailing_comma, "a,b,", csv![["a", "b", ""]]);
    parses_to!(one_row_one_field_lf, "a\n", csv![["a"]]);
    parses_to!(one_row_many_fields_lf, "a,b,c\n", csv![["a", "b", "c"]]);
    parses_to!(one_row_many_fields_crlf, "a,b,c\r\n", csv![["a", "b", "c"]]);
    parses_to!(one_row_many_fields_cr, "a,b,c\r", csv![["a", "b", "c"]]);
    parses_to!(
        many_rows_many_fields,
        "a,b,c\nx,y,z",
        csv![["a", "b", "c"], ["x", "y", "z"]]
    );
    parses_to!(
        many_rows_many_fields_crlf,
        "a,b,c\r\nx,y,z\r\n",
        csv![["a", "b", "c"], ["x", "y", "z"]]
    );
    parses_to!(
        utf8_fields,
        "a,b,c,ȡ\na,b,c,ƌ",
        csv![["a", "b", "c", "ȡ"], ["a", "b", "c", "ƌ"]]
    );

    parses_to!(empty, "", csv![]);
    parses_to!(empty_field, ",", csv![["", ""]]);
    parses_to!(empty_fields, ",,", csv![["", "", ""]]);
    parses_to!(empty_line_is_empty_record, "\n", csv![[""]]);
    parses_to!(
        empty_lines_between_records,
        "a\n\nb\n",
        csv![["a"], [""], ["b"]]
    );
    parses_to!(empty_line_crlf, "\r\n", csv![[""]]);

    parses_to!(quote_empty, "\"\"", csv![[""]]);
    parses_to!(quoted_delimiter, "a,\"b,c\",d", csv![["a", "b,c", "d"]]);
    parses_to!(quoted_newline, "a,\"b\nc\"", csv![["a", "b\nc"]]);
    parses_to!(quoted_crlf, "\"a\r\nb\"", csv![["a\r\nb"]]);
    parses_to!(doubled_quote, "a,\"b\"\"c\",d", csv![["a", "b\"c", "d"]]);
    parses_to!(inner_quote, "a,b\"c", csv![["a", "b\"c"]]);
    parses_to!(interspersed_quote, "a,b\"c\"", csv![["a", "b\"c\""]]);
    parses_to!(quote_change, "zaz", csv![["a"]], |b: &mut TokenizerBuilder| {
        b.quote('z');
    });

    parses_to!(
        raw_mode_keeps_quotes,
        "\"a\",\"b,c\"",
        csv![["\"a\"", "\"b,c\""]],
        |b: &mut TokenizerBuilder| {
            b.sanitize_fields(false);
        }
    );
    parses_to!(
        raw_mode_keeps_doubled_quotes,
        "\"a\"\"b\"",
        csv![["\"a\"\"b\""]],
        |b: &mut TokenizerBuilder| {
            b.sanitize_fields(false);
        }
    );

    parses_to!(delimiter_tabs, "a\tb", csv![["a", "b"]], |b: &mut TokenizerBuilder| {
        b.delimiter('\t');
    });
    parses_to!(delimiter_weird, "azb", csv![["a", "b"]], |b: &mut TokenizerBuilder| {
        b.delimiter('z');
    });
    parses_to!(
        term_weird,
        "a,bzc,d",
        csv![["a", "b"], ["c", "d"]],
        |b: &mut TokenizerBuilder| {
            b.terminator(Terminator::Any('z'));
        }
    );

    parses_to!(
        backslash_in_unquoted_field,
        "a\\,b,c",
        csv![["a,b", "c"]],
        |b: &mut TokenizerBuilder| {
            b.backslash_escapes(true);
        }
    );
    parses_to!(
        backslash_in_quoted_field,
        "\"a\\\"b\"",
        csv![["a\"b"]],
        |b: &mut TokenizerBuilder| {
            b.backslash_escapes(true);
        }
    );
    parses_to!(
        backslash_keeps_newline,
        "a\\\nb",
        csv![["a\nb"]],
        |b: &mut TokenizerBuilder| {
            b.backslash_escapes(true);
        }
    );
    parses_to!(
        backslash_raw_mode,
        "a\\,b",
        csv![["a\\,b"]],
        |b: &mut TokenizerBuilder| {
            b.backslash_escapes(true).sanitize_fields(false);
        }
    );
    parses_to!(backslash_disabled_is_content, "a\\,b", csv![["a\\", "b"]]);

    parses_to!(
        leading_equal_quoted,
        "=\"0001\",b",
        csv![["0001", "b"]],
        |b: &mut TokenizerBuilder| {
            b.leading_equal(true);
        }
    );
    parses_to!(
        leading_equal_unquoted_is_content,
        "=a,=",
        csv![["=a", "="]],
        |b: &mut TokenizerBuilder| {
            b.leading_equal(true);
        }
    );
    parses_to!(
        leading_equal_disabled_is_content,
        "=\"a\",b",
        csv![["=\"a\"", "b"]]
    );
    parses_to!(
        leading_equal_raw_mode,
        "=\"a\"",
        csv![["\"a\""]],
        |b: &mut TokenizerBuilder| {
            b.leading_equal(true).sanitize_fields(false);
        }
    );

    parses_to!(
        trim_unquoted,
        "  a , b\t\n",
        csv![["a", "b"]],
        |b: &mut TokenizerBuilder| {
            b.trim_whitespace(true);
        }
    );
    parses_to!(
        trim_around_quotes,
        "  \"a b\"  ,c",
        csv![["a b", "c"]],
        |b: &mut TokenizerBuilder| {
            b.trim_whitespace(true);
        }
    );
    parses_to!(
        trim_preserves_quoted_whitespace,
        "\" a \",b",
        csv![[" a ", "b"]],
        |b: &mut TokenizerBuilder| {
            b.trim_whitespace(true);
        }
    );
    parses_to!(no_trim_keeps_whitespace, " a ,b", csv![[" a ", "b"]]);
    parses_to!(
        no_trim_quote_after_space_is_content,
        " \"a\",b",
        csv![[" \"a\"", "b"]]
    );

    parses_to!(
        comment_line,
        "#hello\na,b\n",
        {
            let mut doc = csv![["a", "b"]];
            doc.comments.push("hello".to_string());
            doc
        },
        |b: &mut TokenizerBuilder| {
            b.comments(true);
        }
    );
    parses_to!(
        comment_at_end_of_input,
        "a,b\n#bye",
        {
            let mut doc = csv![["a", "b"]];
            doc.comments.push("bye".to_string());
            doc
        },
        |b: &mut TokenizerBuilder| {
            b.comments(true);
        }
    );
    parses_to!(
        comment_raw_mode_keeps_marker,
        "#hello\n",
        {
            let mut doc = Doc::default();
            doc.comments.push("#hello".to_string());
            doc
        },
        |b: &mut TokenizerBuilder| {
            b.comments(true).sanitize_fields(false);
        }
    );
    parses_to!(
        comment_mid_record_is_content,
        "a,#b\n",
        csv![["a", "#b"]],
        |b: &mut TokenizerBuilder| {
            b.comments(true);
        }
    );
    parses_to!(comments_disabled_is_content, "#a,b\n", csv![["#a", "b"]]);

    fails_with!(
        unterminated_quote,
        "a,\"unterminated\n",
        ParseErrorKind::UnbalancedQuote
    );
    fails_with!(
        junk_after_closing_quote,
        "\"a\"x,b",
        ParseErrorKind::UnexpectedCharacter { found: 'x' }
    );
    fails_with!(
        unbalanced_escape_unquoted,
        "a\\",
        ParseErrorKind::UnbalancedEscape,
        |b: &mut TokenizerBuilder| {
            b.backslash_escapes(true);
        }
    );
    fails_with!(
        unbalanced_escape_quoted,
        "\"a\\",
        ParseErrorKind::UnbalancedEscape,
        |b: &mut TokenizerBuilder| {
            b.backslash_escapes(true);
        }
    );
    fails_with!(
        unbalanced_escape_comment,
        "#a\\",
        ParseErrorKind::UnbalancedEscape,
        |b: &mut TokenizerBuilder| {
            b.comments(true).backslash_escapes(true);
        }
    );
    fails_with!(
        odd_quote_count,
        "\"a\"\"",
        ParseErrorKind::UnbalancedQuote
    );

    #[test]
    fn rows_before_error_are_reported() {
        let mut tok = Tokenizer::new();
        let mut rows = vec![];
        let mut row: Vec<String> = vec![];
        let mut input = "a,b\n\"broken";
        let err = loop {
            let (res, nin) = tok.tokenize(input);
            input = &input[nin..];
            match res {
                Tokenized::InputEmpty => {}
                Tokenized::Field { record_end } => {
                    row.push(tok.field().to_string());
                    if record_end {
                        rows.push(std::mem::replace(&mut row, vec![]));
                    }
                }
                Tokenized::Error(kind) => break kind,
                other => panic!("unexpected result: {:?}", other),
            }
        };
        assert_eq!(rows, vec![vec!["a".to_string(), "b".to_string()]]);
        assert!(row.is_empty(), "no field reported for the broken field");
        assert_eq!(err, ParseErrorKind::UnbalancedQuote);
    }

    #[test]
    fn chars_read_counts_characters() {
        let mut tok = Tokenizer::new();
        let (_, nin) = tok.tokenize("ȡ,b\n");
        assert_eq!(nin, "ȡ,".len());
        assert_eq!(tok.chars_read(), 2);
    }

    #[test]
    fn illegal_delimiter_is_rejected() {
        use super::ConfigError;

        let mut b = TokenizerBuilder::new();
        b.delimiter('#').comments(true);
        assert_eq!(b.build().unwrap_err(), ConfigError::Delimiter('#'));

        let mut b = TokenizerBuilder::new();
        b.delimiter('\\').backslash_escapes(true);
        assert_eq!(b.build().unwrap_err(), ConfigError::Delimiter('\\'));

        let mut b = TokenizerBuilder::new();
        b.delimiter('=').leading_equal(true);
        assert_eq!(b.build().unwrap_err(), ConfigError::Delimiter('='));

        let mut b = TokenizerBuilder::new();
        b.delimiter('"');
        assert_eq!(b.build().unwrap_err(), ConfigError::Delimiter('"'));

        let mut b = TokenizerBuilder::new();
        b.delimiter('\n');
        assert_eq!(b.build().unwrap_err(), ConfigError::Delimiter('\n'));
    }
}
