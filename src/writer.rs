use std::fs::File;
use std::io::{self, Write as IoWrite};
use std::path::Path;
use std::result;

use dsv_core::{ConfigError, QuoteStyle, Terminator};

use crate::error::{Error, Result};

/// The default buffer size for the output stream.
const BUF_SIZE: usize = 8 * 1024;

/// Builds a writer with various dialect and buffering knobs.
#[derive(Clone, Debug)]
pub struct WriterBuilder {
    core: dsv_core::WriterBuilder,
    delimiter: char,
    term: Terminator,
    quote: char,
    style: QuoteStyle,
    capacity: usize,
}

impl Default for WriterBuilder {
    fn default() -> WriterBuilder {
        WriterBuilder {
            core: dsv_core::WriterBuilder::new(),
            delimiter: ',',
            term: Terminator::Any('\n'),
            quote: '"',
            style: QuoteStyle::default(),
            capacity: BUF_SIZE,
        }
    }
}

impl WriterBuilder {
    /// Create a new builder with the default dialect: comma delimited, `\n`
    /// terminated, quoting only where necessary.
    pub fn new() -> WriterBuilder {
        WriterBuilder::default()
    }

    /// The field delimiter to use when writing.
    ///
    /// The default is `,`.
    pub fn delimiter(&mut self, delimiter: char) -> &mut WriterBuilder {
        self.core.delimiter(delimiter);
        self.delimiter = delimiter;
        self
    }

    /// The record terminator to use when writing.
    ///
    /// The default is `Terminator::Any('\n')`; use `Terminator::CRLF` for
    /// `\r\n` line endings.
    pub fn terminator(&mut self, term: Terminator) -> &mut WriterBuilder {
        self.core.terminator(term);
        self.term = term;
        self
    }

    /// The quote character to use when writing.
    ///
    /// The default is `"`.
    pub fn quote(&mut self, quote: char) -> &mut WriterBuilder {
        self.core.quote(quote);
        self.quote = quote;
        self
    }

    /// The quoting style to use when writing.
    ///
    /// The default, `QuoteStyle::Necessary`, quotes a field only when
    /// leaving it bare would change how it reads back.
    pub fn quote_style(&mut self, style: QuoteStyle) -> &mut WriterBuilder {
        self.style = style;
        self
    }

    /// The escape character used for quotes when `double_quote` is
    /// disabled. The default is `\`.
    pub fn escape(&mut self, escape: char) -> &mut WriterBuilder {
        self.core.escape(escape);
        self
    }

    /// The quoting escape mechanism: doubled quotes when enabled (the
    /// default), the escape character otherwise.
    pub fn double_quote(&mut self, yes: bool) -> &mut WriterBuilder {
        self.core.double_quote(yes);
        self
    }

    /// Declare that the dialect recognizes `\` escapes, so backslashes in
    /// field text are protected. Disabled by default.
    pub fn backslash_escapes(&mut self, yes: bool) -> &mut WriterBuilder {
        self.core.backslash_escapes(yes);
        self
    }

    /// Declare that the dialect recognizes `#` comment lines, so a leading
    /// `#` in the first column is protected. Disabled by default.
    pub fn comments(&mut self, yes: bool) -> &mut WriterBuilder {
        self.core.comments(yes);
        self
    }

    /// Declare that the dialect recognizes the `="…"` idiom, so a leading
    /// `=` is protected. Disabled by default.
    pub fn leading_equal(&mut self, yes: bool) -> &mut WriterBuilder {
        self.core.leading_equal(yes);
        self
    }

    /// The size of the output buffer.
    pub fn buffer_capacity(&mut self, capacity: usize) -> &mut WriterBuilder {
        self.capacity = capacity.max(1);
        self
    }

    /// Build a writer that writes to an arbitrary `io::Write`.
    pub fn from_writer<W: IoWrite>(&self, wtr: W) -> Writer<W> {
        Writer {
            out: io::BufWriter::with_capacity(self.capacity, wtr),
            engine: self.core.build(),
            style: self.style,
            delimiter: self.delimiter,
            term: self.term,
            quote: self.quote,
            fields_in_record: 0,
            pending_empty: false,
            scratch: String::new(),
        }
    }

    /// Build a writer that writes to the file at the path given. The file
    /// is created if it does not exist and truncated otherwise.
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Writer<File>> {
        Ok(self.from_writer(File::create(path)?))
    }
}

/// A streaming writer for delimited text.
///
/// The writer is the structural inverse of the parser: fields it writes
/// read back as the same fields under the same dialect. Quoting is decided
/// per field according to the configured `QuoteStyle`.
///
/// Output is buffered; call `flush` (or drop the writer, or `into_inner`)
/// to see it on the underlying stream. A contradictory dialect
/// configuration is reported by the first operation.
///
/// # Example
///
/// ```
/// use dsv::WriterBuilder;
///
/// # fn main() -> Result<(), dsv::Error> {
/// let mut wtr = WriterBuilder::new().from_writer(vec![]);
/// wtr.write_field("x,y")?;
/// wtr.write_field("z")?;
/// wtr.finish_line()?;
/// let out = wtr.into_inner()?;
/// assert_eq!(out, b"\"x,y\",z\n".to_vec());
/// # Ok(())
/// # }
/// ```
pub struct Writer<W: IoWrite> {
    out: io::BufWriter<W>,
    engine: result::Result<dsv_core::Writer, ConfigError>,
    style: QuoteStyle,
    delimiter: char,
    term: Terminator,
    quote: char,
    fields_in_record: u64,
    /// Whether the record so far consists of exactly one empty field whose
    /// rendering is being deferred; see `finish_line`.
    pending_empty: bool,
    scratch: String,
}

impl Writer<Vec<u8>> {
    /// Create a writer with the default dialect that accumulates output in
    /// memory.
    pub fn from_memory() -> Writer<Vec<u8>> {
        WriterBuilder::new().from_writer(Vec::with_capacity(BUF_SIZE))
    }
}

impl<W: IoWrite> Writer<W> {
    /// Append one field to the current record, preceded by a delimiter if
    /// it is not the record's first field.
    ///
    /// The field is quoted and escaped as the dialect and quote style
    /// require.
    pub fn write_field<T: AsRef<str>>(&mut self, field: T) -> Result<()> {
        let field = field.as_ref();
        let engine = match self.engine {
            Ok(ref engine) => engine,
            Err(ref err) => return Err(Error::Config(err.clone())),
        };
        let always = match self.style {
            QuoteStyle::Always => true,
            _ => false,
        };
        if self.fields_in_record == 0 && field.is_empty() && !always {
            // A record holding exactly one empty field must be written as
            // `""` so it doesn't read back as an empty line; whether that's
            // needed isn't known until the record ends, so hold it back.
            self.pending_empty = true;
            self.fields_in_record = 1;
            return Ok(());
        }
        let first = self.fields_in_record == 0;
        if !first {
            self.pending_empty = false;
            write_char(&mut self.out, self.delimiter)?;
        }
        let quote = match self.style {
            QuoteStyle::Always => true,
            QuoteStyle::Necessary => engine.needs_quotes(field, first),
            QuoteStyle::Never => {
                if engine.needs_quotes(field, first) {
                    return Err(Error::Quote { field: field.to_string() });
                }
                false
            }
        };
        if quote {
            self.scratch.clear();
            engine.quoted_field_into(field, &mut self.scratch);
            self.out.write_all(self.scratch.as_bytes())?;
        } else {
            self.out.write_all(field.as_bytes())?;
        }
        self.fields_in_record += 1;
        Ok(())
    }

    /// Terminate the current record.
    ///
    /// A record that holds exactly one empty field is written as `""`; a
    /// record with no fields at all is written as a bare terminator.
    pub fn finish_line(&mut self) -> Result<()> {
        self.check()?;
        if self.pending_empty {
            write_char(&mut self.out, self.quote)?;
            write_char(&mut self.out, self.quote)?;
            self.pending_empty = false;
        }
        self.write_terminator()?;
        self.fields_in_record = 0;
        Ok(())
    }

    /// Write each field of `record`, then terminate the line.
    pub fn write_record<I, T>(&mut self, record: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        for field in record {
            self.write_field(field)?;
        }
        self.finish_line()
    }

    /// Write a `#`-prefixed comment line, bypassing field quoting.
    ///
    /// If a record is in progress it is terminated first. Text containing
    /// record terminators is split into one comment line per segment, since
    /// a comment cannot span lines.
    pub fn write_comment(&mut self, comment: &str) -> Result<()> {
        self.check()?;
        if self.fields_in_record > 0 {
            self.finish_line()?;
        }
        let lines: Vec<&str> = match self.term {
            Terminator::CRLF => comment.lines().collect(),
            Terminator::Any(c) => comment.split(c).collect(),
        };
        // An empty comment still produces one `#` line.
        let lines = if lines.is_empty() { vec![""] } else { lines };
        for line in lines {
            self.out.write_all(b"#")?;
            self.out.write_all(line.as_bytes())?;
            self.write_terminator()?;
        }
        Ok(())
    }

    /// Flush the output buffer to the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    /// Flush and return the underlying stream.
    pub fn into_inner(self) -> Result<W> {
        self.out.into_inner().map_err(|err| Error::Io(err.into_error()))
    }

    fn write_terminator(&mut self) -> Result<()> {
        match self.term {
            Terminator::CRLF => self.out.write_all(b"\r\n")?,
            Terminator::Any(c) => write_char(&mut self.out, c)?,
        }
        Ok(())
    }

    fn check(&self) -> Result<()> {
        match self.engine {
            Ok(_) => Ok(()),
            Err(ref err) => Err(Error::Config(err.clone())),
        }
    }
}

fn write_char<W: IoWrite>(out: &mut W, c: char) -> io::Result<()> {
    let mut buf = [0; 4];
    out.write_all(c.encode_utf8(&mut buf).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::{Writer, WriterBuilder};
    use dsv_core::{QuoteStyle, Terminator};
    use crate::error::Error;

    fn output(wtr: Writer<Vec<u8>>) -> String {
        String::from_utf8(wtr.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn plain_record() {
        let mut wtr = Writer::from_memory();
        wtr.write_record(&["a", "b", "c"]).unwrap();
        assert_eq!(output(wtr), "a,b,c\n");
    }

    #[test]
    fn fields_needing_quotes_are_quoted() {
        let mut wtr = Writer::from_memory();
        wtr.write_record(&["x,y", "z"]).unwrap();
        assert_eq!(output(wtr), "\"x,y\",z\n");
    }

    #[test]
    fn embedded_quote_is_doubled() {
        let mut wtr = Writer::from_memory();
        wtr.write_record(&["b\"c"]).unwrap();
        assert_eq!(output(wtr), "\"b\"\"c\"\n");
    }

    #[test]
    fn sole_empty_field_is_quoted() {
        let mut wtr = Writer::from_memory();
        wtr.write_record(&[""]).unwrap();
        assert_eq!(output(wtr), "\"\"\n");
    }

    #[test]
    fn leading_empty_field_before_others_is_bare() {
        let mut wtr = Writer::from_memory();
        wtr.write_record(&["", "z"]).unwrap();
        assert_eq!(output(wtr), ",z\n");
    }

    #[test]
    fn trailing_empty_field_is_bare() {
        let mut wtr = Writer::from_memory();
        wtr.write_record(&["a", ""]).unwrap();
        assert_eq!(output(wtr), "a,\n");
    }

    #[test]
    fn empty_record_is_bare_terminator() {
        let mut wtr = Writer::from_memory();
        wtr.finish_line().unwrap();
        assert_eq!(output(wtr), "\n");
    }

    #[test]
    fn crlf_terminator() {
        let mut wtr =
            WriterBuilder::new().terminator(Terminator::CRLF).from_writer(vec![]);
        wtr.write_record(&["a", "b"]).unwrap();
        assert_eq!(output(wtr), "a,b\r\n");
    }

    #[test]
    fn always_quote_style() {
        let mut wtr = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .from_writer(vec![]);
        wtr.write_record(&["a", ""]).unwrap();
        assert_eq!(output(wtr), "\"a\",\"\"\n");
    }

    #[test]
    fn never_quote_style_rejects_special_fields() {
        let mut wtr = WriterBuilder::new()
            .quote_style(QuoteStyle::Never)
            .from_writer(vec![]);
        let err = wtr.write_field("a,b").unwrap_err();
        match err {
            Error::Quote { field } => assert_eq!(field, "a,b"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn comment_finishes_open_record_and_splits_lines() {
        let mut wtr = WriterBuilder::new().comments(true).from_writer(vec![]);
        wtr.write_field("a").unwrap();
        wtr.write_comment("one\ntwo").unwrap();
        assert_eq!(output(wtr), "a\n#one\n#two\n");
    }

    #[test]
    fn comment_marker_in_first_column_is_protected() {
        let mut wtr = WriterBuilder::new().comments(true).from_writer(vec![]);
        wtr.write_record(&["#x", "#y"]).unwrap();
        assert_eq!(output(wtr), "\"#x\",#y\n");
    }

    #[test]
    fn config_error_surfaces_at_first_write() {
        let mut wtr = WriterBuilder::new()
            .delimiter('#')
            .comments(true)
            .from_writer(vec![]);
        let err = wtr.write_field("a").unwrap_err();
        match err {
            Error::Config(_) => {}
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn semicolon_dialect() {
        let mut wtr = WriterBuilder::new().delimiter(';').from_writer(vec![]);
        wtr.write_record(&["a;b", "c,d"]).unwrap();
        assert_eq!(output(wtr), "\"a;b\";c,d\n");
    }
}
