use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dsv_core::{Terminator, Tokenized, Tokenizer, TokenizerBuilder};

use crate::decode::StreamDecoder;
use crate::error::{Error, Result};
use crate::events::{EventSink, RecordCollector};
use crate::progress::{Position, Progress};

/// The default size of the chunks requested from the source.
const BUF_SIZE: usize = 8 * 1024;

/// A handle for requesting that a running parse stop.
///
/// The token is cheap to clone and may be triggered from an event callback
/// or from another thread. Cancellation is cooperative: the parser checks
/// the token between events, stops emitting record and field events once it
/// observes the request, and reports a single `Error::Cancelled` failure.
/// Cancelling an already-finished or already-cancelled parse is a no-op.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that is not yet cancelled.
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns true if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Builds a parser with various dialect and buffering knobs.
///
/// The builder may be reused to construct any number of parsers; each
/// parser's configuration is fixed once it is built.
#[derive(Clone, Debug, Default)]
pub struct ParserBuilder {
    core: TokenizerBuilder,
    capacity: usize,
}

impl ParserBuilder {
    /// Create a new builder with the default dialect: comma delimited,
    /// CRLF-tolerant, quotes decoded, no extensions.
    pub fn new() -> ParserBuilder {
        ParserBuilder { core: TokenizerBuilder::new(), capacity: BUF_SIZE }
    }

    /// The field delimiter to use when parsing.
    ///
    /// The default is `,`.
    pub fn delimiter(&mut self, delimiter: char) -> &mut ParserBuilder {
        self.core.delimiter(delimiter);
        self
    }

    /// The record terminator to use when parsing.
    ///
    /// The default, `Terminator::CRLF`, treats `\r`, `\n` or `\r\n` as a
    /// single record terminator.
    pub fn terminator(&mut self, term: Terminator) -> &mut ParserBuilder {
        self.core.terminator(term);
        self
    }

    /// The quote character to use when parsing.
    ///
    /// The default is `"`.
    pub fn quote(&mut self, quote: char) -> &mut ParserBuilder {
        self.core.quote(quote);
        self
    }

    /// Recognize `\` as an escape character taking the following character
    /// verbatim. Disabled by default.
    pub fn backslash_escapes(&mut self, yes: bool) -> &mut ParserBuilder {
        self.core.backslash_escapes(yes);
        self
    }

    /// Recognize lines starting with `#` as comment lines, reported through
    /// `on_comment` rather than as records. Disabled by default.
    pub fn comments(&mut self, yes: bool) -> &mut ParserBuilder {
        self.core.comments(yes);
        self
    }

    /// Recognize the spreadsheet-style `="…"` forced-text idiom.
    /// Disabled by default.
    pub fn leading_equal(&mut self, yes: bool) -> &mut ParserBuilder {
        self.core.leading_equal(yes);
        self
    }

    /// Strip quoting and escaping artifacts from reported field text.
    /// Enabled by default; disable to receive fields exactly as they
    /// appeared in the input.
    pub fn sanitize_fields(&mut self, yes: bool) -> &mut ParserBuilder {
        self.core.sanitize_fields(yes);
        self
    }

    /// Strip leading and trailing whitespace from unquoted fields and
    /// permit whitespace around quoted ones. Whitespace inside quotes is
    /// always preserved. Disabled by default.
    pub fn trim_whitespace(&mut self, yes: bool) -> &mut ParserBuilder {
        self.core.trim_whitespace(yes);
        self
    }

    /// The size of the chunks requested from the source.
    ///
    /// This bounds how much of the input is resident at a time; it has no
    /// effect on what is parsed.
    pub fn buffer_capacity(&mut self, capacity: usize) -> &mut ParserBuilder {
        self.capacity = capacity.max(1);
        self
    }

    /// Build a parser that reads from an arbitrary `io::Read`.
    pub fn from_reader<R: Read>(&self, rdr: R) -> Parser<R> {
        Parser {
            rdr,
            core: self.core.clone(),
            capacity: self.capacity,
            cancel: CancelToken::new(),
            progress: Progress::new(),
        }
    }

    /// Build a parser that reads from the file at the path given.
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Parser<File>> {
        Ok(self.from_reader(File::open(path)?))
    }

    /// Build a parser that reads from a string in memory.
    pub fn from_str(&self, data: &str) -> Parser<io::Cursor<Vec<u8>>> {
        self.from_reader(io::Cursor::new(data.as_bytes().to_vec()))
    }

    /// Parse a string and collect the records.
    ///
    /// This is the convenience path for callers that want the parsed rows
    /// and nothing else.
    pub fn records_from_str(&self, data: &str) -> Result<Vec<Vec<String>>> {
        let mut sink = RecordCollector::new();
        self.from_str(data).parse(&mut sink)?;
        sink.into_result()
    }

    /// Parse the file at the path given and collect the records.
    pub fn records_from_path<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<Vec<Vec<String>>> {
        let mut sink = RecordCollector::new();
        self.from_path(path)?.parse(&mut sink)?;
        sink.into_result()
    }

    #[cfg(feature = "async")]
    pub(crate) fn core(&self) -> &TokenizerBuilder {
        &self.core
    }

    #[cfg(feature = "async")]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }
}

/// A streaming parser over a byte source.
///
/// A parser parses its source exactly once: `parse` consumes the instance
/// and drives the source to completion, cancellation or failure, pushing
/// events into the sink as it recognizes them. Chunks are requested from
/// the source on demand, so the whole input is never resident in memory.
///
/// # Example
///
/// ```
/// use dsv::{ParserBuilder, RecordCollector};
///
/// # fn main() -> Result<(), dsv::Error> {
/// let mut sink = RecordCollector::new();
/// ParserBuilder::new()
///     .from_str("a,\"b,c\",d\n")
///     .parse(&mut sink)?;
/// assert_eq!(sink.records()[0], vec!["a", "b,c", "d"]);
/// # Ok(())
/// # }
/// ```
pub struct Parser<R> {
    rdr: R,
    core: TokenizerBuilder,
    capacity: usize,
    cancel: CancelToken,
    progress: Progress,
}

impl<R: Read> Parser<R> {
    /// A token that cancels this parse when triggered.
    ///
    /// Clone it out before calling `parse` to cancel from an event callback
    /// or from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// A handle reporting this parse's progress: bytes read and, once
    /// resolved, the input's character encoding.
    pub fn progress(&self) -> Progress {
        self.progress.clone()
    }

    /// Parse the source to completion, pushing events into `sink`.
    ///
    /// On success the sink sees `on_document_end` and `Ok(())` is returned.
    /// On failure the sink sees exactly one `on_failure` and the same error
    /// is returned. A contradictory dialect configuration is reported
    /// through the returned error alone, before any event is delivered.
    pub fn parse<S: EventSink>(self, sink: &mut S) -> Result<()> {
        let Parser { mut rdr, core, capacity, cancel, progress } = self;
        let mut session = Session::new(core.build()?, cancel, progress.clone());
        let mut decoder = StreamDecoder::new(progress);
        let mut scratch = vec![0; capacity];

        sink.on_document_begin();
        let result = (|| -> Result<()> {
            loop {
                let n = read_chunk(&mut rdr, &mut scratch)?;
                session.add_bytes(n as u64);
                if n == 0 {
                    let tail = decoder.feed(&[], true);
                    session.feed(tail, sink)?;
                    return session.finish(sink);
                }
                let chunk = decoder.feed(&scratch[..n], false);
                session.feed(chunk, sink)?;
            }
        })();
        match result {
            Ok(()) => {
                sink.on_document_end();
                Ok(())
            }
            Err(err) => {
                sink.on_failure(&err);
                Err(err)
            }
        }
    }
}

fn read_chunk<R: Read>(rdr: &mut R, buf: &mut [u8]) -> Result<usize> {
    loop {
        match rdr.read(buf) {
            Ok(n) => return Ok(n),
            Err(ref err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(Error::Io(err)),
        }
    }
}

/// The bookkeeping shared by the synchronous and asynchronous drivers:
/// tokenizer, record/field counters and event dispatch.
pub(crate) struct Session {
    tok: Tokenizer,
    cancel: CancelToken,
    progress: Progress,
    /// The number of the record currently being assembled, starting at 1.
    record: u64,
    /// The 0-based index of the field currently being assembled.
    field_index: u64,
    record_open: bool,
}

impl Session {
    pub(crate) fn new(
        tok: Tokenizer,
        cancel: CancelToken,
        progress: Progress,
    ) -> Session {
        Session {
            tok,
            cancel,
            progress,
            record: 1,
            field_index: 0,
            record_open: false,
        }
    }

    pub(crate) fn add_bytes(&self, n: u64) {
        self.progress.add_bytes(n);
    }

    /// Tokenize a chunk to exhaustion, dispatching every boundary found.
    pub(crate) fn feed<S: EventSink>(
        &mut self,
        mut chunk: &str,
        sink: &mut S,
    ) -> Result<()> {
        while !chunk.is_empty() {
            let (result, nin) = self.tok.tokenize(chunk);
            chunk = &chunk[nin..];
            if self.dispatch(result, sink)? {
                return Ok(());
            }
        }
        Ok(())
    }

    /// Walk the closing boundaries once the source is exhausted.
    pub(crate) fn finish<S: EventSink>(&mut self, sink: &mut S) -> Result<()> {
        loop {
            let (result, _) = self.tok.tokenize("");
            if self.dispatch(result, sink)? {
                return Ok(());
            }
        }
    }

    /// Dispatch one tokenizer result to the sink. Returns true when the
    /// document is complete.
    fn dispatch<S: EventSink>(
        &mut self,
        result: Tokenized,
        sink: &mut S,
    ) -> Result<bool> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        match result {
            Tokenized::InputEmpty => Ok(false),
            Tokenized::Field { record_end } => {
                if !self.record_open {
                    sink.on_record_begin(self.record);
                    self.record_open = true;
                }
                sink.on_field(self.tok.field(), self.field_index);
                self.field_index += 1;
                if record_end {
                    sink.on_record_end(self.record);
                    self.record += 1;
                    self.field_index = 0;
                    self.record_open = false;
                }
                Ok(false)
            }
            Tokenized::Comment => {
                sink.on_comment(self.tok.comment());
                Ok(false)
            }
            Tokenized::End => Ok(true),
            Tokenized::Error(kind) => {
                Err(Error::Parse { pos: self.position(), kind })
            }
        }
    }

    fn position(&self) -> Position {
        Position::new(
            self.progress.bytes_read(),
            self.tok.chars_read(),
            self.record,
            self.field_index,
        )
    }
}
