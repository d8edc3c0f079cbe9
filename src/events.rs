use crate::error::{Error, Result};
use crate::parser::CancelToken;

/// The consumer side of a parse.
///
/// The parser pushes boundaries into a sink in document order: one
/// `on_document_begin`, then for each record `on_record_begin`, its fields
/// left to right, `on_record_end`, with comment lines reported between
/// records, and finally either `on_document_end` or exactly one
/// `on_failure` — never both.
///
/// Every method defaults to a no-op, so a consumer implements only what it
/// cares about; a consumer that wants parsed data implements `on_field` at
/// minimum. There is no per-event capability probing: a no-op default is as
/// cheap as an unregistered callback.
///
/// Record numbers start at `1` and field indices at `0`. Field and comment
/// text is borrowed from the parser's accumulator and is only valid for the
/// duration of the call.
#[allow(unused_variables)]
pub trait EventSink {
    /// Called once before anything else.
    fn on_document_begin(&mut self) {}

    /// Called before the first field of each record.
    fn on_record_begin(&mut self, record: u64) {}

    /// Called once per field, in left-to-right order.
    fn on_field(&mut self, text: &str, index: u64) {}

    /// Called once per comment line, when comments are enabled. Comments
    /// sit outside records and do not advance the record number.
    fn on_comment(&mut self, text: &str) {}

    /// Called after the last field of each record.
    fn on_record_end(&mut self, record: u64) {}

    /// Called once, only when the whole document was parsed successfully.
    fn on_document_end(&mut self) {}

    /// Called at most once, when the parse ends in an error or is
    /// cancelled. Events delivered before the failure remain valid.
    fn on_failure(&mut self, err: &Error) {}
}

/// An `EventSink` assembled from closures.
///
/// This is an adapter over the same dispatch path as any hand-written sink,
/// for callers that don't want a named type:
///
/// ```
/// use dsv::{ClosureSink, ParserBuilder};
///
/// # fn main() -> Result<(), dsv::Error> {
/// let mut names = vec![];
/// let mut sink = ClosureSink::new().field(|text, _index| {
///     names.push(text.to_string());
/// });
/// ParserBuilder::new().from_str("ghost,pirate\n").parse(&mut sink)?;
/// drop(sink);
/// assert_eq!(names, vec!["ghost", "pirate"]);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ClosureSink<'a> {
    document_begin: Option<Box<dyn FnMut() + 'a>>,
    record_begin: Option<Box<dyn FnMut(u64) + 'a>>,
    field: Option<Box<dyn FnMut(&str, u64) + 'a>>,
    comment: Option<Box<dyn FnMut(&str) + 'a>>,
    record_end: Option<Box<dyn FnMut(u64) + 'a>>,
    document_end: Option<Box<dyn FnMut() + 'a>>,
    failure: Option<Box<dyn FnMut(&Error) + 'a>>,
}

impl<'a> ClosureSink<'a> {
    /// Create a sink with no callbacks registered.
    pub fn new() -> ClosureSink<'a> {
        ClosureSink::default()
    }

    /// Call `f` when the document begins.
    pub fn document_begin<F: FnMut() + 'a>(mut self, f: F) -> ClosureSink<'a> {
        self.document_begin = Some(Box::new(f));
        self
    }

    /// Call `f` at the start of each record.
    pub fn record_begin<F: FnMut(u64) + 'a>(mut self, f: F) -> ClosureSink<'a> {
        self.record_begin = Some(Box::new(f));
        self
    }

    /// Call `f` for each field.
    pub fn field<F: FnMut(&str, u64) + 'a>(mut self, f: F) -> ClosureSink<'a> {
        self.field = Some(Box::new(f));
        self
    }

    /// Call `f` for each comment line.
    pub fn comment<F: FnMut(&str) + 'a>(mut self, f: F) -> ClosureSink<'a> {
        self.comment = Some(Box::new(f));
        self
    }

    /// Call `f` at the end of each record.
    pub fn record_end<F: FnMut(u64) + 'a>(mut self, f: F) -> ClosureSink<'a> {
        self.record_end = Some(Box::new(f));
        self
    }

    /// Call `f` when the document ends successfully.
    pub fn document_end<F: FnMut() + 'a>(mut self, f: F) -> ClosureSink<'a> {
        self.document_end = Some(Box::new(f));
        self
    }

    /// Call `f` when the parse fails or is cancelled.
    pub fn failure<F: FnMut(&Error) + 'a>(mut self, f: F) -> ClosureSink<'a> {
        self.failure = Some(Box::new(f));
        self
    }
}

impl<'a> EventSink for ClosureSink<'a> {
    fn on_document_begin(&mut self) {
        if let Some(ref mut f) = self.document_begin {
            f()
        }
    }

    fn on_record_begin(&mut self, record: u64) {
        if let Some(ref mut f) = self.record_begin {
            f(record)
        }
    }

    fn on_field(&mut self, text: &str, index: u64) {
        if let Some(ref mut f) = self.field {
            f(text, index)
        }
    }

    fn on_comment(&mut self, text: &str) {
        if let Some(ref mut f) = self.comment {
            f(text)
        }
    }

    fn on_record_end(&mut self, record: u64) {
        if let Some(ref mut f) = self.record_end {
            f(record)
        }
    }

    fn on_document_end(&mut self) {
        if let Some(ref mut f) = self.document_end {
            f()
        }
    }

    fn on_failure(&mut self, err: &Error) {
        if let Some(ref mut f) = self.failure {
            f(err)
        }
    }
}

/// A sink that collects records (and comments) into memory.
///
/// By default the collector accepts records of any shape. Built with
/// [`uniform`], it instead requires every record to have as many fields as
/// the first one; the first offender cancels the parse and `into_result`
/// reports the field count error.
///
/// [`uniform`]: #method.uniform
#[derive(Debug, Default)]
pub struct RecordCollector {
    records: Vec<Vec<String>>,
    current: Vec<String>,
    comments: Vec<String>,
    uniform: bool,
    expected_len: Option<u64>,
    cancel: Option<CancelToken>,
    length_error: Option<Error>,
}

impl RecordCollector {
    /// Create a collector that accepts records of any shape.
    pub fn new() -> RecordCollector {
        RecordCollector::default()
    }

    /// Create a collector that requires every record to have as many fields
    /// as the first record.
    ///
    /// `cancel` must be the token of the parse being collected; the
    /// collector triggers it when a record of the wrong shape arrives, so
    /// no further records are parsed.
    pub fn uniform(cancel: CancelToken) -> RecordCollector {
        RecordCollector {
            uniform: true,
            cancel: Some(cancel),
            ..RecordCollector::default()
        }
    }

    /// The records collected so far.
    pub fn records(&self) -> &[Vec<String>] {
        &self.records
    }

    /// The comment lines collected so far.
    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    /// Unwrap the collected records, or the field count error if a record
    /// of the wrong shape was seen.
    pub fn into_result(self) -> Result<Vec<Vec<String>>> {
        match self.length_error {
            Some(err) => Err(err),
            None => Ok(self.records),
        }
    }
}

impl EventSink for RecordCollector {
    fn on_field(&mut self, text: &str, _index: u64) {
        self.current.push(text.to_string());
    }

    fn on_comment(&mut self, text: &str) {
        self.comments.push(text.to_string());
    }

    fn on_record_end(&mut self, record: u64) {
        let len = self.current.len() as u64;
        let fields = std::mem::replace(&mut self.current, vec![]);
        if self.length_error.is_some() {
            return;
        }
        if self.uniform {
            match self.expected_len {
                None => self.expected_len = Some(len),
                Some(expected_len) if expected_len != len => {
                    self.length_error = Some(Error::UnequalLengths {
                        expected_len,
                        record,
                        len,
                    });
                    if let Some(ref cancel) = self.cancel {
                        cancel.cancel();
                    }
                    return;
                }
                Some(_) => {}
            }
        }
        self.records.push(fields);
    }
}
