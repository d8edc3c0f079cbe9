use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// A shared, thread-readable view of a parse's progress.
///
/// A `Progress` handle tracks the cumulative number of source bytes consumed
/// and, once the stream's encoding has been resolved, the name of that
/// encoding. The counters live behind shared atomics, so a handle cloned off
/// a parser (see `Parser::progress`) observes the same underlying state and
/// may be read from any thread while the parse runs.
///
/// Byte counts are monotonically non-decreasing for the life of a single
/// parse. A fresh `Progress` starts at zero bytes with no resolved encoding.
#[derive(Clone)]
pub struct Progress {
    inner: Arc<Inner>,
}

struct Inner {
    bytes: AtomicU64,
    encoding: Mutex<Option<&'static str>>,
}

impl Progress {
    /// Create a new progress handle: zero bytes read, no resolved encoding.
    pub fn new() -> Progress {
        Progress {
            inner: Arc::new(Inner {
                bytes: AtomicU64::new(0),
                encoding: Mutex::new(None),
            }),
        }
    }

    /// Add `n` to the cumulative count of source bytes consumed.
    pub(crate) fn add_bytes(&self, n: u64) {
        self.inner.bytes.fetch_add(n, Ordering::Relaxed);
    }

    /// The cumulative number of source bytes consumed so far.
    pub fn bytes_read(&self) -> u64 {
        self.inner.bytes.load(Ordering::Relaxed)
    }

    /// Record the name of the resolved stream encoding.
    pub(crate) fn set_encoding(&self, name: &'static str) {
        *self.inner.encoding.lock().unwrap() = Some(name);
    }

    /// The name of the resolved stream encoding, or `None` if the encoding
    /// has not been resolved yet.
    pub fn encoding(&self) -> Option<&'static str> {
        *self.inner.encoding.lock().unwrap()
    }
}

impl Default for Progress {
    fn default() -> Progress {
        Progress::new()
    }
}

/// The location within an input at which a grammar violation was found.
///
/// A position records the cumulative byte and character offsets consumed, the
/// 1-based record (line) number, and the 0-based index of the field within
/// that record. It is carried by `Error::Parse` and retrieved through
/// `Error::position`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Position {
    byte: u64,
    char: u64,
    record: u64,
    field: u64,
}

impl Position {
    /// Create a position from its cumulative byte and character offsets, its
    /// 1-based record number, and its 0-based field index.
    pub fn new(byte: u64, char: u64, record: u64, field: u64) -> Position {
        Position { byte, char, record, field }
    }

    /// The cumulative number of bytes consumed before this position.
    pub fn byte(&self) -> u64 {
        self.byte
    }

    /// The cumulative number of characters consumed before this position.
    pub fn char_index(&self) -> u64 {
        self.char
    }

    /// The 1-based record (line) number of this position.
    pub fn record(&self) -> u64 {
        self.record
    }

    /// The 0-based index of the field within its record.
    pub fn field(&self) -> u64 {
        self.field
    }
}
