use std::error;
use std::fmt;
use std::io;
use std::result;

use dsv_core::{ConfigError, ParseErrorKind};

use crate::progress::Position;

/// A type alias for `Result<T, dsv::Error>`.
pub type Result<T> = result::Result<T, Error>;

/// An error that can occur when processing delimited text.
///
/// A parse delivers its error twice: once through the sink's `on_failure`
/// callback and once as the return value of `parse`. Exactly one failure is
/// ever delivered per parse, and events delivered before the failure stand.
#[derive(Debug)]
pub enum Error {
    /// An I/O error that occurred while reading from the source or writing
    /// to the destination.
    Io(io::Error),
    /// A grammar violation in the input: an unbalanced quote, an unbalanced
    /// escape sequence, or a stray character after a closing quote.
    Parse {
        /// The position at which the violation was found.
        pos: Position,
        /// What kind of violation it was.
        kind: ParseErrorKind,
    },
    /// Two records with an unequal number of fields were found.
    ///
    /// The tokenizer itself never enforces field counts; this error is
    /// raised by consumers that require a uniform record shape, such as
    /// `RecordCollector::uniform`.
    UnequalLengths {
        /// The expected number of fields in a record. This is the number of
        /// fields in the first record read.
        expected_len: u64,
        /// The record with the unexpected number of fields.
        record: u64,
        /// The number of fields in the bad record.
        len: u64,
    },
    /// The dialect configuration is contradictory. This is detected before
    /// any input is consumed or output produced.
    Config(ConfigError),
    /// A field that requires quotes was written with `QuoteStyle::Never`.
    Quote {
        /// The offending field.
        field: String,
    },
    /// The parse was cancelled. This is a deliberate termination, not a
    /// problem with the input.
    Cancelled,
}

impl Error {
    /// The numeric classification of this error, for consumers that match
    /// on error codes: grammar violations are `1`, field count violations
    /// are `2`. Other errors carry no code.
    pub fn code(&self) -> Option<u32> {
        match *self {
            Error::Parse { .. } => Some(1),
            Error::UnequalLengths { .. } => Some(2),
            _ => None,
        }
    }

    /// Return the position at which a grammar violation was found, if this
    /// error carries one.
    pub fn position(&self) -> Option<&Position> {
        match *self {
            Error::Parse { ref pos, .. } => Some(pos),
            _ => None,
        }
    }

    /// Returns true if this error is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match *self {
            Error::Cancelled => true,
            _ => false,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Error {
        Error::Config(err)
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            Error::Config(ref err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref err) => err.fmt(f),
            Error::Parse { ref pos, ref kind } => write!(
                f,
                "parse error: record {} (byte {}, char {}, field {}): {}",
                pos.record(),
                pos.byte(),
                pos.char_index(),
                pos.field(),
                kind
            ),
            Error::UnequalLengths { expected_len, record, len } => write!(
                f,
                "parse error: record {}: found record with {} fields, but \
                 the first record has {} fields",
                record, len, expected_len
            ),
            Error::Config(ref err) => err.fmt(f),
            Error::Quote { ref field } => write!(
                f,
                "field requires quotes, but quoting is disabled: {:?}",
                field
            ),
            Error::Cancelled => write!(f, "parsing was cancelled"),
        }
    }
}
