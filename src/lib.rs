/*!
`dsv` is a streaming, event-driven parser and writer for
delimiter-separated text: CSV and the dialect variations that show up
around it (semicolon and tab delimiters, `#` comment lines, backslash
escapes, the spreadsheet `="…"` forced-text idiom).

Parsing is push-based: the parser reads its source a chunk at a time,
drives a character-level state machine over it and reports document, record,
field and comment boundaries to an [`EventSink`] as it recognizes them. The
whole input is never resident in memory, and splitting the input differently
never changes what is reported. The paired [`Writer`] is the exact inverse:
fields it writes read back as the same fields under the same dialect.

# Reading

```
use dsv::{ParserBuilder, RecordCollector};

# fn main() -> Result<(), dsv::Error> {
let data = "\
city,region
Olympia,WA
\"Hill Valley\",CA
";
let mut sink = RecordCollector::new();
ParserBuilder::new().from_str(data).parse(&mut sink)?;
assert_eq!(sink.records()[2], vec!["Hill Valley", "CA"]);
# Ok(())
# }
```

# Writing

```
use dsv::WriterBuilder;

# fn main() -> Result<(), dsv::Error> {
let mut wtr = WriterBuilder::new().from_writer(vec![]);
wtr.write_record(&["city", "region"])?;
wtr.write_record(&["Hill Valley", "CA"])?;
let out = wtr.into_inner()?;
assert_eq!(out, b"city,region\nHill Valley,CA\n".to_vec());
# Ok(())
# }
```

Consumers that want callbacks rather than collected rows implement
[`EventSink`] (every method defaults to a no-op) or assemble a
[`ClosureSink`]. Long parses can be observed through [`Progress`] and
stopped through [`CancelToken`]. With the `async` feature enabled, the same
events can be driven from a `tokio::io::AsyncRead` via `AsyncParser`.
*/

#![deny(missing_docs)]

pub use dsv_core::{
    ConfigError, ParseErrorKind, QuoteStyle, Terminator,
};

pub use crate::error::{Error, Result};
pub use crate::events::{ClosureSink, EventSink, RecordCollector};
pub use crate::parser::{CancelToken, Parser, ParserBuilder};
pub use crate::progress::{Position, Progress};
pub use crate::writer::{Writer, WriterBuilder};

#[cfg(feature = "async")]
pub use crate::async_parser::AsyncParser;

#[cfg(feature = "async")]
mod async_parser;
mod decode;
mod error;
mod events;
mod parser;
mod progress;
mod writer;
