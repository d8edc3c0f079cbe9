/*!
`dsv-core` provides the pure tokenizing and escaping machinery for
delimiter-separated text (CSV and its dialect cousins). It does no I/O and
performs no event dispatch; it is intended to be wrapped by a higher level
crate (such as `dsv`) that feeds it decoded text and forwards the boundaries
it reports to a consumer.

The two halves are exact inverses of one another:

* [`Tokenizer`] consumes chunks of characters and reports field, comment,
  record and document boundaries one at a time. It is re-entrant: input may
  be split at any character position, including in the middle of a quoted
  section, an escape sequence or a `\r\n` pair, without changing what is
  reported.
* [`Writer`] decides whether a field needs quoting under the same dialect
  rules and produces the escaped rendition.

# Example

Collecting the fields of a single record:

```
use dsv_core::{Tokenized, Tokenizer};

let mut tok = Tokenizer::new();
let mut input = "ghost,\"pirate,ship\"\n";
let mut fields: Vec<String> = vec![];
loop {
    let (result, nin) = tok.tokenize(input);
    input = &input[nin..];
    match result {
        Tokenized::Field { record_end } => {
            fields.push(tok.field().to_string());
            if record_end {
                break;
            }
        }
        Tokenized::InputEmpty => {}
        other => panic!("unexpected result: {:?}", other),
    }
}
assert_eq!(fields, vec!["ghost", "pirate,ship"]);
```
*/

#![deny(missing_docs)]

pub use crate::tokenizer::{
    ConfigError, ParseErrorKind, Terminator, Tokenized, Tokenizer,
    TokenizerBuilder,
};
pub use crate::writer::{QuoteStyle, Writer, WriterBuilder};

mod tokenizer;
mod writer;
