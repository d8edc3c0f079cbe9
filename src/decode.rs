use std::mem;

use encoding_rs::{CoderResult, Decoder, Encoding, UTF_8};

use crate::progress::Progress;

/// The number of bytes that can carry a byte order mark.
const BOM_LEN: usize = 3;

/// Incremental byte-to-text decoder for the parser's chunk pipeline.
///
/// The tokenizer operates on already-decoded characters; this is the
/// collaborator that gets it there. The first bytes of the stream are
/// sniffed for a UTF-8, UTF-16LE or UTF-16BE byte order mark (UTF-8 is
/// assumed otherwise), the mark itself is stripped, and every subsequent
/// chunk is decoded statefully so that multi-byte sequences split across
/// chunk boundaries come out whole. Malformed sequences decode to U+FFFD
/// rather than aborting the parse.
///
/// The resolved encoding is published through the shared `Progress` handle.
pub(crate) struct StreamDecoder {
    decoder: Option<Decoder>,
    /// Bytes held back until the byte order mark can be judged.
    held: Vec<u8>,
    out: String,
    progress: Progress,
}

impl StreamDecoder {
    pub(crate) fn new(progress: Progress) -> StreamDecoder {
        StreamDecoder {
            decoder: None,
            held: Vec::with_capacity(BOM_LEN),
            out: String::new(),
            progress,
        }
    }

    /// Decode a chunk of raw bytes, returning the decoded text.
    ///
    /// The returned slice is valid until the next call. It may be empty
    /// even for a non-empty `input` while the byte order mark is still
    /// being collected or a multi-byte sequence is still incomplete.
    /// `last` must be true exactly once, when the source is exhausted.
    pub(crate) fn feed(&mut self, input: &[u8], last: bool) -> &str {
        self.out.clear();
        match self.decoder {
            Some(ref mut decoder) => {
                decode_onto(decoder, input, &mut self.out, last);
            }
            None => {
                self.held.extend_from_slice(input);
                if self.held.len() < BOM_LEN && !last {
                    return &self.out;
                }
                let encoding = Encoding::for_bom(&self.held)
                    .map(|(encoding, _)| encoding)
                    .unwrap_or(UTF_8);
                self.progress.set_encoding(encoding.name());
                // new_decoder() strips the byte order mark itself.
                let decoder =
                    self.decoder.get_or_insert(encoding.new_decoder());
                let held = mem::replace(&mut self.held, Vec::new());
                decode_onto(decoder, &held, &mut self.out, last);
            }
        }
        &self.out
    }
}

fn decode_onto(
    decoder: &mut Decoder,
    input: &[u8],
    out: &mut String,
    last: bool,
) {
    let needed = decoder
        .max_utf8_buffer_length(input.len())
        .unwrap_or(input.len() * 3 + 16);
    out.reserve(needed);
    let (result, _read, _replaced) = decoder.decode_to_string(input, out, last);
    debug_assert!(matches!(result, CoderResult::InputEmpty));
}
