//! Chunk-wise text normalization for fetched bytes.
//!
//! Bytes arrive in arbitrary chunks. [`TextNormalizer`] decodes them as UTF-8, silently dropping
//! invalid sequences (and literal U+FFFD), and rewrites CRLF and bare CR to LF. A multi-byte
//! sequence or a CRLF pair that straddles a chunk boundary is held back and finished on the next
//! chunk.

const REPLACEMENT: char = '\u{FFFD}';

#[derive(Debug, Default)]
pub struct TextNormalizer {
    /// Leading bytes of a UTF-8 sequence cut off at the end of the previous chunk.
    partial: Vec<u8>,
    /// The previous chunk ended with `\r`.
    pending_cr: bool,
}

impl TextNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `chunk` and append the normalized text to `out`.
    pub fn push(&mut self, chunk: &[u8], out: &mut String) {
        let joined;
        let bytes = if self.partial.is_empty() {
            chunk
        } else {
            let mut buf = std::mem::take(&mut self.partial);
            buf.extend_from_slice(chunk);
            joined = buf;
            joined.as_slice()
        };

        let mut chunks = bytes.utf8_chunks().peekable();
        while let Some(piece) = chunks.next() {
            self.push_valid(piece.valid(), out);

            let invalid = piece.invalid();
            if chunks.peek().is_none() && is_truncated_sequence(invalid) {
                self.partial = invalid.to_vec();
            }
        }
    }

    /// Flush state at end of input. A dangling partial sequence is invalid and dropped.
    pub fn finish(&mut self, out: &mut String) {
        self.partial.clear();
        if self.pending_cr {
            out.push('\n');
            self.pending_cr = false;
        }
    }

    fn push_valid(&mut self, text: &str, out: &mut String) {
        out.reserve(text.len());
        for c in text.chars() {
            if self.pending_cr {
                self.pending_cr = false;
                out.push('\n');
                if c == '\n' {
                    continue;
                }
            }
            match c {
                '\r' => self.pending_cr = true,
                REPLACEMENT => {}
                c => out.push(c),
            }
        }
    }
}

/// Normalize a complete byte buffer in one go.
pub fn normalize(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    let mut normalizer = TextNormalizer::new();
    normalizer.push(bytes, &mut out);
    normalizer.finish(&mut out);
    out
}

/// `true` when `bytes` is the start of a valid UTF-8 sequence that simply ran out of input.
fn is_truncated_sequence(bytes: &[u8]) -> bool {
    !bytes.is_empty() && matches!(std::str::from_utf8(bytes), Err(e) if e.error_len().is_none())
}
