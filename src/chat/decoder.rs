//! Reassembles newline-delimited lines from an arbitrarily chunked
//! byte stream.
//!
//! UTF-8 decoding is stateful: a multi-byte sequence split across two
//! chunks is held back until the rest of it arrives. Invalid bytes are
//! replaced with U+FFFD.

const REPLACEMENT: char = '\u{FFFD}';

#[derive(Default, Debug)]
pub struct LineBuffer {
    // Bytes of an incomplete UTF-8 sequence at the end of the last chunk
    pending: Vec<u8>,
    // Always the unconsumed suffix after the last processed newline
    buffer: String,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed, in order,
    /// without their terminating newline.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let text = self.decode(chunk);
        self.buffer.push_str(&text);

        let mut parts: Vec<String> = self.buffer.split('\n').map(str::to_string).collect();
        // `split` always yields at least one element
        self.buffer = parts.pop().unwrap_or_default();
        parts
    }

    /// Flush whatever is left once the stream has ended. A dangling
    /// partial UTF-8 sequence is decoded lossily.
    pub fn finish(&mut self) -> Option<String> {
        if !self.pending.is_empty() {
            let tail = std::mem::take(&mut self.pending);
            self.buffer.push_str(&String::from_utf8_lossy(&tail));
        }
        let residual = std::mem::take(&mut self.buffer);
        if residual.is_empty() {
            None
        } else {
            Some(residual)
        }
    }

    /// The text received after the last newline.
    pub fn residual(&self) -> &str {
        &self.buffer
    }

    fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut rest = &bytes[..];
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        // Truncated sequence, wait for the next chunk
                        None => {
                            self.pending = after.to_vec();
                            break;
                        }
                        Some(len) => {
                            out.push(REPLACEMENT);
                            rest = &after[len..];
                        }
                    }
                }
            }
        }
        out
    }
}
