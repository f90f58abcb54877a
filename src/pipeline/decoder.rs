//! Incremental UTF-8 decoding of the generator byte stream
//!
//! Stream fragments can split a multi-byte character at any position, so an
//! incomplete trailing sequence is carried over and prepended to the next
//! fragment. Emitted text is always valid UTF-8; nothing is ever replaced
//! with a substitution marker.

use crate::{Error, Result};

/// Reassembles arbitrary byte splits into valid UTF-8 text
///
/// One decoder instance is scoped to a single utterance.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    /// Incomplete trailing sequence from the previous fragment (at most 3 bytes)
    carry: Vec<u8>,
}

impl StreamDecoder {
    /// Create a decoder for one utterance
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a fragment and return the decodable prefix as text
    ///
    /// # Errors
    ///
    /// Returns `Error::Decode` when the stream contains bytes that can never
    /// form a valid character, regardless of what arrives later.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<String> {
        let mut buffer = std::mem::take(&mut self.carry);
        buffer.extend_from_slice(bytes);

        match std::str::from_utf8(&buffer) {
            Ok(text) => Ok(text.to_string()),
            Err(e) => {
                if e.error_len().is_some() {
                    return Err(Error::Decode(format!(
                        "invalid UTF-8 at byte {}",
                        e.valid_up_to()
                    )));
                }
                // Incomplete trailing sequence; hold it for the next fragment
                let valid = e.valid_up_to();
                let text = std::str::from_utf8(&buffer[..valid])
                    .map_err(|e| Error::Decode(e.to_string()))?
                    .to_string();
                self.carry = buffer[valid..].to_vec();
                Ok(text)
            }
        }
    }

    /// Finish the stream; fails if bytes are still pending
    ///
    /// # Errors
    ///
    /// Returns `Error::Decode` when the stream ended inside a multi-byte
    /// character.
    pub fn finish(self) -> Result<()> {
        if self.carry.is_empty() {
            Ok(())
        } else {
            Err(Error::Decode(format!(
                "stream ended inside a multi-byte character ({} bytes pending)",
                self.carry.len()
            )))
        }
    }
}
