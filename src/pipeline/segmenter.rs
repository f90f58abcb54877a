//! Sentence segmentation of streamed reply text
//!
//! Text accumulates in a buffer and is cut at sentence-terminating
//! punctuation, terminator included, so synthesis can start while the
//! generator is still producing. The boundary rule itself is the pure
//! [`segment`] function; the segmenter adds sequence numbers and the
//! end-of-utterance flush.

use regex::Regex;

use crate::{Error, Result};

/// One ordered piece of reply text bound for synthesis
///
/// Immutable once emitted. Sequence numbers start at 0 per utterance and
/// follow emission order; `last` marks the end-of-utterance flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub sequence: u64,
    pub text: String,
    pub last: bool,
}

/// Build the terminator matcher from a set of characters
///
/// # Errors
///
/// Returns error if the set is empty
pub fn terminator_class(chars: &str) -> Result<Regex> {
    if chars.is_empty() {
        return Err(Error::Config("empty terminator set".to_string()));
    }

    let class: String = chars.chars().map(|c| regex::escape(&c.to_string())).collect();
    Regex::new(&format!("[{class}]"))
        .map_err(|e| Error::Config(format!("invalid terminator set: {e}")))
}

/// Split `buffer` at every terminator, keeping the terminator attached
///
/// Returns the completed pieces in order plus the unterminated remainder.
/// Concatenating the pieces and the remainder reproduces `buffer` exactly.
#[must_use]
pub fn segment(terminators: &Regex, buffer: &str) -> (Vec<String>, String) {
    let mut pieces = Vec::new();
    let mut start = 0;

    for m in terminators.find_iter(buffer) {
        pieces.push(buffer[start..m.end()].to_string());
        start = m.end();
    }

    (pieces, buffer[start..].to_string())
}

/// Emits ordered `TextChunk`s from incrementally arriving text
///
/// Single use per utterance: after [`SentenceSegmenter::finish`] the
/// segmenter accepts no further input.
#[derive(Debug)]
pub struct SentenceSegmenter {
    terminators: Regex,
    buffer: String,
    next_sequence: u64,
    finished: bool,
}

impl SentenceSegmenter {
    /// Create a segmenter for one utterance with the given terminator set
    ///
    /// # Errors
    ///
    /// Returns error if the terminator set is empty
    pub fn new(terminator_chars: &str) -> Result<Self> {
        Ok(Self {
            terminators: terminator_class(terminator_chars)?,
            buffer: String::new(),
            next_sequence: 0,
            finished: false,
        })
    }

    /// Append decoded text and return any chunks it completes
    pub fn push(&mut self, text: &str) -> Vec<TextChunk> {
        debug_assert!(!self.finished, "segmenter used after finish");
        if self.finished {
            return Vec::new();
        }

        self.buffer.push_str(text);
        let (pieces, remainder) = segment(&self.terminators, &self.buffer);
        self.buffer = remainder;

        pieces
            .into_iter()
            .map(|text| {
                let sequence = self.next_sequence;
                self.next_sequence += 1;
                TextChunk {
                    sequence,
                    text,
                    last: false,
                }
            })
            .collect()
    }

    /// Flush the remaining buffer as the final chunk
    ///
    /// Returns `None` when nothing is buffered (the reply ended exactly on a
    /// terminator).
    pub fn finish(&mut self) -> Option<TextChunk> {
        self.finished = true;
        if self.buffer.is_empty() {
            return None;
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        Some(TextChunk {
            sequence,
            text: std::mem::take(&mut self.buffer),
            last: true,
        })
    }

    /// Number of chunks emitted so far
    #[must_use]
    pub const fn emitted(&self) -> u64 {
        self.next_sequence
    }
}
