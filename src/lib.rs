//! Voxflow - streaming voice-assistant turn pipeline
//!
//! Captured utterances are transcribed, a reply is streamed from a text
//! generator, and the reply is synthesized sentence-by-sentence and played
//! in generation order while tokens are still arriving.
//!
//! # Architecture
//!
//! ```text
//! utterance (WAV bytes)
//!        │
//!   Transcriber ──► Generator (byte stream)
//!                        │
//!        StreamDecoder ──► SentenceSegmenter ──► SynthesisDispatcher
//!                                                      │ (bounded fan-out)
//!                                     PlaybackSequencer ──► Player
//! ```
//!
//! The [`pipeline::Coordinator`] owns turn boundaries, the conversation
//! window, and the barge-in lock; everything else is a stage with a narrow
//! contract.

pub mod audio;
pub mod config;
pub mod engines;
pub mod error;
pub mod pipeline;

pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{Coordinator, TurnOutcome};
