//! Engine call contracts and HTTP-backed implementations
//!
//! The pipeline talks to its external collaborators through four
//! object-safe traits so tests can substitute mocks and deployments can
//! swap providers. The shipped implementations target an OpenAI-compatible
//! API plus the local audio output device.

pub mod llm;
pub mod retry;
pub mod stt;
pub mod tts;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::Result;
use crate::pipeline::conversation::Turn;

pub use llm::HttpGenerator;
pub use stt::HttpTranscriber;
pub use tts::HttpSynthesizer;

/// Raw byte fragments from the generator, ending by stream exhaustion.
/// Fragments may split multi-byte characters at arbitrary positions.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

/// Transcribes a recorded utterance (WAV bytes) to text
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe audio to text
    ///
    /// # Errors
    ///
    /// Returns error if transcription fails
    async fn transcribe(&self, audio: &[u8]) -> Result<String>;
}

/// Streams a reply for a conversation window
#[async_trait]
pub trait Generator: Send + Sync {
    /// Open a reply stream for the given window
    ///
    /// The stream may fail mid-way; the caller treats that as a failed turn.
    ///
    /// # Errors
    ///
    /// Returns error if the stream cannot be opened
    async fn generate(&self, window: &[Turn]) -> Result<ByteStream>;
}

/// Synthesizes speech audio for one text chunk
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize text to audio bytes
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// Plays one audio clip to completion
#[async_trait]
pub trait Player: Send + Sync {
    /// Play an encoded clip; returns once the clip has finished
    ///
    /// # Errors
    ///
    /// Returns error if decoding or playback fails
    async fn play(&self, audio: &[u8]) -> Result<()>;
}
