//! Error types for the voxflow pipeline

use thiserror::Error;

/// Result type alias for voxflow operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the turn pipeline
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed UTF-8 in the generator byte stream
    #[error("decode error: {0}")]
    Decode(String),

    /// Speech-to-text error
    #[error("transcription error: {0}")]
    Transcription(String),

    /// Reply generation error
    #[error("generation error: {0}")]
    Generation(String),

    /// Text-to-speech error
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Audio output error
    #[error("playback error: {0}")]
    Playback(String),

    /// Audio device/format error
    #[error("audio error: {0}")]
    Audio(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
