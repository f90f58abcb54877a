//! TOML configuration file loading
//!
//! Supports `~/.config/voxflow/config.toml` as a persistent config source.
//! All fields are optional — the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct VoxConfigFile {
    /// Engine endpoints and credentials
    #[serde(default)]
    pub engines: EnginesFileConfig,

    /// Pipeline tuning
    #[serde(default)]
    pub pipeline: PipelineFileConfig,

    /// Retry behavior
    #[serde(default)]
    pub retry: RetryFileConfig,
}

/// Engine endpoint configuration
#[derive(Debug, Default, Deserialize)]
pub struct EnginesFileConfig {
    /// Base URL of the OpenAI-compatible API (STT, LLM, TTS)
    pub base_url: Option<String>,

    /// API key sent as a Bearer token
    pub api_key: Option<String>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// Chat model for reply generation
    pub llm_model: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// TTS voice identifier (e.g. "alloy")
    pub tts_voice: Option<String>,

    /// TTS speed multiplier
    pub tts_speed: Option<f32>,
}

/// Pipeline tuning configuration
#[derive(Debug, Default, Deserialize)]
pub struct PipelineFileConfig {
    /// System prompt for the conversation window
    pub system_prompt: Option<String>,

    /// Max concurrent synthesis calls
    pub synthesis_concurrency: Option<usize>,

    /// Reply character budget; generation stops once reached
    pub max_reply_chars: Option<usize>,

    /// Exchange pairs kept before the window resets
    pub max_exchanges: Option<usize>,

    /// Sentence terminator characters as a single string
    pub terminators: Option<String>,

    /// Short clips played while a reply is being prepared
    pub ack_clips: Option<Vec<String>>,

    /// Conversation checkpoint file (disabled when unset)
    pub checkpoint_path: Option<String>,
}

/// Retry configuration (attempts beyond the first call)
#[derive(Debug, Default, Deserialize)]
pub struct RetryFileConfig {
    pub transcription_retries: Option<u32>,
    pub synthesis_retries: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
}

/// Load the TOML config file from the standard path
///
/// Returns `VoxConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> VoxConfigFile {
    let Some(path) = config_file_path() else {
        return VoxConfigFile::default();
    };

    if !path.exists() {
        return VoxConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                VoxConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            VoxConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/voxflow/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("voxflow").join("config.toml"))
}
