//! Configuration management for the voxflow pipeline

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use crate::Result;
use crate::engines::retry::RetryPolicy;

/// Default terminator characters for sentence segmentation
/// (Latin punctuation plus full-width CJK forms)
pub const DEFAULT_TERMINATORS: &str = ".,!?;\u{3001}\u{3002}\u{ff01}\u{ff1f}\u{ff0c}\u{ff1b}";

/// Default system prompt for the conversation window
const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful voice assistant. Keep replies short and conversational.";

/// Voxflow configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Engine endpoints and credentials
    pub engines: EngineConfig,

    /// Pipeline tuning
    pub pipeline: PipelineConfig,

    /// Retry policies per engine
    pub retry: RetryConfig,
}

/// Engine endpoint configuration (OpenAI-compatible API)
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// API base URL (e.g. `https://api.openai.com`)
    pub base_url: String,

    /// Bearer token for the API
    pub api_key: Option<String>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: String,

    /// Chat model for reply generation
    pub llm_model: String,

    /// TTS model (e.g. "tts-1")
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier (0.25 to 4.0)
    pub tts_speed: f32,
}

/// Pipeline tuning configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// System prompt placed at the head of every conversation window
    pub system_prompt: String,

    /// Max concurrent synthesis calls
    pub synthesis_concurrency: usize,

    /// Reply character budget; generation stops once reached
    pub max_reply_chars: usize,

    /// Completed exchange pairs kept before the window resets
    pub max_exchanges: usize,

    /// Sentence terminator characters
    pub terminators: String,

    /// Short clips played while a reply is being prepared (empty = disabled)
    pub ack_clips: Vec<PathBuf>,

    /// Conversation checkpoint file (None = disabled)
    pub checkpoint_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            synthesis_concurrency: 3,
            max_reply_chars: 2000,
            max_exchanges: 5,
            terminators: DEFAULT_TERMINATORS.to_string(),
            ack_clips: Vec::new(),
            checkpoint_path: None,
        }
    }
}

/// Retry policies per engine call
#[derive(Debug, Clone, Default)]
pub struct RetryConfig {
    /// Policy for transcription calls
    pub transcription: RetryPolicy,

    /// Policy for per-chunk synthesis calls
    pub synthesis: RetryPolicy,
}

impl Config {
    /// Load configuration with layering: env > TOML file > default
    ///
    /// # Errors
    ///
    /// Returns error if a numeric env override cannot be parsed
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();

        let engines = EngineConfig {
            base_url: std::env::var("VOXFLOW_BASE_URL")
                .ok()
                .or(fc.engines.base_url)
                .unwrap_or_else(|| "https://api.openai.com".to_string()),
            api_key: std::env::var("VOXFLOW_API_KEY")
                .or_else(|_| std::env::var("OPENAI_API_KEY"))
                .ok()
                .or(fc.engines.api_key),
            stt_model: std::env::var("VOXFLOW_STT_MODEL")
                .ok()
                .or(fc.engines.stt_model)
                .unwrap_or_else(|| "whisper-1".to_string()),
            llm_model: std::env::var("VOXFLOW_LLM_MODEL")
                .ok()
                .or(fc.engines.llm_model)
                .unwrap_or_else(|| "gpt-4o-mini".to_string()),
            tts_model: std::env::var("VOXFLOW_TTS_MODEL")
                .ok()
                .or(fc.engines.tts_model)
                .unwrap_or_else(|| "tts-1".to_string()),
            tts_voice: std::env::var("VOXFLOW_TTS_VOICE")
                .ok()
                .or(fc.engines.tts_voice)
                .unwrap_or_else(|| "alloy".to_string()),
            tts_speed: std::env::var("VOXFLOW_TTS_SPEED")
                .ok()
                .and_then(|s| s.parse().ok())
                .or(fc.engines.tts_speed)
                .unwrap_or(1.0),
        };

        let default_pipeline = PipelineConfig::default();
        let pipeline = PipelineConfig {
            system_prompt: std::env::var("VOXFLOW_SYSTEM_PROMPT")
                .ok()
                .or(fc.pipeline.system_prompt)
                .unwrap_or(default_pipeline.system_prompt),
            synthesis_concurrency: std::env::var("VOXFLOW_SYNTH_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .or(fc.pipeline.synthesis_concurrency)
                .unwrap_or(default_pipeline.synthesis_concurrency)
                .max(1),
            max_reply_chars: std::env::var("VOXFLOW_MAX_REPLY_CHARS")
                .ok()
                .and_then(|s| s.parse().ok())
                .or(fc.pipeline.max_reply_chars)
                .unwrap_or(default_pipeline.max_reply_chars),
            max_exchanges: std::env::var("VOXFLOW_MAX_EXCHANGES")
                .ok()
                .and_then(|s| s.parse().ok())
                .or(fc.pipeline.max_exchanges)
                .unwrap_or(default_pipeline.max_exchanges)
                .max(1),
            terminators: std::env::var("VOXFLOW_TERMINATORS")
                .ok()
                .or(fc.pipeline.terminators)
                .unwrap_or(default_pipeline.terminators),
            ack_clips: std::env::var("VOXFLOW_ACK_CLIPS")
                .ok()
                .map(|s| {
                    s.split(',')
                        .map(|p| PathBuf::from(p.trim()))
                        .filter(|p| !p.as_os_str().is_empty())
                        .collect()
                })
                .or_else(|| {
                    fc.pipeline
                        .ack_clips
                        .map(|v| v.iter().map(PathBuf::from).collect())
                })
                .unwrap_or(default_pipeline.ack_clips),
            checkpoint_path: std::env::var("VOXFLOW_CHECKPOINT")
                .ok()
                .or(fc.pipeline.checkpoint_path)
                .map(PathBuf::from),
        };

        let base_delay = Duration::from_millis(fc.retry.base_delay_ms.unwrap_or(500));
        let max_delay = Duration::from_millis(fc.retry.max_delay_ms.unwrap_or(30_000));
        let retry = RetryConfig {
            transcription: RetryPolicy {
                max_retries: std::env::var("VOXFLOW_TRANSCRIPTION_RETRIES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .or(fc.retry.transcription_retries)
                    .unwrap_or(0),
                base_delay,
                max_delay,
            },
            synthesis: RetryPolicy {
                max_retries: std::env::var("VOXFLOW_SYNTHESIS_RETRIES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .or(fc.retry.synthesis_retries)
                    .unwrap_or(0),
                base_delay,
                max_delay,
            },
        };

        Ok(Self {
            engines,
            pipeline,
            retry,
        })
    }
}
