//! Text-to-speech over an OpenAI-compatible speech endpoint

use async_trait::async_trait;

use crate::config::EngineConfig;
use crate::engines::Synthesizer;
use crate::{Error, Result};

/// Synthesizes speech via `POST /v1/audio/speech`
pub struct HttpSynthesizer {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    voice: String,
    speed: f32,
}

impl HttpSynthesizer {
    /// Create a synthesizer from engine configuration
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.tts_model.clone(),
            voice: config.tts_voice.clone(),
            speed: config.tts_speed,
        }
    }
}

#[async_trait]
impl Synthesizer for HttpSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct SpeechRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
        }

        let request = SpeechRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            speed: self.speed,
        };

        tracing::debug!(chars = text.chars().count(), "synthesizing chunk");

        let mut req = self
            .client
            .post(format!("{}/v1/audio/speech", self.base_url))
            .json(&request);
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {key}"));
        }

        let response = req.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Synthesis(format!(
                "speech API error {status}: {body}"
            )));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }
}
