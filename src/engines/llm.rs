//! Streaming reply generation over an OpenAI-compatible chat endpoint
//!
//! The endpoint is expected to stream the reply body as raw UTF-8 bytes
//! (the mode local completion servers use with `stream: true`). Fragment
//! boundaries are arbitrary and may fall inside a multi-byte character;
//! the pipeline's decoder handles reassembly.

use async_trait::async_trait;
use futures::StreamExt;

use crate::config::EngineConfig;
use crate::engines::{ByteStream, Generator};
use crate::pipeline::conversation::Turn;
use crate::{Error, Result};

/// Chat message in API wire format
#[derive(serde::Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Chat completion request body
#[derive(serde::Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

/// Streams replies via `POST /v1/chat/completions`
pub struct HttpGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl HttpGenerator {
    /// Create a generator from engine configuration
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.llm_model.clone(),
        }
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn generate(&self, window: &[Turn]) -> Result<ByteStream> {
        let messages = window
            .iter()
            .map(|t| ChatMessage {
                role: t.role.as_str(),
                content: &t.content,
            })
            .collect();

        let request = ChatRequest {
            model: &self.model,
            messages,
            stream: true,
        };

        tracing::debug!(turns = window.len(), model = %self.model, "opening reply stream");

        let mut req = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&request);
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {key}"));
        }

        let response = req.send().await.map_err(|e| {
            tracing::error!(error = %e, "generation request failed");
            e
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "generation API error");
            return Err(Error::Generation(format!(
                "generation API error {status}: {body}"
            )));
        }

        let stream = response
            .bytes_stream()
            .map(|item| match item {
                Ok(bytes) => Ok(bytes.to_vec()),
                Err(e) => Err(Error::Generation(format!("stream read failed: {e}"))),
            })
            .boxed();

        Ok(stream)
    }
}
