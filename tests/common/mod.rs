//! Shared test utilities: mock engines for hardware-free pipeline tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;

use voxflow::Result;
use voxflow::config::{PipelineConfig, RetryConfig};
use voxflow::engines::{ByteStream, Generator, Player, Synthesizer, Transcriber};
use voxflow::pipeline::{Coordinator, Turn};

/// Transcriber returning a fixed transcript
pub struct FixedTranscriber(pub String);

#[async_trait]
impl Transcriber for FixedTranscriber {
    async fn transcribe(&self, _audio: &[u8]) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Transcriber that always fails
pub struct FailingTranscriber;

#[async_trait]
impl Transcriber for FailingTranscriber {
    async fn transcribe(&self, _audio: &[u8]) -> Result<String> {
        Err(voxflow::Error::Transcription("mic gremlins".to_string()))
    }
}

/// One scripted stream item
pub enum Fragment {
    Bytes(Vec<u8>),
    Error(String),
}

/// Generator replaying a fixed byte-fragment script on every call
pub struct ScriptedGenerator {
    pub script: Vec<Fragment>,
    pub calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new(script: Vec<Fragment>) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
        }
    }

    /// Script made of UTF-8 text fragments
    pub fn from_text(parts: &[&str]) -> Self {
        Self::new(
            parts
                .iter()
                .map(|p| Fragment::Bytes(p.as_bytes().to_vec()))
                .collect(),
        )
    }

    /// Script made of raw byte fragments (for mid-character splits)
    pub fn from_bytes(parts: &[&[u8]]) -> Self {
        Self::new(parts.iter().map(|p| Fragment::Bytes(p.to_vec())).collect())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, _window: &[Turn]) -> Result<ByteStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let items: Vec<Result<Vec<u8>>> = self
            .script
            .iter()
            .map(|f| match f {
                Fragment::Bytes(b) => Ok(b.clone()),
                Fragment::Error(msg) => Err(voxflow::Error::Generation(msg.clone())),
            })
            .collect();
        Ok(stream::iter(items).boxed())
    }
}

/// Synthesizer whose "audio" is the chunk text itself
pub struct TextEchoSynth;

#[async_trait]
impl Synthesizer for TextEchoSynth {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        Ok(text.as_bytes().to_vec())
    }
}

/// Synthesizer failing on chunks containing a marker substring
pub struct FailOnSynth {
    pub needle: String,
}

#[async_trait]
impl Synthesizer for FailOnSynth {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        if text.contains(&self.needle) {
            return Err(voxflow::Error::Synthesis(format!("refusing {text:?}")));
        }
        Ok(text.as_bytes().to_vec())
    }
}

/// Player recording every clip as text, optionally slow
pub struct RecordingPlayer {
    pub played: Mutex<Vec<String>>,
    pub delay: Duration,
}

impl RecordingPlayer {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            played: Mutex::new(Vec::new()),
            delay,
        }
    }

    pub fn played(&self) -> Vec<String> {
        self.played.lock().unwrap().clone()
    }
}

#[async_trait]
impl Player for RecordingPlayer {
    async fn play(&self, audio: &[u8]) -> Result<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.played
            .lock()
            .unwrap()
            .push(String::from_utf8_lossy(audio).into_owned());
        Ok(())
    }
}

/// Player that fails on every clip
pub struct BrokenPlayer;

#[async_trait]
impl Player for BrokenPlayer {
    async fn play(&self, _audio: &[u8]) -> Result<()> {
        Err(voxflow::Error::Playback("speaker unplugged".to_string()))
    }
}

/// Pipeline config for tests: sentence-only terminators, no checkpoint
pub fn test_config() -> PipelineConfig {
    PipelineConfig {
        system_prompt: "You are concise.".to_string(),
        terminators: ".!?".to_string(),
        ..PipelineConfig::default()
    }
}

/// Assemble a coordinator over mock engines
pub fn coordinator(
    transcriber: Arc<dyn Transcriber>,
    generator: Arc<dyn Generator>,
    synthesizer: Arc<dyn Synthesizer>,
    player: Arc<dyn Player>,
    config: PipelineConfig,
) -> Arc<Coordinator> {
    Arc::new(
        Coordinator::new(
            transcriber,
            generator,
            synthesizer,
            player,
            config,
            RetryConfig::default(),
        )
        .expect("coordinator config is valid"),
    )
}
