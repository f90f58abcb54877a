//! Per-session turn orchestration
//!
//! One coordinator owns one conversation: it gates utterance intake with a
//! barge-in lock, runs transcription, streams the reply through
//! decoder → segmenter → dispatcher, and plays the synthesized clips in
//! order while generation is still running. Turn boundaries are visible
//! only here.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt;
use rand::seq::SliceRandom;
use tokio::sync::Mutex;

use crate::config::{PipelineConfig, RetryConfig};
use crate::engines::retry::{self, RetryPolicy};
use crate::engines::{Generator, Player, Synthesizer, Transcriber};
use crate::pipeline::conversation::{ConversationState, Turn};
use crate::pipeline::decoder::StreamDecoder;
use crate::pipeline::dispatcher::SynthesisDispatcher;
use crate::pipeline::segmenter::{self, SentenceSegmenter};
use crate::pipeline::sequencer::{self, PlaybackStats};
use crate::{Error, Result};

/// How an accepted (or rejected) utterance ended
#[derive(Debug)]
pub enum TurnOutcome {
    /// The reply was generated and played
    Completed {
        transcript: String,
        reply: String,
        stats: PlaybackStats,
    },
    /// Transcription produced no text; nothing was generated
    Silent,
    /// A turn was already in progress; the utterance was dropped
    Busy,
}

/// Clears the barge-in lock when the turn ends, however it ends
struct BargeGuard<'a>(&'a AtomicBool);

impl Drop for BargeGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Orchestrates one session's turns end to end
pub struct Coordinator {
    transcriber: Arc<dyn Transcriber>,
    generator: Arc<dyn Generator>,
    synthesizer: Arc<dyn Synthesizer>,
    player: Arc<dyn Player>,
    state: Mutex<ConversationState>,
    busy: AtomicBool,
    config: PipelineConfig,
    retry: RetryConfig,
}

impl Coordinator {
    /// Create a coordinator for one session
    ///
    /// # Errors
    ///
    /// Returns error if the configured terminator set is invalid
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        generator: Arc<dyn Generator>,
        synthesizer: Arc<dyn Synthesizer>,
        player: Arc<dyn Player>,
        config: PipelineConfig,
        retry: RetryConfig,
    ) -> Result<Self> {
        // Surface a bad terminator set at startup, not mid-turn
        segmenter::terminator_class(&config.terminators)?;

        let mut state =
            ConversationState::new(&config.system_prompt, config.max_exchanges);
        if let Some(path) = &config.checkpoint_path {
            state = state.with_checkpoint(path.clone());
        }

        Ok(Self {
            transcriber,
            generator,
            synthesizer,
            player,
            state: Mutex::new(state),
            busy: AtomicBool::new(false),
            config,
            retry,
        })
    }

    /// Whether a turn is currently in progress
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Current conversation window (for inspection and tests)
    pub async fn history(&self) -> Vec<Turn> {
        self.state.lock().await.snapshot()
    }

    /// Process one recorded utterance (WAV bytes) through a full turn
    ///
    /// Utterances arriving while a turn is active are dropped, not queued.
    ///
    /// # Errors
    ///
    /// Returns a typed error when the turn fails. Transcription and
    /// generation failures leave the conversation window untouched; a
    /// playback failure keeps the completed assistant turn.
    pub async fn process_utterance(&self, audio: &[u8]) -> Result<TurnOutcome> {
        if self.busy.swap(true, Ordering::SeqCst) {
            tracing::info!("utterance dropped, turn already in progress");
            return Ok(TurnOutcome::Busy);
        }
        let _guard = BargeGuard(&self.busy);

        self.run_turn(audio).await
    }

    /// The turn body; the barge-in lock is held for its whole duration
    async fn run_turn(&self, audio: &[u8]) -> Result<TurnOutcome> {
        // Optional "thinking" clip, played while transcription runs
        let mut ack = self.spawn_ack_clip();

        let transcript = {
            let result = self
                .transcribe_with_retry(audio, &self.retry.transcription)
                .await;
            // Never leave the ack clip running past the barge-in lock
            if let Some(handle) = ack.take() {
                let _ = handle.await;
            }
            result?
        };

        if transcript.trim().is_empty() {
            tracing::info!("empty transcript, nothing to reply to");
            return Ok(TurnOutcome::Silent);
        }

        let window = self
            .state
            .lock()
            .await
            .window_with(Turn::user(transcript.clone()));

        let mut stream = self.generator.generate(&window).await?;

        let mut decoder = StreamDecoder::new();
        let mut chunker = SentenceSegmenter::new(&self.config.terminators)?;
        let (dispatcher, results) = SynthesisDispatcher::new(
            Arc::clone(&self.synthesizer),
            self.config.synthesis_concurrency,
            self.retry.synthesis.clone(),
        );
        let worker = tokio::spawn(sequencer::play_ordered(
            results,
            Arc::clone(&self.player),
        ));

        let mut reply = String::new();
        let mut decoded_chars = 0usize;
        let mut budget_reached = false;
        let mut turn_error: Option<Error> = None;

        while let Some(fragment) = stream.next().await {
            let bytes = match fragment {
                Ok(b) => b,
                Err(e) => {
                    turn_error = Some(e);
                    break;
                }
            };

            let text = match decoder.feed(&bytes) {
                Ok(t) => t,
                Err(e) => {
                    turn_error = Some(e);
                    break;
                }
            };

            decoded_chars += text.chars().count();
            for chunk in chunker.push(&text) {
                reply.push_str(&chunk.text);
                dispatcher.dispatch(chunk);
            }

            if decoded_chars >= self.config.max_reply_chars {
                tracing::info!(
                    chars = decoded_chars,
                    budget = self.config.max_reply_chars,
                    "reply budget reached, ending generation"
                );
                budget_reached = true;
                break;
            }
        }

        if turn_error.is_none() {
            // A budget stop may leave a partial character in the decoder;
            // that is a normal completion, not a malformed stream
            if !budget_reached {
                if let Err(e) = decoder.finish() {
                    turn_error = Some(e);
                }
            }

            if turn_error.is_none() {
                if let Some(chunk) = chunker.finish() {
                    reply.push_str(&chunk.text);
                    dispatcher.dispatch(chunk);
                }
            }
        }

        // Closing the dispatcher ends the results channel once in-flight
        // synthesis drains, which in turn ends the playback worker
        drop(dispatcher);
        let playback = worker
            .await
            .map_err(|e| Error::Playback(format!("playback worker failed: {e}")))?;

        if let Some(e) = turn_error {
            tracing::warn!(error = %e, "turn aborted, conversation unchanged");
            return Err(e);
        }

        match playback {
            Ok(stats) => {
                tracing::info!(
                    chunks = chunker.emitted(),
                    played = stats.played,
                    skipped = stats.skipped,
                    reply_chars = reply.chars().count(),
                    "turn complete"
                );
                self.state
                    .lock()
                    .await
                    .record_exchange(transcript.clone(), reply.clone());
                Ok(TurnOutcome::Completed {
                    transcript,
                    reply,
                    stats,
                })
            }
            Err(e) => {
                // The reply was generated; keep it even though playback died
                self.state.lock().await.record_exchange(transcript, reply);
                Err(e)
            }
        }
    }

    /// Play a random configured ack clip on its own task
    fn spawn_ack_clip(&self) -> Option<tokio::task::JoinHandle<()>> {
        let path = self
            .config
            .ack_clips
            .choose(&mut rand::thread_rng())?
            .clone();
        let player = Arc::clone(&self.player);

        Some(tokio::spawn(async move {
            match tokio::fs::read(&path).await {
                Ok(clip) => {
                    if let Err(e) = player.play(&clip).await {
                        tracing::warn!(path = %path.display(), error = %e, "ack clip playback failed");
                    }
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to read ack clip");
                }
            }
        }))
    }

    /// Transcribe with the configured retry policy
    async fn transcribe_with_retry(
        &self,
        audio: &[u8],
        policy: &RetryPolicy,
    ) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.transcriber.transcribe(audio).await {
                Ok(text) => return Ok(text),
                Err(e) if attempt < policy.max_retries => {
                    let delay = retry::delay_for_attempt(policy, attempt);
                    attempt += 1;
                    tracing::warn!(
                        error = %e,
                        attempt,
                        "transcription failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
