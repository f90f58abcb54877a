//! Bounded concurrent fan-out of synthesis calls
//!
//! Each chunk gets its own task so the decode/segment loop never waits on
//! synthesis; a semaphore caps how many engine calls run at once. Results
//! come back over a channel tagged with the chunk sequence, in whatever
//! order the engine finishes them.

use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};

use crate::engines::Synthesizer;
use crate::engines::retry::{self, RetryPolicy};
use crate::pipeline::segmenter::TextChunk;

/// Capacity of the results channel
const RESULT_CHANNEL_CAPACITY: usize = 64;

/// Outcome of one synthesis dispatch
///
/// Exactly one result is produced per dispatched chunk. `audio: None` means
/// synthesis failed after any configured retries; the chunk is skipped in
/// playback and the turn continues.
#[derive(Debug, Clone)]
pub struct ClipResult {
    pub sequence: u64,
    pub last: bool,
    pub audio: Option<Vec<u8>>,
}

/// Fans chunks out to the synthesis engine under a concurrency cap
///
/// Dropping the dispatcher (after in-flight tasks complete) closes the
/// results channel, which is how the playback side learns the utterance is
/// done.
pub struct SynthesisDispatcher {
    engine: Arc<dyn Synthesizer>,
    semaphore: Arc<Semaphore>,
    retry: RetryPolicy,
    tx: mpsc::Sender<ClipResult>,
}

impl SynthesisDispatcher {
    /// Create a dispatcher and the receiving end of its results channel
    #[must_use]
    pub fn new(
        engine: Arc<dyn Synthesizer>,
        concurrency: usize,
        retry: RetryPolicy,
    ) -> (Self, mpsc::Receiver<ClipResult>) {
        let (tx, rx) = mpsc::channel(RESULT_CHANNEL_CAPACITY);
        let dispatcher = Self {
            engine,
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
            retry,
            tx,
        };
        (dispatcher, rx)
    }

    /// Queue a chunk for synthesis without blocking the caller
    pub fn dispatch(&self, chunk: TextChunk) {
        let engine = Arc::clone(&self.engine);
        let semaphore = Arc::clone(&self.semaphore);
        let retry = self.retry.clone();
        let tx = self.tx.clone();

        tokio::spawn(async move {
            // The semaphore is never closed while tasks hold clones of it
            let Ok(_permit) = semaphore.acquire().await else {
                return;
            };

            let audio = synthesize_with_retry(engine.as_ref(), &chunk, &retry).await;

            // A closed channel means playback aborted; nothing left to do
            let _ = tx
                .send(ClipResult {
                    sequence: chunk.sequence,
                    last: chunk.last,
                    audio,
                })
                .await;
        });
    }
}

/// Call the engine, retrying per policy; `None` when all attempts fail
async fn synthesize_with_retry(
    engine: &dyn Synthesizer,
    chunk: &TextChunk,
    policy: &RetryPolicy,
) -> Option<Vec<u8>> {
    let mut attempt = 0;
    loop {
        match engine.synthesize(&chunk.text).await {
            Ok(audio) => {
                tracing::debug!(
                    sequence = chunk.sequence,
                    bytes = audio.len(),
                    "chunk synthesized"
                );
                return Some(audio);
            }
            Err(e) if attempt < policy.max_retries => {
                let delay = retry::delay_for_attempt(policy, attempt);
                attempt += 1;
                tracing::warn!(
                    sequence = chunk.sequence,
                    error = %e,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "synthesis failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                tracing::warn!(
                    sequence = chunk.sequence,
                    error = %e,
                    "synthesis failed, chunk will be skipped"
                );
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::{Error, Result};

    /// Synthesizer that tracks concurrent calls
    struct CountingSynth {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl CountingSynth {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Synthesizer for CountingSynth {
        async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(text.as_bytes().to_vec())
        }
    }

    /// Synthesizer that fails a fixed number of times before succeeding
    struct FlakySynth {
        failures_left: AtomicU32,
    }

    #[async_trait]
    impl Synthesizer for FlakySynth {
        async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(Error::Synthesis("transient".to_string()));
            }
            Ok(text.as_bytes().to_vec())
        }
    }

    fn chunk(sequence: u64, text: &str) -> TextChunk {
        TextChunk {
            sequence,
            text: text.to_string(),
            last: false,
        }
    }

    async fn drain(mut rx: mpsc::Receiver<ClipResult>) -> Vec<ClipResult> {
        let mut results = Vec::new();
        while let Some(r) = rx.recv().await {
            results.push(r);
        }
        results
    }

    // ---- concurrency bound ----

    #[tokio::test]
    async fn respects_concurrency_cap() {
        let synth = Arc::new(CountingSynth::new());
        let (dispatcher, rx) =
            SynthesisDispatcher::new(Arc::clone(&synth) as Arc<dyn Synthesizer>, 2, RetryPolicy::default());

        for i in 0..6 {
            dispatcher.dispatch(chunk(i, "text"));
        }
        drop(dispatcher);

        let results = drain(rx).await;
        assert_eq!(results.len(), 6);
        assert!(synth.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    // ---- result tagging ----

    #[tokio::test]
    async fn every_chunk_resolves_once() {
        let synth = Arc::new(CountingSynth::new());
        let (dispatcher, rx) =
            SynthesisDispatcher::new(synth as Arc<dyn Synthesizer>, 3, RetryPolicy::default());

        for i in 0..5 {
            dispatcher.dispatch(chunk(i, &format!("chunk {i}")));
        }
        drop(dispatcher);

        let mut results = drain(rx).await;
        results.sort_by_key(|r| r.sequence);
        let sequences: Vec<u64> = results.iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3, 4]);
        assert!(results.iter().all(|r| r.audio.is_some()));
    }

    // ---- failure and retry ----

    #[tokio::test]
    async fn failed_chunk_reports_none() {
        struct AlwaysFails;

        #[async_trait]
        impl Synthesizer for AlwaysFails {
            async fn synthesize(&self, _text: &str) -> Result<Vec<u8>> {
                Err(Error::Synthesis("down".to_string()))
            }
        }

        let (dispatcher, rx) =
            SynthesisDispatcher::new(Arc::new(AlwaysFails), 2, RetryPolicy::default());
        dispatcher.dispatch(chunk(0, "doomed"));
        drop(dispatcher);

        let results = drain(rx).await;
        assert_eq!(results.len(), 1);
        assert!(results[0].audio.is_none());
    }

    #[tokio::test]
    async fn retry_policy_recovers_transient_failure() {
        let synth = Arc::new(FlakySynth {
            failures_left: AtomicU32::new(2),
        });
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        };
        let (dispatcher, rx) = SynthesisDispatcher::new(synth as Arc<dyn Synthesizer>, 1, policy);
        dispatcher.dispatch(chunk(0, "eventually"));
        drop(dispatcher);

        let results = drain(rx).await;
        assert_eq!(results.len(), 1);
        assert!(results[0].audio.is_some());
    }
}
