//! Ordered playback of out-of-order synthesis results
//!
//! Synthesis completes in arbitrary order; playback must follow chunk
//! sequence. Results park in a reorder buffer and the longest consecutive
//! prefix from the next expected index is released. A failed sequence is
//! skipped so one bad chunk never stalls the rest of the reply.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::Result;
use crate::engines::Player;
use crate::pipeline::dispatcher::ClipResult;

/// A synthesized clip ready for playback
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub sequence: u64,
    pub audio: Vec<u8>,
}

/// Counters for one utterance's playback
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackStats {
    /// Clips played to completion
    pub played: u64,
    /// Sequences skipped because synthesis failed
    pub skipped: u64,
}

/// Reorder buffer releasing clips in strict ascending sequence order
///
/// Clip N is never released before every sequence below N has been released
/// or declared failed.
#[derive(Debug, Default)]
pub struct PlaybackSequencer {
    next: u64,
    pending: BTreeMap<u64, Option<Vec<u8>>>,
    skipped: u64,
}

impl PlaybackSequencer {
    /// Create a sequencer expecting sequence 0 first
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept one result and return every clip that is now releasable
    pub fn accept(&mut self, result: ClipResult) -> Vec<AudioClip> {
        self.pending.insert(result.sequence, result.audio);

        let mut released = Vec::new();
        while let Some(entry) = self.pending.remove(&self.next) {
            match entry {
                Some(audio) => released.push(AudioClip {
                    sequence: self.next,
                    audio,
                }),
                None => {
                    tracing::debug!(sequence = self.next, "skipping failed sequence");
                    self.skipped += 1;
                }
            }
            self.next += 1;
        }

        released
    }

    /// Sequences skipped so far
    #[must_use]
    pub const fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Results parked waiting for an earlier sequence
    #[must_use]
    pub fn parked(&self) -> usize {
        self.pending.len()
    }
}

/// Playback worker: drain results and play released clips one at a time
///
/// Runs until the results channel closes (every dispatched chunk resolves
/// exactly once, so no sequence is left parked at that point). The player
/// is exclusive to this worker for the duration of the utterance.
///
/// # Errors
///
/// Returns the player's error on playback failure; remaining clips are
/// discarded.
pub async fn play_ordered(
    mut rx: mpsc::Receiver<ClipResult>,
    player: Arc<dyn Player>,
) -> Result<PlaybackStats> {
    let mut sequencer = PlaybackSequencer::new();
    let mut stats = PlaybackStats::default();

    while let Some(result) = rx.recv().await {
        for clip in sequencer.accept(result) {
            tracing::debug!(
                sequence = clip.sequence,
                bytes = clip.audio.len(),
                "playing clip"
            );
            if let Err(e) = player.play(&clip.audio).await {
                tracing::error!(sequence = clip.sequence, error = %e, "playback failed, aborting rest of reply");
                return Err(e);
            }
            stats.played += 1;
        }
    }

    stats.skipped = sequencer.skipped();
    Ok(stats)
}
