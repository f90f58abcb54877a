//! Rolling conversation window
//!
//! The window always starts with exactly one system turn. After a fixed
//! number of completed user/assistant exchange pairs it resets back to just
//! the system turn, keeping generator input bounded across long sessions.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Wire-format name of the role
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One conversation turn; insertion order is significant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    /// Create a system turn
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Per-session conversation window with bounded history
///
/// One instance per session, owned by the coordinator; never shared across
/// sessions.
#[derive(Debug)]
pub struct ConversationState {
    /// `turns[0]` is always the system turn
    turns: Vec<Turn>,
    max_exchanges: usize,
    checkpoint_path: Option<PathBuf>,
}

impl ConversationState {
    /// Create a fresh window containing only the system turn
    #[must_use]
    pub fn new(system_prompt: &str, max_exchanges: usize) -> Self {
        Self {
            turns: vec![Turn::system(system_prompt)],
            max_exchanges: max_exchanges.max(1),
            checkpoint_path: None,
        }
    }

    /// Enable JSON checkpointing, restoring prior history if present
    ///
    /// A checkpoint that cannot be read or does not start with a system turn
    /// is ignored with a warning.
    #[must_use]
    pub fn with_checkpoint(mut self, path: PathBuf) -> Self {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match serde_json::from_str::<Vec<Turn>>(&content) {
                    Ok(turns) if turns.first().is_some_and(|t| t.role == Role::System) => {
                        tracing::info!(
                            path = %path.display(),
                            turns = turns.len(),
                            "restored conversation checkpoint"
                        );
                        self.turns = turns;
                    }
                    Ok(_) => {
                        tracing::warn!(
                            path = %path.display(),
                            "checkpoint does not start with a system turn, ignoring"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "failed to parse checkpoint, ignoring"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "failed to read checkpoint"
                    );
                }
            }
        }
        self.checkpoint_path = Some(path);
        self
    }

    /// Append a turn to the window
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Immutable copy of the window for generator input
    #[must_use]
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    /// Snapshot plus a not-yet-recorded user turn
    ///
    /// Used while a turn is in flight so the window itself stays untouched
    /// until the turn completes.
    #[must_use]
    pub fn window_with(&self, pending: Turn) -> Vec<Turn> {
        let mut window = self.snapshot();
        window.push(pending);
        window
    }

    /// Completed user/assistant exchange pairs in the window
    #[must_use]
    pub fn exchanges(&self) -> usize {
        self.turns
            .iter()
            .filter(|t| t.role == Role::Assistant)
            .count()
    }

    /// Reset to `[system]` once the exchange budget is used up
    ///
    /// Called after each completed assistant turn. Returns whether a reset
    /// happened.
    pub fn maybe_reset(&mut self) -> bool {
        if self.exchanges() >= self.max_exchanges {
            tracing::info!(
                exchanges = self.exchanges(),
                "conversation window reset"
            );
            self.turns.truncate(1);
            self.save_checkpoint();
            return true;
        }
        false
    }

    /// Record a completed exchange and enforce the rollover
    pub fn record_exchange(&mut self, user_text: String, assistant_text: String) {
        self.push(Turn::user(user_text));
        self.push(Turn::assistant(assistant_text));
        if !self.maybe_reset() {
            self.save_checkpoint();
        }
    }

    /// Write the window to the checkpoint file, if configured
    fn save_checkpoint(&self) {
        let Some(path) = &self.checkpoint_path else {
            return;
        };

        match serde_json::to_string_pretty(&self.turns) {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "failed to write checkpoint"
                    );
                } else {
                    tracing::debug!(path = %path.display(), "checkpoint written");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize checkpoint");
            }
        }
    }
}
