//! The streaming turn pipeline
//!
//! Generator bytes flow decoder → segmenter → dispatcher → sequencer;
//! the coordinator owns turn boundaries and the conversation window.

pub mod conversation;
pub mod coordinator;
pub mod decoder;
pub mod dispatcher;
pub mod segmenter;
pub mod sequencer;

pub use conversation::{ConversationState, Role, Turn};
pub use coordinator::{Coordinator, TurnOutcome};
pub use decoder::StreamDecoder;
pub use dispatcher::{ClipResult, SynthesisDispatcher};
pub use segmenter::{SentenceSegmenter, TextChunk};
pub use sequencer::{AudioClip, PlaybackSequencer, PlaybackStats};
