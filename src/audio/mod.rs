//! Audio output

pub mod playback;

pub use playback::CpalPlayer;
