//! Player runtime.
//!
//! Owns everything that changes while a composition renders: device states
//! and the graph executor, the voice pool, per-channel and master state, the
//! event dispatcher and the timeline sequencer, all behind the [`Player`]
//! facade that the audio caller pulls frames from.

pub mod channel;
pub mod device;
pub mod event;
pub mod master;
pub mod pipeline;
pub mod player;
pub mod sequencer;
pub mod tuning;
pub mod voice;
pub mod voice_pool;

pub use master::{PlaybackPosition, PlaybackState};
pub use player::Player;
pub use voice::{Voice, VoicePriority};
pub use voice_pool::VoicePool;
