//! Error types for segno-core.

use thiserror::Error;

/// Configuration errors surfaced while a player is being set up.
///
/// None of these can occur once rendering has started; render-time anomalies
/// reduce to silencing a voice or stopping playback cleanly.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Connection graph has a cycle through {0}")]
    CyclicGraph(String),

    #[error("Port index {port} out of range (max {max})")]
    PortOutOfRange { port: usize, max: usize },

    #[error("Unknown device reference: {0}")]
    UnknownDevice(String),

    #[error("Audio unit index {0} out of range")]
    AudioUnitOutOfRange(usize),

    #[error("Processor index {proc_index} out of range in audio unit {au_index}")]
    ProcessorOutOfRange { au_index: usize, proc_index: usize },

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Invalid audio rate: {0}. Must be > 0")]
    InvalidAudioRate(u32),

    #[error("Invalid render chunk size: {0}. Must be > 0")]
    InvalidChunkSize(usize),

    #[error("Track index {0} out of range")]
    TrackOutOfRange(usize),

    #[error("Pattern index {0} out of range")]
    PatternOutOfRange(usize),
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, SetupError>;
