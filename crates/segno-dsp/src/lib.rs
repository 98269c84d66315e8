//! DSP primitives and processor renderers.
//!
//! This crate holds everything that runs per frame inside a render chunk:
//! value sliders, low-frequency oscillators, work buffers with constness
//! tracking, filters, the control chains carried from channels into voices,
//! the time-envelope engine, and one renderer per processor kind. All state
//! is plain owned data; the graph executor passes device and voice state into
//! every call explicitly.

pub mod controls;
pub mod conversions;
pub mod filter;
pub mod lfo;
pub mod procs;
pub mod slider;
pub mod time_env;
pub mod work_buffer;

pub use controls::{FilterControls, ForceControls, PitchControls};
pub use lfo::{Lfo, LfoMode};
pub use slider::Slider;
pub use time_env::TimeEnvState;
pub use work_buffer::WorkBuffer;

pub use procs::{
    MixedProcState, ProcCtx, VoiceProcState, VoiceState,
};
