//! # Segno - tracker-style composition rendering engine
//!
//! Segno renders tracker compositions to stereo `f32` audio by walking a
//! timeline of timestamped triggers against a graph of audio-processing
//! devices. The umbrella crate re-exports the subsystem crates:
//!
//! - **segno-core** - foundation types and the immutable module model
//! - **segno-dsp** - DSP primitives and per-processor renderers
//! - **segno-player** - the runtime: device graph, voices, events, sequencing
//!
//! ## Quick start
//!
//! ```ignore
//! use segno::prelude::*;
//!
//! let module = Arc::new(build_module()?);
//! let mut player = Player::new(module, 48000, 1024)?;
//! player.play_track(0)?;
//! while !player.end_reached() {
//!     let produced = player.render(1024);
//!     let left = player.output_buffer(0);
//!     let right = player.output_buffer(1);
//!     sink.write(left, right, produced);
//! }
//! ```

/// Re-export of segno-core for direct access.
pub use segno_core as core;
/// Re-export of segno-dsp for direct access.
pub use segno_dsp as dsp;
/// Re-export of segno-player for direct access.
pub use segno_player as player;

pub use segno_core::{
    Envelope, EnvelopeNode, HitMap, HitMapEntry, Interpolation, LoopMode, Random, Result,
    Sample, SetupError, Tstamp, TuningTable, Value,
};

pub use segno_core::module::{
    AuParams, AuType, AudioUnit, ChorusParams, ChorusTapParams, Column, Connection,
    ControlVarBinding, ControlVarDef, DebugParams, DeviceRef, FilterParams,
    ForceEnvelopeParams, FreeverbParams, GainCompParams, KsParams, Module, NoiseParams,
    PatInstRef, Pattern, ProcDef, ProcKind, ProcParams, SampleEntry, SampleProcParams, Song,
    TrackList, Trigger,
};

pub use segno_player::{
    Player, PlaybackPosition, PlaybackState, Voice, VoicePool, VoicePriority,
};

/// Common imports for callers.
pub mod prelude {
    pub use std::sync::Arc;

    pub use segno_core::module::{
        AuType, AudioUnit, Connection, DeviceRef, Module, PatInstRef, Pattern, ProcDef,
        ProcParams, Trigger,
    };
    pub use segno_core::{Tstamp, Value};
    pub use segno_player::{PlaybackPosition, Player};
}
