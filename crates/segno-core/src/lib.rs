//! Foundation types and the immutable module model.
//!
//! Everything the rendering runtime consumes lives here: beat-accurate
//! timestamps, typed trigger arguments, deterministic random streams,
//! parameter envelopes, decoded samples with hit maps, tuning tables, and
//! the composition tree itself (songs, patterns, audio units, processors,
//! connections). The model is plain data: it is produced by an external
//! parser and never mutated during rendering.

pub mod envelope;
pub mod error;
pub mod hit_map;
pub mod limits;
pub mod module;
pub mod random;
pub mod sample;
pub mod tstamp;
pub mod tuning_table;
pub mod value;

pub use envelope::{Envelope, EnvelopeNode, Interpolation};
pub use error::{Result, SetupError};
pub use hit_map::{HitMap, HitMapEntry};
pub use random::Random;
pub use sample::{LoopMode, Sample};
pub use tstamp::Tstamp;
pub use tuning_table::TuningTable;
pub use value::Value;

pub use module::{
    AuParams, AuType, AudioUnit, Column, Connection, ControlVarBinding, ControlVarDef,
    DeviceRef, ForceEnvelopeParams, Module, PatInstRef, Pattern, ProcDef, ProcKind,
    ProcParams, Song, TrackList, Trigger,
};
