//! The immutable composition tree.
//!
//! A [`Module`] is produced by an external parser and only read during
//! rendering. All identifiers are dense small integers; envelope and sample
//! data live inside the tree and outlive every render call.

mod audio_unit;
mod connection;
mod pattern;
mod processor;
mod song;

pub use audio_unit::{
    AuParams, AuType, AudioUnit, ControlVarBinding, ControlVarDef, Expressions,
    ForceEnvelopeParams, HitInfo,
};
pub use connection::{Connection, DeviceRef};
pub use pattern::{Column, PatInstRef, Pattern, Trigger};
pub use processor::{
    ChorusParams, ChorusTapParams, DebugParams, FilterParams, FreeverbParams, GainCompParams,
    KsParams, NoiseParams, ProcDef, ProcKind, ProcParams, SampleEntry, SampleProcParams,
};
pub use song::{Song, TrackList};

use serde::{Deserialize, Serialize};

use crate::tuning_table::TuningTable;

/// A complete parsed composition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Module {
    pub songs: Vec<Song>,
    pub track_list: TrackList,
    pub patterns: Vec<Pattern>,
    pub audio_units: Vec<AudioUnit>,
    /// Master-level connections between audio-unit interfaces and the master
    /// sink.
    pub connections: Vec<Connection>,
    pub tuning_tables: Vec<Option<TuningTable>>,
    /// Module mix volume in dB.
    pub mix_volume_db: f64,
    pub random_seed: u64,
}

impl Module {
    pub fn new() -> Self {
        Module {
            mix_volume_db: -8.0,
            ..Module::default()
        }
    }

    pub fn audio_unit(&self, index: usize) -> Option<&AudioUnit> {
        self.audio_units.get(index)
    }

    pub fn pattern(&self, index: usize) -> Option<&Pattern> {
        self.patterns.get(index)
    }

    /// Song index played by a track, if the track exists.
    pub fn song_for_track(&self, track: usize) -> Option<usize> {
        self.track_list.song_index(track)
    }

    pub fn tuning_table(&self, index: usize) -> Option<&TuningTable> {
        self.tuning_tables.get(index).and_then(|t| t.as_ref())
    }
}
