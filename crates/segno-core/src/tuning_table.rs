//! Tuning tables.
//!
//! A tuning table lists note pitch offsets in cents within one octave, a
//! reference note, and the octave width. The runtime retuner mutates a
//! separate state around these immutable tables.

use serde::{Deserialize, Serialize};

use crate::limits::TUNING_TABLE_NOTES_MAX;

/// An immutable tuning description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningTable {
    note_offsets: Vec<f64>,
    ref_note: usize,
    /// Reference pitch of the table in cents.
    ref_pitch: f64,
    /// Octave width in cents; 0 is treated as the identity (1200).
    octave_width: f64,
    global_offset: f64,
}

impl TuningTable {
    /// 12-tone equal temperament.
    pub fn equal_temperament() -> Self {
        TuningTable::new((0..12).map(|i| i as f64 * 100.0).collect(), 0, 0.0, 1200.0)
    }

    pub fn new(note_offsets: Vec<f64>, ref_note: usize, ref_pitch: f64, octave_width: f64) -> Self {
        debug_assert!(note_offsets.len() <= TUNING_TABLE_NOTES_MAX);
        let octave_width = if octave_width == 0.0 { 1200.0 } else { octave_width };
        TuningTable {
            note_offsets,
            ref_note,
            ref_pitch,
            octave_width,
            global_offset: 0.0,
        }
    }

    pub fn with_global_offset(mut self, offset: f64) -> Self {
        self.global_offset = offset;
        self
    }

    pub fn note_count(&self) -> usize {
        self.note_offsets.len()
    }

    pub fn ref_note(&self) -> usize {
        self.ref_note
    }

    pub fn ref_pitch(&self) -> f64 {
        self.ref_pitch
    }

    pub fn octave_width(&self) -> f64 {
        self.octave_width
    }

    pub fn global_offset(&self) -> f64 {
        self.global_offset
    }

    /// Pitch offset of a note within the octave, in cents.
    pub fn note_offset(&self, index: usize) -> f64 {
        self.note_offsets.get(index).copied().unwrap_or(0.0)
    }

    /// Index of the table note nearest to `cents` (relative to the reference
    /// pitch, folded into one octave).
    pub fn nearest_note_index(&self, cents: f64) -> usize {
        if self.note_offsets.is_empty() {
            return 0;
        }
        let rel = (cents - self.ref_pitch).rem_euclid(self.octave_width);

        let mut best_index = 0;
        let mut best_dist = f64::INFINITY;
        for (i, &offset) in self.note_offsets.iter().enumerate() {
            // Octave wrap-around: the last note may be nearest to offset 0.
            let d = (offset - rel)
                .abs()
                .min((offset - rel + self.octave_width).abs())
                .min((offset - rel - self.octave_width).abs());
            if d < best_dist {
                best_dist = d;
                best_index = i;
            }
        }
        best_index
    }
}
