//! Runtime retuning state.
//!
//! A mutable transposition of a tuning table: retuning rotates the table's
//! interval vector around a fixed pitch, so repeated modulations drift the
//! whole scale while one chosen note stays put.

use segno_core::limits::TUNING_TABLE_NOTES_MAX;
use segno_core::TuningTable;

/// Mutable retuning state over one tuning table.
#[derive(Debug, Clone, PartialEq)]
pub struct TuningState {
    note_count: usize,
    ref_note: usize,
    fixed_point: usize,
    global_offset: f64,
    drift: f64,
    note_offsets: [f64; TUNING_TABLE_NOTES_MAX],
}

impl TuningState {
    pub fn new() -> Self {
        TuningState {
            note_count: 0,
            ref_note: 0,
            fixed_point: 0,
            global_offset: 0.0,
            drift: 0.0,
            note_offsets: [0.0; TUNING_TABLE_NOTES_MAX],
        }
    }

    pub fn can_retune(&self) -> bool {
        self.note_count > 0
    }

    pub fn reset(&mut self, table: Option<&TuningTable>) {
        match table {
            None => *self = TuningState::new(),
            Some(table) => {
                self.note_count = table.note_count();
                self.ref_note = table.ref_note();
                self.fixed_point = 0;
                self.global_offset = table.global_offset();
                self.drift = 0.0;
                for i in 0..TUNING_TABLE_NOTES_MAX {
                    self.note_offsets[i] = if i < self.note_count {
                        table.note_offset(i)
                    } else {
                        0.0
                    };
                }
            }
        }
    }

    pub fn set_global_offset(&mut self, offset: f64) {
        debug_assert!(offset.is_finite());
        self.global_offset = offset;
    }

    /// Pin the note nearest to `pitch` so later retunes pivot around it.
    pub fn set_fixed_pitch(&mut self, table: &TuningTable, pitch: f64) {
        self.fixed_point = table.nearest_note_index(pitch);
    }

    /// Retune around the fixed point to a new reference pitch.
    ///
    /// The interval vector of the current state is rotated by the distance
    /// between the old and new reference notes; notes re-derive from the
    /// fixed point outward, and the drift accumulates the distance from the
    /// table's original offsets.
    pub fn retune(&mut self, table: &TuningTable, new_ref: f64) {
        let note_count = self.note_count;
        if note_count == 0 {
            return;
        }

        let new_ref_index = table.nearest_note_index(new_ref);
        let shift = (note_count + new_ref_index - self.ref_note) % note_count;
        let octave_width = table.octave_width();

        let mut intervals = [0.0; TUNING_TABLE_NOTES_MAX];
        for i in 0..note_count - 1 {
            intervals[i] = self.note_offsets[i + 1] - self.note_offsets[i];
        }
        intervals[note_count - 1] =
            self.note_offsets[0] - self.note_offsets[note_count - 1] + octave_width;

        for i in self.fixed_point + 1..note_count {
            let si = (i + note_count - shift) % note_count;
            let prev_si = (si + note_count - 1) % note_count;
            self.note_offsets[i] = self.note_offsets[i - 1] + intervals[prev_si];
        }
        for i in (0..self.fixed_point).rev() {
            let si = (i + note_count - shift) % note_count;
            self.note_offsets[i] = self.note_offsets[i + 1] - intervals[si];
        }

        self.ref_note = new_ref_index;
        self.drift = self.note_offsets[self.ref_note] - table.note_offset(self.ref_note);
    }

    /// Map an authored pitch through the current retuning.
    pub fn retuned_pitch(&self, table: &TuningTable, cents: f64) -> f64 {
        if self.note_count == 0 {
            return cents;
        }
        let note_index = table.nearest_note_index(cents);
        let rel_offset = self.note_offsets[note_index] - table.note_offset(note_index);
        cents + rel_offset + self.global_offset
    }

    pub fn drift(&self) -> f64 {
        self.drift
    }
}

impl Default for TuningState {
    fn default() -> Self {
        TuningState::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn identity_without_table() {
        let state = TuningState::new();
        let table = TuningTable::equal_temperament();
        assert_eq!(state.retuned_pitch(&table, 350.0), 350.0);
    }

    #[test]
    fn fresh_state_matches_the_table() {
        let table = TuningTable::equal_temperament();
        let mut state = TuningState::new();
        state.reset(Some(&table));
        assert_relative_eq!(state.retuned_pitch(&table, 400.0), 400.0);
        assert_eq!(state.drift(), 0.0);
    }

    #[test]
    fn retune_to_same_reference_is_identity() {
        let table = TuningTable::equal_temperament();
        let mut state = TuningState::new();
        state.reset(Some(&table));
        state.retune(&table, 0.0);
        assert_relative_eq!(state.drift(), 0.0);
        assert_relative_eq!(state.retuned_pitch(&table, 700.0), 700.0);
    }

    #[test]
    fn fixed_pitch_survives_retuning_in_equal_temperament() {
        // 12-TET intervals are all equal, so rotation leaves the offsets
        // unchanged and the fixed note stays exactly put.
        let table = TuningTable::equal_temperament();
        let mut state = TuningState::new();
        state.reset(Some(&table));
        state.set_fixed_pitch(&table, 0.0);
        state.retune(&table, 700.0);
        assert_relative_eq!(state.retuned_pitch(&table, 0.0), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn retuning_just_intonation_accumulates_drift() {
        // A crude 5-note just scale with uneven intervals.
        let offsets = vec![0.0, 204.0, 386.0, 702.0, 884.0];
        let table = TuningTable::new(offsets, 0, 0.0, 1200.0);
        let mut state = TuningState::new();
        state.reset(Some(&table));
        state.set_fixed_pitch(&table, 0.0);

        state.retune(&table, 702.0);
        // The new reference moved away from its original table offset.
        assert!(state.drift().abs() > 1e-6);
    }

    #[test]
    fn global_offset_shifts_everything() {
        let table = TuningTable::equal_temperament();
        let mut state = TuningState::new();
        state.reset(Some(&table));
        state.set_global_offset(50.0);
        assert_relative_eq!(state.retuned_pitch(&table, 100.0), 150.0);
    }
}
