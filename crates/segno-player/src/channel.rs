//! Per-channel state.
//!
//! Each of the 64 channels owns the control chains that new voices inherit,
//! the arpeggio edit state, expression names, control-variable values and
//! the test-output override. Channels map 1:1 to pattern columns.

use std::collections::HashMap;

use segno_core::limits::ARPEGGIO_TONES_MAX;
use segno_core::{Random, Value};
use segno_dsp::{FilterControls, ForceControls, PitchControls, Slider};

/// Default arpeggio speed in tones per second.
pub const ARPEGGIO_SPEED_DEFAULT: f64 = 24.0;

/// One control-variable slot.
#[derive(Debug, Clone, PartialEq)]
pub struct CvEntry {
    pub value: Value,
    pub carry: bool,
}

/// Mutable state of one channel.
#[derive(Debug, Clone)]
pub struct Channel {
    pub num: usize,
    /// Bound audio unit.
    pub au_index: usize,
    /// Foreground note group; 0 when none.
    pub fg_group_id: u64,

    pub pitch_controls: PitchControls,
    pub force_controls: ForceControls,
    pub filter_controls: FilterControls,
    pub carry_pitch: bool,
    pub carry_force: bool,
    pub carry_filter: bool,

    pub arpeggio_on: bool,
    pub arpeggio_ref: f64,
    pub arpeggio_speed: f64,
    pub arpeggio_edit_pos: usize,
    /// NaN marks unset tones.
    pub arpeggio_tones: [f64; ARPEGGIO_TONES_MAX],

    pub ch_expression: String,
    pub note_expression: String,
    pub carry_note_expression: bool,

    /// Control-variable state by name.
    pub cv_state: HashMap<String, CvEntry>,
    /// In-progress control-variable slides by name.
    pub cv_slides: HashMap<String, Slider>,
    /// Variable addressed by the next `cv.*` value event.
    pub cv_active_name: Option<String>,

    /// Processor addressed by the next `g.*` event.
    pub proc_target: usize,
    /// Parameter addressed by the next `g.*` value event.
    pub proc_param_name: Option<String>,

    pub use_test_output: bool,
    pub test_proc_index: usize,

    /// Channel random stream (voice seed mixing, force variation).
    pub rand: Random,
}

impl Channel {
    pub fn new(num: usize, audio_rate: u32, tempo: f64, module_seed: u64) -> Self {
        Channel {
            num,
            au_index: 0,
            fg_group_id: 0,
            pitch_controls: PitchControls::new(audio_rate, tempo),
            force_controls: ForceControls::new(audio_rate, tempo),
            filter_controls: FilterControls::new(audio_rate, tempo),
            carry_pitch: false,
            carry_force: false,
            carry_filter: false,
            arpeggio_on: false,
            arpeggio_ref: f64::NAN,
            arpeggio_speed: ARPEGGIO_SPEED_DEFAULT,
            arpeggio_edit_pos: 0,
            arpeggio_tones: [f64::NAN; ARPEGGIO_TONES_MAX],
            ch_expression: String::new(),
            note_expression: String::new(),
            carry_note_expression: false,
            cv_state: HashMap::new(),
            cv_slides: HashMap::new(),
            cv_active_name: None,
            proc_target: 0,
            proc_param_name: None,
            use_test_output: false,
            test_proc_index: 0,
            rand: Random::for_stream(module_seed, &format!("ch{num:02}")),
        }
    }

    pub fn set_audio_rate(&mut self, audio_rate: u32) {
        self.pitch_controls.set_audio_rate(audio_rate);
        self.force_controls.set_audio_rate(audio_rate);
        self.filter_controls.set_audio_rate(audio_rate);
        for slider in self.cv_slides.values_mut() {
            slider.set_audio_rate(audio_rate);
        }
    }

    pub fn set_tempo(&mut self, tempo: f64) {
        self.pitch_controls.set_tempo(tempo);
        self.force_controls.set_tempo(tempo);
        self.filter_controls.set_tempo(tempo);
        for slider in self.cv_slides.values_mut() {
            slider.set_tempo(tempo);
        }
    }

    /// The authored arpeggio tones in play order.
    pub fn arpeggio_tone_list(&self) -> Vec<f64> {
        self.arpeggio_tones
            .iter()
            .copied()
            .take_while(|t| t.is_finite())
            .collect()
    }

    /// Arpeggio tones as offsets from the playing pitch. With a reference
    /// pitch set, authored tones are absolute and re-anchored to it.
    pub fn arpeggio_offsets(&self) -> Vec<f64> {
        let tones = self.arpeggio_tone_list();
        if self.arpeggio_ref.is_finite() {
            tones.iter().map(|t| t - self.arpeggio_ref).collect()
        } else {
            tones
        }
    }

    /// Restore the channel to its initial state, keeping rate/tempo wiring.
    pub fn reset(&mut self, audio_rate: u32, tempo: f64, module_seed: u64) {
        *self = Channel::new(self.num, audio_rate, tempo, module_seed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arpeggio_tone_list_stops_at_first_unset() {
        let mut ch = Channel::new(0, 48000, 120.0, 1);
        ch.arpeggio_tones[0] = 0.0;
        ch.arpeggio_tones[1] = 400.0;
        // Tone 2 left NaN, tone 3 set but unreachable.
        ch.arpeggio_tones[3] = 700.0;
        assert_eq!(ch.arpeggio_tone_list(), vec![0.0, 400.0]);
    }

    #[test]
    fn channels_have_distinct_random_streams() {
        let mut a = Channel::new(0, 48000, 120.0, 9);
        let mut b = Channel::new(1, 48000, 120.0, 9);
        assert_ne!(a.rand.next_u64(), b.rand.next_u64());
    }
}
