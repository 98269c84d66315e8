//! Channel control chains.
//!
//! A channel owns one of each of these; on note-on the relevant chains are
//! copied into the new voice's processor states when the channel's carry
//! flags are set, so slides and oscillations continue across notes.

use crate::lfo::{Lfo, LfoMode};
use crate::slider::Slider;

/// Pitch chain: slider toward a target in cents, vibrato, additive carry.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchControls {
    /// Current pitch in cents.
    pub pitch: f64,
    pub slider: Slider,
    pub vibrato: Lfo,
    /// Additive offset carried between notes.
    pub pitch_add: f64,
    /// The pitch this chain was carried from, for re-anchoring.
    pub orig_carried_pitch: f64,
}

impl PitchControls {
    pub fn new(audio_rate: u32, tempo: f64) -> Self {
        let mut controls = PitchControls {
            pitch: f64::NAN,
            slider: Slider::new(),
            vibrato: Lfo::new(LfoMode::Linear),
            pitch_add: 0.0,
            orig_carried_pitch: f64::NAN,
        };
        controls.set_audio_rate(audio_rate);
        controls.set_tempo(tempo);
        controls
    }

    pub fn set_audio_rate(&mut self, audio_rate: u32) {
        self.slider.set_audio_rate(audio_rate);
        self.vibrato.set_audio_rate(audio_rate);
    }

    pub fn set_tempo(&mut self, tempo: f64) {
        self.slider.set_tempo(tempo);
        self.vibrato.set_tempo(tempo);
    }

    /// Re-anchor at a new note pitch, dropping the slide but keeping vibrato
    /// and the carried offset.
    pub fn reset_to(&mut self, pitch: f64) {
        self.pitch = pitch;
        self.orig_carried_pitch = pitch;
        self.slider.break_slide();
    }
}

/// Force chain: slider toward a target in dB plus tremolo.
#[derive(Debug, Clone, PartialEq)]
pub struct ForceControls {
    /// Current force in dB.
    pub force: f64,
    pub slider: Slider,
    pub tremolo: Lfo,
}

impl ForceControls {
    pub fn new(audio_rate: u32, tempo: f64) -> Self {
        let mut controls = ForceControls {
            force: 0.0,
            slider: Slider::new(),
            tremolo: Lfo::new(LfoMode::Linear),
        };
        controls.set_audio_rate(audio_rate);
        controls.set_tempo(tempo);
        controls
    }

    pub fn set_audio_rate(&mut self, audio_rate: u32) {
        self.slider.set_audio_rate(audio_rate);
        self.tremolo.set_audio_rate(audio_rate);
    }

    pub fn set_tempo(&mut self, tempo: f64) {
        self.slider.set_tempo(tempo);
        self.tremolo.set_tempo(tempo);
    }

    pub fn reset(&mut self) {
        self.force = 0.0;
        self.slider.break_slide();
    }
}

/// Filter chain: slider toward a cutoff on the semitone log scale, autowah,
/// resonance.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterControls {
    /// Cutoff on the log scale (69 = 440 Hz, one unit per semitone).
    pub lowpass: f64,
    pub slider: Slider,
    pub autowah: Lfo,
    /// Resonance in [0, 1].
    pub resonance: f64,
}

impl FilterControls {
    pub fn new(audio_rate: u32, tempo: f64) -> Self {
        let mut controls = FilterControls {
            lowpass: 100.0,
            slider: Slider::new(),
            autowah: Lfo::new(LfoMode::Linear),
            resonance: 0.0,
        };
        controls.set_audio_rate(audio_rate);
        controls.set_tempo(tempo);
        controls
    }

    pub fn set_audio_rate(&mut self, audio_rate: u32) {
        self.slider.set_audio_rate(audio_rate);
        self.autowah.set_audio_rate(audio_rate);
    }

    pub fn set_tempo(&mut self, tempo: f64) {
        self.slider.set_tempo(tempo);
        self.autowah.set_tempo(tempo);
    }

    pub fn reset(&mut self) {
        self.lowpass = 100.0;
        self.resonance = 0.0;
        self.slider.break_slide();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitch_reset_anchors_and_breaks_slide() {
        let mut pc = PitchControls::new(48000, 120.0);
        pc.slider.set_length(segno_core::Tstamp::from_beats(1));
        pc.slider.start(100.0, 0.0);
        assert!(pc.slider.in_progress());
        pc.reset_to(700.0);
        assert_eq!(pc.pitch, 700.0);
        assert_eq!(pc.orig_carried_pitch, 700.0);
        assert!(!pc.slider.in_progress());
    }
}
