//! Low-frequency oscillators.
//!
//! Used for vibrato (pitch cents), tremolo (force dB) and autowah (filter
//! cutoff). Speed and depth each run through their own slider so changes to
//! an oscillation in progress glide instead of snapping, and turning the LFO
//! off leaves a smooth fade-out tail while the depth slides back to zero.

use segno_core::Tstamp;

use crate::slider::Slider;

/// Depth application mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LfoMode {
    /// Additive: output is `(sin + offset) * depth`.
    #[default]
    Linear,
    /// Multiplicative: the linear value is interpreted as dB and converted
    /// to an amplitude factor.
    Exp,
}

/// A sinusoidal low-frequency oscillator with sliding speed and depth.
#[derive(Debug, Clone, PartialEq)]
pub struct Lfo {
    mode: LfoMode,
    audio_rate: u32,
    tempo: f64,

    on: bool,

    speed: f64,
    speed_slider: Slider,

    depth: f64,
    depth_slider: Slider,

    offset: f64,
    phase: f64,
}

impl Lfo {
    pub fn new(mode: LfoMode) -> Self {
        Lfo {
            mode,
            audio_rate: 48000,
            tempo: 120.0,
            on: false,
            speed: 0.0,
            speed_slider: Slider::new(),
            depth: 0.0,
            depth_slider: Slider::new(),
            offset: 0.0,
            phase: 0.0,
        }
    }

    pub fn set_audio_rate(&mut self, audio_rate: u32) {
        debug_assert!(audio_rate > 0);
        self.audio_rate = audio_rate;
        self.speed_slider.set_audio_rate(audio_rate);
        self.depth_slider.set_audio_rate(audio_rate);
    }

    pub fn set_tempo(&mut self, tempo: f64) {
        debug_assert!(tempo.is_finite() && tempo > 0.0);
        self.tempo = tempo;
        self.speed_slider.set_tempo(tempo);
        self.depth_slider.set_tempo(tempo);
    }

    /// Set the oscillation speed in cycles per second.
    pub fn set_speed(&mut self, speed: f64) {
        debug_assert!(speed.is_finite() && speed >= 0.0);
        self.speed_slider.start(speed, self.speed);
    }

    pub fn set_speed_slide_length(&mut self, length: Tstamp) {
        self.speed_slider.set_length(length);
    }

    /// Set the oscillation depth in the caller's unit (cents, dB, ...).
    pub fn set_depth(&mut self, depth: f64) {
        debug_assert!(depth.is_finite());
        self.depth_slider.start(depth, self.depth);
    }

    pub fn set_depth_slide_length(&mut self, length: Tstamp) {
        self.depth_slider.set_length(length);
    }

    /// Oscillation centre offset in [-1, 1].
    pub fn set_offset(&mut self, offset: f64) {
        debug_assert!((-1.0..=1.0).contains(&offset));
        self.offset = offset;
    }

    pub fn turn_on(&mut self) {
        self.on = true;
    }

    /// Turn off; the depth slides to zero so the oscillation ends smoothly.
    pub fn turn_off(&mut self) {
        if self.on {
            self.on = false;
            self.depth_slider.start(0.0, self.depth);
        }
    }

    pub fn target_speed(&self) -> f64 {
        self.speed_slider.target()
    }

    pub fn target_depth(&self) -> f64 {
        if self.on {
            self.depth_slider.target()
        } else {
            0.0
        }
    }

    /// Rescale the depth without resetting oscillation progress.
    pub fn change_depth_range(&mut self, from_depth: f64, to_depth: f64) {
        debug_assert!(from_depth.is_finite() && to_depth.is_finite());
        if from_depth != 0.0 {
            let ratio = to_depth / from_depth;
            self.depth *= ratio;
            if self.depth_slider.in_progress() {
                self.depth_slider
                    .start(self.depth_slider.target() * ratio, self.depth);
            }
        }
    }

    /// Whether the LFO still produces non-trivial values.
    pub fn is_active(&self) -> bool {
        self.on || self.depth != 0.0 || self.depth_slider.in_progress()
    }

    /// Estimated steps of non-trivial output left; `u32::MAX` while on.
    pub fn estimate_active_steps_left(&self) -> u32 {
        if self.on {
            return u32::MAX;
        }
        if self.depth_slider.in_progress() {
            return self.depth_slider.estimate_active_steps_left();
        }
        if self.depth != 0.0 {
            // Turned off without a fade: treat as an immediate stop.
            return 1;
        }
        0
    }

    /// Advance one frame and return the oscillation value.
    pub fn step(&mut self) -> f64 {
        if self.speed_slider.in_progress() {
            self.speed = self.speed_slider.step();
        } else {
            self.speed = self.speed_slider.target();
        }
        if self.depth_slider.in_progress() {
            self.depth = self.depth_slider.step();
        } else {
            self.depth = self.depth_slider.target();
        }

        let value = ((self.phase * core::f64::consts::TAU).sin() + self.offset) * self.depth;

        self.phase += self.speed / self.audio_rate as f64;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }

        match self.mode {
            LfoMode::Linear => value,
            LfoMode::Exp => crate::conversions::db_to_scale(value),
        }
    }

    /// Advance several frames; returns the value at the final step.
    pub fn skip(&mut self, steps: u64) -> f64 {
        if steps == 0 {
            return match self.mode {
                LfoMode::Linear => 0.0,
                LfoMode::Exp => 1.0,
            };
        }
        self.speed = self.speed_slider.skip(steps - 1);
        self.depth = self.depth_slider.skip(steps - 1);
        self.phase += self.speed * (steps - 1) as f64 / self.audio_rate as f64;
        self.phase -= self.phase.floor();
        self.step()
    }
}

impl Default for Lfo {
    fn default() -> Self {
        Lfo::new(LfoMode::Linear)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn quick_lfo(speed: f64, depth: f64) -> Lfo {
        let mut lfo = Lfo::new(LfoMode::Linear);
        lfo.set_audio_rate(100);
        lfo.set_speed(speed);
        lfo.set_depth(depth);
        lfo.turn_on();
        lfo
    }

    #[test]
    fn inactive_lfo_is_neutral() {
        let mut lfo = Lfo::new(LfoMode::Linear);
        for _ in 0..10 {
            assert_eq!(lfo.step(), 0.0);
        }
        assert!(!lfo.is_active());
    }

    #[test]
    fn peak_at_quarter_cycle() {
        // 1 Hz at 100 frames/s: peak after 25 steps.
        let mut lfo = quick_lfo(1.0, 2.0);
        let mut value = 0.0;
        for _ in 0..26 {
            value = lfo.step();
        }
        assert_relative_eq!(value, 2.0, epsilon = 0.05);
    }

    #[test]
    fn turn_off_with_slide_leaves_tail() {
        let mut lfo = quick_lfo(1.0, 1.0);
        lfo.set_depth_slide_length(Tstamp::from_beats(1));
        lfo.step();
        lfo.turn_off();
        assert!(lfo.is_active());
        let steps = lfo.estimate_active_steps_left();
        assert!(steps > 0);
        assert!(steps < u32::MAX);
    }

    #[test]
    fn exp_mode_is_multiplicative_neutral_at_zero_depth() {
        let mut lfo = Lfo::new(LfoMode::Exp);
        lfo.set_audio_rate(100);
        assert_relative_eq!(lfo.step(), 1.0);
    }

    #[test]
    fn speed_change_does_not_reset_phase() {
        let mut lfo = quick_lfo(1.0, 1.0);
        for _ in 0..10 {
            lfo.step();
        }
        let before = lfo.phase;
        lfo.set_speed(2.0);
        assert_eq!(lfo.phase, before);
    }
}
