//! Value sliders.
//!
//! A slider moves a value linearly from `from` to `to` over a beat-time
//! length. Progress is tracked in `[0, 1]`; tempo or audio-rate changes
//! rescale the per-step increment so the remaining slide keeps its real-time
//! duration.

use segno_core::Tstamp;

/// A smooth linear transition of a value.
#[derive(Debug, Clone, PartialEq)]
pub struct Slider {
    audio_rate: u32,
    tempo: f64,

    length: Tstamp,
    from: f64,
    to: f64,

    progress: f64,
    progress_update: f64,
}

impl Slider {
    pub fn new() -> Self {
        Slider {
            audio_rate: 48000,
            tempo: 120.0,
            length: Tstamp::ZERO,
            from: 0.0,
            to: 0.0,
            progress: 1.0,
            progress_update: 0.0,
        }
    }

    pub fn reset(&mut self) {
        self.tempo = 120.0;
        self.length = Tstamp::ZERO;
        self.from = 0.0;
        self.to = 0.0;
        self.progress = 1.0;
        self.progress_update = 0.0;
    }

    /// Begin a slide from `start` to `target` over the configured length.
    pub fn start(&mut self, target: f64, start: f64) {
        debug_assert!(target.is_finite());
        debug_assert!(start.is_finite());
        self.from = start;
        self.to = target;
        self.progress = 0.0;
        self.progress_update = 1.0;
        if self.length > Tstamp::ZERO {
            self.progress_update =
                1.0 / self.length.to_frames(self.tempo, self.audio_rate);
        }
    }

    /// Current interpolated value; the target once the slide has finished.
    pub fn value(&self) -> f64 {
        if self.progress >= 1.0 {
            return self.to;
        }
        self.from + (self.to - self.from) * self.progress
    }

    /// Advance one frame. Safe to call after the slide has finished.
    pub fn step(&mut self) -> f64 {
        self.progress = (self.progress + self.progress_update).min(1.0);
        self.value()
    }

    /// Advance several frames at once.
    pub fn skip(&mut self, steps: u64) -> f64 {
        self.progress = (self.progress + self.progress_update * steps as f64).min(1.0);
        self.value()
    }

    /// Estimated steps until the slide finishes; 0 when inactive.
    pub fn estimate_active_steps_left(&self) -> u32 {
        if !self.in_progress() {
            return 0;
        }
        let steps = ((1.0 - self.progress) / self.progress_update).ceil();
        let steps = if steps > u32::MAX as f64 {
            u32::MAX
        } else {
            steps as u32
        };
        steps.max(1)
    }

    /// Force the slide to its target.
    pub fn break_slide(&mut self) {
        self.progress = 1.0;
    }

    /// Retarget an in-progress slide, restarting from the current value over
    /// the full configured length. No-op when no slide is active.
    pub fn change_target(&mut self, target: f64) {
        debug_assert!(target.is_finite());
        if self.progress < 1.0 {
            self.start(target, self.value());
        }
    }

    pub fn target(&self) -> f64 {
        self.to
    }

    /// Set the slide length; an in-progress slide restarts from its current
    /// value over the new length.
    pub fn set_length(&mut self, length: Tstamp) {
        self.length = length;
        if self.progress < 1.0 {
            let value = self.value();
            let target = self.to;
            self.start(target, value);
        }
    }

    pub fn length(&self) -> Tstamp {
        self.length
    }

    pub fn set_audio_rate(&mut self, audio_rate: u32) {
        debug_assert!(audio_rate > 0);
        if self.audio_rate == audio_rate {
            return;
        }
        self.audio_rate = audio_rate;
        self.update_progress_rate();
    }

    pub fn set_tempo(&mut self, tempo: f64) {
        debug_assert!(tempo.is_finite() && tempo > 0.0);
        if self.tempo == tempo {
            return;
        }
        self.tempo = tempo;
        self.update_progress_rate();
    }

    fn update_progress_rate(&mut self) {
        if self.length > Tstamp::ZERO {
            self.progress_update =
                1.0 / self.length.to_frames(self.tempo, self.audio_rate);
        }
    }

    pub fn in_progress(&self) -> bool {
        self.progress < 1.0
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }
}

impl Default for Slider {
    fn default() -> Self {
        Slider::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn slider_with_length(beats: i64) -> Slider {
        let mut s = Slider::new();
        s.set_length(Tstamp::from_beats(beats));
        s
    }

    #[test]
    fn reaches_target_after_length() {
        // One beat at 120 BPM and 48 kHz is 24000 frames.
        let mut s = slider_with_length(1);
        s.start(1.0, 0.0);
        for _ in 0..24000 {
            s.step();
        }
        assert!(!s.in_progress());
        assert_relative_eq!(s.value(), 1.0);
    }

    #[test]
    fn midpoint_is_halfway() {
        let mut s = slider_with_length(1);
        s.start(1200.0, 0.0);
        let v = s.skip(12000);
        assert_relative_eq!(v, 600.0, epsilon = 0.1);
    }

    #[test]
    fn zero_length_jumps() {
        let mut s = Slider::new();
        s.start(3.0, 0.0);
        assert_relative_eq!(s.step(), 3.0);
        assert!(!s.in_progress());
    }

    #[test]
    fn change_target_restarts_from_current() {
        let mut s = slider_with_length(1);
        s.start(1.0, 0.0);
        s.skip(12000);
        let mid = s.value();
        s.change_target(0.0);
        assert_relative_eq!(s.value(), mid, epsilon = 1e-9);
        assert!(s.in_progress());
        s.skip(24000);
        assert_relative_eq!(s.value(), 0.0);
    }

    #[test]
    fn tempo_change_preserves_remaining_real_time() {
        let mut s = slider_with_length(1);
        s.start(1.0, 0.0);
        s.skip(12000);
        // Doubling the tempo halves the frames of the length.
        s.set_tempo(240.0);
        assert_eq!(s.estimate_active_steps_left(), 6000);
    }

    #[test]
    fn break_forces_completion() {
        let mut s = slider_with_length(4);
        s.start(1.0, 0.0);
        s.break_slide();
        assert!(!s.in_progress());
        assert_relative_eq!(s.value(), 1.0);
    }

    proptest! {
        #[test]
        fn progress_stays_bounded(steps in 0u64..100_000) {
            let mut s = slider_with_length(1);
            s.start(5.0, -5.0);
            s.skip(steps);
            prop_assert!(s.progress() >= 0.0);
            prop_assert!(s.progress() <= 1.0);
        }

        #[test]
        fn step_is_monotone_in_progress(n in 1usize..2000) {
            let mut s = slider_with_length(1);
            s.start(1.0, 0.0);
            let mut prev = s.progress();
            for _ in 0..n {
                s.step();
                prop_assert!(s.progress() >= prev);
                prev = s.progress();
            }
        }
    }
}
