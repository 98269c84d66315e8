//! Decoded PCM samples.
//!
//! Sample-file codecs live outside the core; a [`Sample`] arrives as decoded
//! frames with lifetime covering the whole render session.

use serde::{Deserialize, Serialize};

/// Loop behaviour of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoopMode {
    #[default]
    Off,
    /// Forward loop: jump back to the loop start at the loop end.
    Uni,
    /// Bidirectional loop: reverse direction at the loop bounds.
    Bi,
}

/// A decoded sample: 1 or 2 channels of PCM plus loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    channels: Vec<Vec<f32>>,
    pub loop_mode: LoopMode,
    pub loop_start: usize,
    pub loop_end: usize,
}

impl Sample {
    /// Wrap decoded channel data. Empty or mismatched channels are rejected
    /// by the external parser; internally mono is duplicated on read.
    pub fn new(channels: Vec<Vec<f32>>) -> Self {
        debug_assert!(!channels.is_empty() && channels.len() <= 2);
        Sample {
            channels,
            loop_mode: LoopMode::Off,
            loop_start: 0,
            loop_end: 0,
        }
    }

    pub fn with_loop(mut self, mode: LoopMode, start: usize, end: usize) -> Self {
        self.loop_mode = mode;
        self.loop_start = start;
        self.loop_end = end.min(self.len());
        self
    }

    /// Frame count.
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Channel data; mono samples serve channel 0 for both sides.
    pub fn channel(&self, ch: usize) -> &[f32] {
        if ch < self.channels.len() {
            &self.channels[ch]
        } else {
            &self.channels[0]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_serves_both_channels() {
        let s = Sample::new(vec![vec![0.1, 0.2]]);
        assert_eq!(s.channel(0), s.channel(1));
        assert_eq!(s.channel_count(), 1);
    }

    #[test]
    fn loop_end_is_clamped() {
        let s = Sample::new(vec![vec![0.0; 10]]).with_loop(LoopMode::Uni, 2, 100);
        assert_eq!(s.loop_end, 10);
    }
}
