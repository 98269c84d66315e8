//! Beat-accurate timestamps.
//!
//! A [`Tstamp`] is a count of beats plus a sub-beat remainder in
//! [`TSTAMP_BEAT`](crate::limits::TSTAMP_BEAT) units. The remainder is always
//! normalized into `[0, TSTAMP_BEAT)`, so ordering is plain lexicographic
//! comparison and arithmetic never produces two representations of the same
//! instant.

use core::cmp::Ordering;
use core::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use crate::limits::TSTAMP_BEAT;

/// Relative time as `(beats, rem)` with `0 <= rem < TSTAMP_BEAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Tstamp {
    beats: i64,
    rem: i32,
}

impl Tstamp {
    /// Time zero.
    pub const ZERO: Tstamp = Tstamp { beats: 0, rem: 0 };

    /// Create a timestamp, normalizing the remainder into `[0, TSTAMP_BEAT)`.
    pub fn new(beats: i64, rem: i64) -> Self {
        let mut b = beats + rem.div_euclid(TSTAMP_BEAT as i64);
        let mut r = rem.rem_euclid(TSTAMP_BEAT as i64) as i32;
        if r < 0 {
            // rem_euclid already guarantees a non-negative result; keep the
            // invariant obvious to the reader regardless.
            r += TSTAMP_BEAT;
            b -= 1;
        }
        Tstamp { beats: b, rem: r }
    }

    /// Whole beats with no remainder.
    pub const fn from_beats(beats: i64) -> Self {
        Tstamp { beats, rem: 0 }
    }

    pub const fn beats(&self) -> i64 {
        self.beats
    }

    pub const fn rem(&self) -> i32 {
        self.rem
    }

    pub fn is_zero(&self) -> bool {
        self.beats == 0 && self.rem == 0
    }

    /// Total time in fractional beats.
    pub fn as_beats_f64(&self) -> f64 {
        self.beats as f64 + self.rem as f64 / TSTAMP_BEAT as f64
    }

    /// Convert to frames at the given tempo and audio rate.
    ///
    /// The timestamp must be non-negative.
    pub fn to_frames(&self, tempo: f64, audio_rate: u32) -> f64 {
        debug_assert!(self.beats >= 0);
        debug_assert!(tempo > 0.0);
        debug_assert!(audio_rate > 0);
        self.as_beats_f64() * audio_rate as f64 * 60.0 / tempo
    }

    /// Convert a frame count to beat time at the given tempo and audio rate,
    /// flooring to sub-beat resolution.
    pub fn from_frames(frames: f64, tempo: f64, audio_rate: u32) -> Self {
        debug_assert!(frames >= 0.0);
        debug_assert!(tempo > 0.0);
        debug_assert!(audio_rate > 0);
        let beats = frames * tempo / (audio_rate as f64 * 60.0);
        let whole = beats.floor();
        let rem = ((beats - whole) * TSTAMP_BEAT as f64) as i64;
        Tstamp::new(whole as i64, rem.min(TSTAMP_BEAT as i64 - 1))
    }

    pub fn min(self, other: Tstamp) -> Tstamp {
        if self <= other {
            self
        } else {
            other
        }
    }
}

impl PartialOrd for Tstamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tstamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.beats
            .cmp(&other.beats)
            .then(self.rem.cmp(&other.rem))
    }
}

impl Add for Tstamp {
    type Output = Tstamp;

    fn add(self, other: Tstamp) -> Tstamp {
        Tstamp::new(
            self.beats + other.beats,
            self.rem as i64 + other.rem as i64,
        )
    }
}

impl AddAssign for Tstamp {
    fn add_assign(&mut self, other: Tstamp) {
        *self = *self + other;
    }
}

impl Sub for Tstamp {
    type Output = Tstamp;

    fn sub(self, other: Tstamp) -> Tstamp {
        Tstamp::new(
            self.beats - other.beats,
            self.rem as i64 - other.rem as i64,
        )
    }
}

impl SubAssign for Tstamp {
    fn sub_assign(&mut self, other: Tstamp) {
        *self = *self - other;
    }
}

impl Neg for Tstamp {
    type Output = Tstamp;

    fn neg(self) -> Tstamp {
        Tstamp::ZERO - self
    }
}
