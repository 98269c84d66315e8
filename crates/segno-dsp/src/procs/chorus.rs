//! Chorus.
//!
//! Mixed-only: a bank of modulated delay taps. Each enabled tap reads the
//! input delayed by `delay + sin(phase) * range` seconds at its own volume;
//! a tap with zero delay, range and speed at 0 dB is an exact pass-through.

use segno_core::limits::{CHORUS_DELAY_MAX, CHORUS_VOICES_MAX};
use segno_core::module::ChorusParams;

use crate::conversions::{clamp_finite, db_to_scale};
use crate::work_buffer::WorkBuffer;

use super::{valid_input, ProcCtx};

const PORT_IN_AUDIO_L: usize = 0;

/// Per-tap runtime state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct TapState {
    phase: f64,
}

/// Chorus mixed state: one delay line per channel plus tap phases.
#[derive(Debug, Clone, PartialEq)]
pub struct ChorusMState {
    buf: [Vec<f32>; 2],
    write: usize,
    taps: [TapState; CHORUS_VOICES_MAX],
}

impl ChorusMState {
    pub fn new(_params: &ChorusParams, audio_rate: u32) -> Self {
        // Headroom of 2x the maximum tap delay.
        let size = ((CHORUS_DELAY_MAX * 2.0 * audio_rate as f64).ceil() as usize).max(4);
        ChorusMState {
            buf: [vec![0.0; size], vec![0.0; size]],
            write: 0,
            taps: [TapState::default(); CHORUS_VOICES_MAX],
        }
    }

    pub fn clear_history(&mut self) {
        for buf in &mut self.buf {
            buf.fill(0.0);
        }
        self.write = 0;
    }
}

pub fn render_mixed(
    params: &ChorusParams,
    state: &mut ChorusMState,
    inputs: &[WorkBuffer],
    outputs: &mut [WorkBuffer],
    frame_count: usize,
    ctx: &ProcCtx,
) {
    if outputs.len() < 2 {
        return;
    }
    let rate = ctx.audio_rate as f64;
    let buf_len = state.buf[0].len();

    let in_bufs = [
        valid_input(inputs, PORT_IN_AUDIO_L).map(|wb| wb.contents()),
        valid_input(inputs, PORT_IN_AUDIO_L + 1).map(|wb| wb.contents()),
    ];

    let (left, right) = outputs.split_at_mut(1);
    let mut out_bufs = [
        &mut left[0].contents_mut()[..frame_count],
        &mut right[0].contents_mut()[..frame_count],
    ];

    for i in 0..frame_count {
        // Write the dry input first so a zero-delay tap reads the current
        // frame.
        for ch in 0..2 {
            let dry = in_bufs[ch].map(|b| clamp_finite(b[i])).unwrap_or(0.0);
            state.buf[ch][state.write] = dry;
        }

        let mut acc = [0.0f64; 2];
        for (tap_index, tap) in params.taps.iter().enumerate().take(CHORUS_VOICES_MAX) {
            if !tap.is_enabled() {
                continue;
            }
            let tap_state = &mut state.taps[tap_index];

            let osc = (tap_state.phase * core::f64::consts::TAU).sin();
            tap_state.phase += tap.speed / rate;
            if tap_state.phase >= 1.0 {
                tap_state.phase -= tap_state.phase.floor();
            }

            let delay_seconds = (tap.delay + osc * tap.range).clamp(0.0, CHORUS_DELAY_MAX);
            let delay_frames = delay_seconds * rate;
            let volume = db_to_scale(tap.volume);

            let pos = state.write as f64 - delay_frames;
            let pos = if pos < 0.0 { pos + buf_len as f64 } else { pos };
            let i0 = pos.floor() as usize % buf_len;
            let i1 = (i0 + 1) % buf_len;
            let frac = pos - pos.floor();

            for ch in 0..2 {
                let a = state.buf[ch][i0] as f64;
                let b = state.buf[ch][i1] as f64;
                acc[ch] += (a + (b - a) * frac) * volume;
            }
        }

        for ch in 0..2 {
            out_bufs[ch][i] = acc[ch] as f32;
        }

        state.write = (state.write + 1) % buf_len;
    }
}
