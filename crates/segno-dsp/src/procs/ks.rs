//! Karplus-Strong plucked string.
//!
//! A ring buffer sized for a 10 Hz minimum pitch runs a damped two-point
//! averaging recursion. Excitation comes from the audio input ports (a noise
//! burst routed in by the composition); the pitch input sets the delay-line
//! length. An audio-rate override keeps the string's character fixed when the
//! engine rate changes.

use segno_core::module::KsParams;

use crate::conversions::{cents_to_hz, db_to_scale};
use crate::work_buffer::WorkBuffer;

use super::{ramp_attack, valid_input, ProcCtx, VoiceState};

/// Minimum representable string pitch, in Hz.
const PITCH_MIN_HZ: f64 = 10.0;

const PORT_IN_PITCH: usize = 0;
const PORT_IN_FORCE: usize = 1;
const PORT_IN_EXCITE_L: usize = 2;

/// Karplus-Strong voice state.
#[derive(Debug, Clone, PartialEq)]
pub struct KsVState {
    ring: Vec<f32>,
    write: usize,
    prev: f32,
    /// Frames without audible energy, for self-deactivation.
    quiet_frames: u32,
}

impl KsVState {
    pub fn new(params: &KsParams, audio_rate: u32) -> Self {
        let rate = params.audio_rate_override.unwrap_or(audio_rate);
        let size = ((rate as f64 / PITCH_MIN_HZ).ceil() as usize).max(4);
        KsVState {
            ring: vec![0.0; size],
            write: 0,
            prev: 0.0,
            quiet_frames: 0,
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub fn render_voice(
    params: &KsParams,
    state: &mut KsVState,
    vstate: &mut VoiceState,
    inputs: &[WorkBuffer],
    outputs: &mut [WorkBuffer],
    frame_count: usize,
    ctx: &ProcCtx,
) -> usize {
    if outputs.len() < 2 {
        vstate.active = false;
        return 0;
    }

    if let Some(force_wb) = valid_input(inputs, PORT_IN_FORCE) {
        if force_wb.is_all_final(f32::NEG_INFINITY) {
            vstate.active = false;
            return 0;
        }
    }

    let rate = params.audio_rate_override.unwrap_or(ctx.audio_rate);
    let pitches = valid_input(inputs, PORT_IN_PITCH).map(|wb| wb.contents());
    let forces = valid_input(inputs, PORT_IN_FORCE).map(|wb| wb.contents());
    let excite_l = valid_input(inputs, PORT_IN_EXCITE_L).map(|wb| wb.contents());
    let excite_r = valid_input(inputs, PORT_IN_EXCITE_L + 1).map(|wb| wb.contents());

    // Damping: 100 sustains indefinitely, 0 halves the energy per pass.
    let damp_gain = (0.5 + params.damp.clamp(0.0, 100.0) / 200.0) as f32;
    let ring_len = state.ring.len();

    let mut peak = 0.0f32;
    {
        let (left, right) = outputs.split_at_mut(1);
        let out_l = &mut left[0].contents_mut()[..frame_count];
        let out_r = &mut right[0].contents_mut()[..frame_count];

        for i in 0..frame_count {
            let pitch_cents = pitches.map(|p| p[i] as f64).unwrap_or(0.0);
            if !pitch_cents.is_finite() {
                vstate.active = false;
                return i;
            }
            let freq = cents_to_hz(pitch_cents).max(PITCH_MIN_HZ);
            let delay = ((rate as f64 / freq) as usize).clamp(2, ring_len - 1);

            let excitation = excite_l.map(|e| e[i]).unwrap_or(0.0)
                + excite_r.map(|e| e[i]).unwrap_or(0.0);

            let read = (state.write + ring_len - delay) % ring_len;
            let out = state.ring[read];
            state.ring[state.write] = damp_gain * 0.5 * (out + state.prev) + excitation;
            state.prev = out;
            state.write = (state.write + 1) % ring_len;

            let scale = forces
                .map(|f| db_to_scale(f[i] as f64))
                .unwrap_or(1.0) as f32;
            let value = out * scale;
            out_l[i] = value;
            out_r[i] = value;
            peak = peak.max(value.abs()).max(excitation.abs());
        }
    }

    ramp_attack(vstate, outputs, 2, frame_count, ctx.audio_rate);

    // A string that has decayed to nothing and gets no excitation is done.
    if peak < 1e-6 && !vstate.note_on {
        state.quiet_frames += frame_count as u32;
        if state.quiet_frames as f64 > ctx.audio_rate as f64 * 0.1 {
            vstate.active = false;
        }
    } else {
        state.quiet_frames = 0;
    }

    frame_count
}
