//! Sample player.
//!
//! Plays decoded PCM with pitch-driven resampling (linear interpolation),
//! optional forward or bidirectional looping, and dB force scaling. Note
//! events pick the entry whose middle pitch is nearest the played note; hit
//! events select through the hit map with the voice's parameter random.

use segno_core::module::SampleProcParams;
use segno_core::{LoopMode, Random};

use crate::conversions::{cents_to_hz, db_to_scale};
use crate::work_buffer::WorkBuffer;

use super::{ramp_attack, valid_input, ProcCtx, VoiceState};

const PORT_IN_PITCH: usize = 0;
const PORT_IN_FORCE: usize = 1;

/// Sample player voice state.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleVState {
    /// Index into the processor's sample table; `None` renders silence and
    /// deactivates.
    entry_index: Option<usize>,
    /// Pitch offset from the hit map, in cents.
    cents_offset: f64,
    /// Volume adjustment from the hit map, in dB.
    volume_adjust: f64,
    /// Playback position in source frames.
    pos: f64,
    /// Playback direction for bidirectional loops.
    forward: bool,
}

impl SampleVState {
    /// Select a sample for a note at `pitch_cents`.
    pub fn for_note(params: &SampleProcParams, pitch_cents: f64) -> Self {
        let entry_index = params
            .samples
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                let da = (a.middle_pitch - pitch_cents).abs();
                let db = (b.middle_pitch - pitch_cents).abs();
                da.partial_cmp(&db).unwrap_or(core::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i);
        SampleVState {
            entry_index,
            cents_offset: 0.0,
            volume_adjust: 0.0,
            pos: 0.0,
            forward: true,
        }
    }

    /// Select a sample for a hit through the hit map.
    pub fn for_hit(
        params: &SampleProcParams,
        hit_index: usize,
        force_db: f64,
        rand_p: &mut Random,
    ) -> Self {
        match params.hit_map.entry(hit_index, force_db, rand_p) {
            Some(entry) if entry.sample_index < params.samples.len() => SampleVState {
                entry_index: Some(entry.sample_index),
                cents_offset: entry.cents_offset,
                volume_adjust: entry.volume_adjust,
                pos: 0.0,
                forward: true,
            },
            _ => SampleVState {
                entry_index: None,
                cents_offset: 0.0,
                volume_adjust: 0.0,
                pos: 0.0,
                forward: true,
            },
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub fn render_voice(
    params: &SampleProcParams,
    state: &mut SampleVState,
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
    let Some(entry) = state.entry_index.and_then(|i| params.samples.get(i)) else {
        vstate.active = false;
        return 0;
    };
    let sample = &entry.sample;
    if sample.is_empty() {
        vstate.active = false;
        return 0;
    }

    if let Some(force_wb) = valid_input(inputs, PORT_IN_FORCE) {
        if force_wb.is_all_final(f32::NEG_INFINITY) {
            vstate.active = false;
            return 0;
        }
    }

    let pitches = valid_input(inputs, PORT_IN_PITCH).map(|wb| wb.contents());
    let forces = valid_input(inputs, PORT_IN_FORCE).map(|wb| wb.contents());
    let base_scale = db_to_scale(entry.volume + state.volume_adjust);
    let middle_hz = cents_to_hz(entry.middle_pitch);
    let len = sample.len();

    let use_loop = sample.loop_mode != LoopMode::Off
        && sample.loop_end > sample.loop_start
        && sample.loop_end <= len;

    let mut stop = frame_count;
    {
        let (left, right) = outputs.split_at_mut(1);
        let out_l = &mut left[0].contents_mut()[..frame_count];
        let out_r = &mut right[0].contents_mut()[..frame_count];

        for i in 0..frame_count {
            let pitch_cents = pitches.map(|p| p[i] as f64).unwrap_or(0.0);
            if !pitch_cents.is_finite() {
                vstate.active = false;
                stop = i;
                break;
            }
            let ratio = cents_to_hz(pitch_cents + state.cents_offset) / middle_hz;

            let scale = base_scale
                * forces
                    .map(|f| db_to_scale(f[i] as f64))
                    .unwrap_or(1.0);

            // Linear interpolation between source frames.
            let pos0 = state.pos.floor();
            let frac = (state.pos - pos0) as f32;
            let i0 = pos0 as usize;
            if i0 >= len {
                vstate.active = false;
                stop = i;
                break;
            }
            let i1 = (i0 + 1).min(len - 1);

            for (ch, out) in [&mut *out_l, &mut *out_r].into_iter().enumerate() {
                let data = sample.channel(ch);
                let value = data[i0] + (data[i1] - data[i0]) * frac;
                out[i] = value * scale as f32;
            }

            // Advance with loop handling.
            if state.forward {
                state.pos += ratio;
            } else {
                state.pos -= ratio;
            }

            if use_loop {
                match sample.loop_mode {
                    LoopMode::Uni => {
                        let loop_len = (sample.loop_end - sample.loop_start) as f64;
                        while state.pos >= sample.loop_end as f64 {
                            state.pos -= loop_len;
                        }
                    }
                    LoopMode::Bi => {
                        if state.forward && state.pos >= sample.loop_end as f64 {
                            state.pos = 2.0 * sample.loop_end as f64 - state.pos;
                            state.forward = false;
                        } else if !state.forward && state.pos <= sample.loop_start as f64 {
                            state.pos = 2.0 * sample.loop_start as f64 - state.pos;
                            state.forward = true;
                        }
                    }
                    LoopMode::Off => {}
                }
            } else if state.pos >= len as f64 {
                vstate.active = false;
                stop = i + 1;
                break;
            }
        }
    }

    ramp_attack(vstate, outputs, 2, stop.max(1), ctx.audio_rate);

    stop
}
