//! Noise generator.
//!
//! White noise shaped by a cascade of first-order sections: a non-negative
//! order runs DC-removing zeros (bluer spectrum), a negative order runs poles
//! (pinker spectrum). Both channels draw from independent streams seeded from
//! the voice's parameter random, so the output is reproducible per note.

use segno_core::module::NoiseParams;
use segno_core::Random;

use crate::conversions::db_to_scale;
use crate::filter::{dc_pole_filter, dc_zero_filter};
use crate::work_buffer::WorkBuffer;

use super::{ramp_attack, valid_input, ProcCtx, VoiceState};

/// Maximum filter order in either direction.
pub const NOISE_ORDER_MAX: usize = 8;

const PORT_IN_FORCE: usize = 0;

/// Noise generator voice state.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseVState {
    rands: [Random; 2],
    history: [[f64; NOISE_ORDER_MAX]; 2],
}

impl NoiseVState {
    /// Seed both channel streams from the voice's parameter random.
    pub fn new(rand_p: &mut Random) -> Self {
        NoiseVState {
            rands: [
                Random::for_stream(rand_p.next_u64(), "noise"),
                Random::for_stream(rand_p.next_u64(), "noise"),
            ],
            history: [[0.0; NOISE_ORDER_MAX]; 2],
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub fn render_voice(
    params: &NoiseParams,
    state: &mut NoiseVState,
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

    // A final silent force upstream means silence from here on.
    if let Some(force_wb) = valid_input(inputs, PORT_IN_FORCE) {
        if force_wb.is_all_final(f32::NEG_INFINITY) {
            vstate.active = false;
            return 0;
        }
    }
    let forces = valid_input(inputs, PORT_IN_FORCE).map(|wb| wb.contents());

    let order = params.order.unsigned_abs().min(NOISE_ORDER_MAX as u32) as usize;
    let use_zeros = params.order >= 0;

    let (left, right) = outputs.split_at_mut(1);
    for (ch, out_wb) in [&mut left[0], &mut right[0]].into_iter().enumerate() {
        let out = &mut out_wb.contents_mut()[..frame_count];
        let history = &mut state.history[ch];
        let rand = &mut state.rands[ch];

        for (i, v) in out.iter_mut().enumerate() {
            let scale = forces
                .map(|f| db_to_scale(f[i] as f64))
                .unwrap_or(1.0);
            let noise = if use_zeros {
                dc_zero_filter(order, history, rand.next_signal())
            } else {
                dc_pole_filter(order, history, rand.next_signal())
            };
            *v = (scale * noise) as f32;
        }
    }

    ramp_attack(vstate, outputs, 2, frame_count, ctx.audio_rate);

    frame_count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ProcCtx {
        ProcCtx {
            audio_rate: 48000,
            tempo: 120.0,
        }
    }

    fn render_with_seed(seed: u64, frames: usize) -> Vec<f32> {
        let params = NoiseParams::default();
        let mut rand_p = Random::with_seed(seed);
        let mut state = NoiseVState::new(&mut rand_p);
        let mut vstate = VoiceState::new();
        vstate.finish_attack_ramp();
        let mut outputs = vec![WorkBuffer::new(frames); 2];
        render_voice(
            &params,
            &mut state,
            &mut vstate,
            &[],
            &mut outputs,
            frames,
            &ctx(),
        );
        outputs[0].contents()[..frames].to_vec()
    }

    #[test]
    fn same_seed_is_bit_identical() {
        assert_eq!(render_with_seed(11, 500), render_with_seed(11, 500));
    }

    #[test]
    fn different_seeds_differ() {
        assert_ne!(render_with_seed(11, 500), render_with_seed(12, 500));
    }

    #[test]
    fn final_silent_force_deactivates() {
        let params = NoiseParams::default();
        let mut rand_p = Random::with_seed(3);
        let mut state = NoiseVState::new(&mut rand_p);
        let mut vstate = VoiceState::new();

        let mut force = WorkBuffer::new(64);
        force.contents_mut()[..64].fill(f32::NEG_INFINITY);
        force.set_const_start(0);
        force.set_final(true);

        let mut outputs = vec![WorkBuffer::new(64); 2];
        let stop = render_voice(
            &params,
            &mut state,
            &mut vstate,
            &[force],
            &mut outputs,
            64,
            &ctx(),
        );
        assert_eq!(stop, 0);
        assert!(!vstate.active);
    }

    #[test]
    fn output_stays_in_sane_range() {
        let samples = render_with_seed(7, 2000);
        assert!(samples.iter().all(|v| v.abs() < 16.0));
        // Not all zero.
        assert!(samples.iter().any(|v| v.abs() > 1e-6));
    }
}
