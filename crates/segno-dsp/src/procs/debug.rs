//! Debug generator.
//!
//! Emits an easily recognizable waveform: 1.0 on the first frame of each
//! period and 0.5 elsewhere, negated after note-off. The voice stops after
//! 10 periods, or 2 periods after note-off. With `single_pulse` set it emits
//! one force-scaled frame and stops. Mostly useful for verifying the voice
//! pipeline end to end.

use segno_core::module::DebugParams;

use crate::conversions::{cents_to_hz, db_to_scale};
use crate::work_buffer::WorkBuffer;

use super::{valid_input, ProcCtx, VoiceState};

const PERIODS_MAX: u32 = 10;
const NOTE_OFF_PERIODS: f64 = 2.0;

const PORT_IN_PITCH: usize = 0;
const PORT_IN_FORCE: usize = 1;

/// Debug generator voice state.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugVState {
    /// Completed periods.
    pos: u32,
    /// Frame position within the current period (0 = period start).
    rel_pos: u32,
    rel_pos_rem: f64,
    noff_pos_rem: f64,
    pulse_sent: bool,
}

impl DebugVState {
    pub fn new() -> Self {
        DebugVState {
            pos: 0,
            rel_pos: 0,
            rel_pos_rem: 0.0,
            noff_pos_rem: 0.0,
            pulse_sent: false,
        }
    }
}

impl Default for DebugVState {
    fn default() -> Self {
        DebugVState::new()
    }
}

#[allow(clippy::too_many_arguments)]
pub fn render_voice(
    params: &DebugParams,
    state: &mut DebugVState,
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

    let pitches = valid_input(inputs, PORT_IN_PITCH).map(|wb| wb.contents());
    let forces = valid_input(inputs, PORT_IN_FORCE).map(|wb| wb.contents());
    let rate = ctx.audio_rate as f64;

    let force_scale_at = |i: usize| -> f64 {
        forces
            .map(|f| db_to_scale(f[i] as f64))
            .unwrap_or(1.0)
    };

    if params.single_pulse {
        if state.pulse_sent {
            vstate.active = false;
            return 0;
        }
        let value = force_scale_at(0) as f32;
        let (left, right) = outputs.split_at_mut(1);
        left[0].contents_mut()[0] = value;
        right[0].contents_mut()[0] = value;
        state.pulse_sent = true;
        vstate.active = false;
        return 1;
    }

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
            let freq = cents_to_hz(pitch_cents);

            let mut value = if state.rel_pos == 0 {
                state.rel_pos = 1;
                1.0
            } else {
                0.5
            };
            if !vstate.note_on {
                value = -value;
            }
            let sample = (value * force_scale_at(i)) as f32;
            out_l[i] = sample;
            out_r[i] = sample;

            state.rel_pos_rem += freq / rate;

            if !vstate.note_on {
                state.noff_pos_rem += freq / rate;
                if state.noff_pos_rem >= NOTE_OFF_PERIODS {
                    vstate.active = false;
                    stop = i + 1;
                    break;
                }
            }

            if state.rel_pos_rem >= 1.0 {
                state.pos += 1;
                if state.pos >= PERIODS_MAX {
                    vstate.active = false;
                    stop = i + 1;
                    break;
                }
                state.rel_pos = 0;
                state.rel_pos_rem -= state.rel_pos_rem.floor();
            }
        }
    }

    stop
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_setup(frame_count: usize) -> (Vec<WorkBuffer>, Vec<WorkBuffer>) {
        let inputs = vec![WorkBuffer::new(frame_count); 2];
        let outputs = vec![WorkBuffer::new(frame_count); 2];
        (inputs, outputs)
    }

    #[test]
    fn period_shape_at_reference_pitch() {
        // 0 cents = 440 Hz at 48 kHz: a period is ~109.09 frames.
        let (mut inputs, mut outputs) = render_setup(256);
        inputs[PORT_IN_PITCH].clear(256);
        let params = DebugParams::default();
        let mut state = DebugVState::new();
        let mut vstate = VoiceState::new();
        let ctx = ProcCtx {
            audio_rate: 48000,
            tempo: 120.0,
        };

        let stop = render_voice(
            &params,
            &mut state,
            &mut vstate,
            &inputs,
            &mut outputs,
            256,
            &ctx,
        );
        assert_eq!(stop, 256);

        let out = outputs[0].contents();
        assert_eq!(out[0], 1.0);
        // The accumulator crosses 1.0 only after frame 109, so the second
        // pulse lands on frame 110.
        for (i, v) in out.iter().enumerate().take(110).skip(1) {
            assert_eq!(*v, 0.5, "frame {i}");
        }
        assert_eq!(out[110], 1.0);
        assert_eq!(outputs[0].contents()[..256], outputs[1].contents()[..256]);
    }

    #[test]
    fn stops_after_ten_periods() {
        let (mut inputs, mut outputs) = render_setup(4096);
        inputs[PORT_IN_PITCH].clear(4096);
        let params = DebugParams::default();
        let mut state = DebugVState::new();
        let mut vstate = VoiceState::new();
        let ctx = ProcCtx {
            audio_rate: 48000,
            tempo: 120.0,
        };

        let stop = render_voice(
            &params,
            &mut state,
            &mut vstate,
            &inputs,
            &mut outputs,
            4096,
            &ctx,
        );
        // 10 periods of ~109.09 frames.
        assert!((1085..=1095).contains(&stop), "stop {stop}");
        assert!(!vstate.active);
    }

    #[test]
    fn single_pulse_emits_one_frame() {
        let (inputs, mut outputs) = render_setup(16);
        let params = DebugParams { single_pulse: true };
        let mut state = DebugVState::new();
        let mut vstate = VoiceState::new();
        let ctx = ProcCtx {
            audio_rate: 48000,
            tempo: 120.0,
        };

        let stop = render_voice(
            &params,
            &mut state,
            &mut vstate,
            &inputs,
            &mut outputs,
            16,
            &ctx,
        );
        assert_eq!(stop, 1);
        assert_eq!(outputs[0].contents()[0], 1.0);
        assert!(!vstate.active);
    }

    #[test]
    fn nan_pitch_deactivates() {
        let (mut inputs, mut outputs) = render_setup(16);
        inputs[PORT_IN_PITCH].contents_mut()[..16].fill(f32::NAN);
        let params = DebugParams::default();
        let mut state = DebugVState::new();
        let mut vstate = VoiceState::new();
        let ctx = ProcCtx {
            audio_rate: 48000,
            tempo: 120.0,
        };

        let stop = render_voice(
            &params,
            &mut state,
            &mut vstate,
            &inputs,
            &mut outputs,
            16,
            &ctx,
        );
        assert_eq!(stop, 0);
        assert!(!vstate.active);
    }

    #[test]
    fn note_off_negates_and_stops() {
        let (mut inputs, mut outputs) = render_setup(512);
        inputs[PORT_IN_PITCH].clear(512);
        let params = DebugParams::default();
        let mut state = DebugVState::new();
        let mut vstate = VoiceState::new();
        vstate.set_note_off();
        let ctx = ProcCtx {
            audio_rate: 48000,
            tempo: 120.0,
        };

        let stop = render_voice(
            &params,
            &mut state,
            &mut vstate,
            &inputs,
            &mut outputs,
            512,
            &ctx,
        );
        assert_eq!(outputs[0].contents()[0], -1.0);
        assert_eq!(outputs[0].contents()[1], -0.5);
        // Two periods of tail.
        assert!((215..=222).contains(&stop), "stop {stop}");
        assert!(!vstate.active);
    }
}
