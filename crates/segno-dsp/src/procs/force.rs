//! Force processor.
//!
//! Produces the voice's force track in dB: audio-unit global force plus the
//! channel-carried slider and tremolo, shaped by the unit's force envelope
//! while the note is on and by the release envelope after note-off. When the
//! release envelope closes at zero the output goes final `-inf`, which lets
//! every consumer downstream deactivate.

use segno_core::module::{AuParams, ForceEnvelopeParams};

use crate::controls::ForceControls;
use crate::conversions::scale_to_db;
use crate::time_env::TimeEnvState;
use crate::work_buffer::WorkBuffer;

use super::{valid_input, ProcCtx, VoiceState};

const PORT_IN_PITCH: usize = 0;
const PORT_OUT_FORCE: usize = 0;

/// Fallback release when the unit has no release envelope, in seconds.
const DEFAULT_RELEASE_SECONDS: f64 = 0.005;

/// Force processor voice state.
#[derive(Debug, Clone, PartialEq)]
pub struct ForceVState {
    pub controls: ForceControls,
    /// Global force plus the per-note variation draw, in dB.
    pub fixed_adjust: f64,
    pub env_state: TimeEnvState,
    pub release_env_state: TimeEnvState,
    /// Progress of the fallback release ramp in [0, 1].
    release_ramp: f64,
    release_closed: bool,
}

impl ForceVState {
    pub fn new(controls: ForceControls, fixed_adjust: f64) -> Self {
        ForceVState {
            controls,
            fixed_adjust,
            env_state: TimeEnvState::new(),
            release_env_state: TimeEnvState::new(),
            release_ramp: 0.0,
            release_closed: false,
        }
    }
}

fn env_scale_setup(env: &ForceEnvelopeParams, state: &mut TimeEnvState, pitch_cents: f64) {
    state.set_pitch_scale(pitch_cents, env.scale_center, env.scale_amount);
}

#[allow(clippy::too_many_arguments)]
pub fn render_voice(
    au_params: &AuParams,
    au_sustain: f64,
    state: &mut ForceVState,
    vstate: &mut VoiceState,
    inputs: &[WorkBuffer],
    outputs: &mut [WorkBuffer],
    frame_count: usize,
    ctx: &ProcCtx,
) -> usize {
    let Some(out_wb) = outputs.get_mut(PORT_OUT_FORCE) else {
        vstate.active = false;
        return 0;
    };

    if state.release_closed {
        // Keep emitting the final silent track until every consumer has seen
        // it and deactivated; the group cleanup then reclaims this voice.
        out_wb.contents_mut()[..frame_count].fill(f32::NEG_INFINITY);
        out_wb.set_const_start(0);
        out_wb.set_final(true);
        return frame_count;
    }

    let fc = &mut state.controls;
    fc.set_audio_rate(ctx.audio_rate);
    fc.set_tempo(ctx.tempo);

    // Envelope time scaling follows the pitch at the chunk start.
    let pitch_cents = valid_input(inputs, PORT_IN_PITCH)
        .map(|wb| wb.contents()[0] as f64)
        .unwrap_or(0.0);
    if let Some(env) = &au_params.env_force {
        env_scale_setup(env, &mut state.env_state, pitch_cents);
    }
    if let Some(env) = &au_params.env_force_release {
        env_scale_setup(env, &mut state.release_env_state, pitch_cents);
    }

    let hold_release = au_sustain > 0.0;
    let mut closed_at = None;

    {
        let out = &mut out_wb.contents_mut()[..frame_count];

        for (i, v) in out.iter_mut().enumerate() {
            if fc.slider.in_progress() {
                fc.force = fc.slider.step();
            }
            let mut force_db = fc.force + fc.tremolo.step() + state.fixed_adjust;

            if vstate.note_on {
                if let Some(env) = &au_params.env_force {
                    if env.enabled {
                        let y = state.env_state.step(
                            &env.envelope,
                            env.loop_enabled,
                            false,
                            ctx.audio_rate,
                        );
                        if y.is_finite() {
                            force_db += scale_to_db(y);
                        }
                    }
                }
            } else {
                let released = match &au_params.env_force_release {
                    Some(env) if env.enabled => {
                        let y = state.release_env_state.step(
                            &env.envelope,
                            false,
                            hold_release,
                            ctx.audio_rate,
                        );
                        if y.is_finite() {
                            force_db += scale_to_db(y);
                        }
                        state.release_env_state.is_finished() && y <= 0.0
                    }
                    _ => {
                        // No release envelope: short fixed fade-out.
                        if !hold_release {
                            state.release_ramp +=
                                1.0 / (DEFAULT_RELEASE_SECONDS * ctx.audio_rate as f64);
                        }
                        force_db += scale_to_db(1.0 - state.release_ramp.min(1.0));
                        state.release_ramp >= 1.0
                    }
                };

                if released {
                    *v = f32::NEG_INFINITY;
                    closed_at = Some(i);
                    break;
                }
            }

            *v = force_db as f32;
        }

        if let Some(start) = closed_at {
            out[start..].fill(f32::NEG_INFINITY);
        }
    }

    if let Some(start) = closed_at {
        out_wb.set_const_start(start);
        out_wb.set_final(true);
        state.release_closed = true;
        return frame_count;
    }

    // The track is constant from the start only if nothing moved this chunk.
    let settled = !fc.slider.in_progress()
        && !fc.tremolo.is_active()
        && (vstate.note_on
            && au_params
                .env_force
                .as_ref()
                .map(|env| !env.enabled || state.env_state.is_finished())
                .unwrap_or(true));
    out_wb.set_const_start(if settled { 0 } else { frame_count });

    frame_count
}
