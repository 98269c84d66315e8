//! Pitch processor.
//!
//! Produces the voice's pitch track in cents: slider toward a target, the
//! carried additive offset, vibrato, and optionally an arpeggio that
//! overrides the slider output. The constant-start marker is maintained so
//! downstream processors can shortcut once the pitch settles.

use crate::controls::PitchControls;
use crate::work_buffer::WorkBuffer;

use super::{ProcCtx, VoiceState};

const PORT_OUT_PITCH: usize = 0;

/// Arpeggio playback state.
///
/// The phase is in tone units; speed changes keep the phase, so a running
/// arpeggio never restarts mid-pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct ArpeggioState {
    pub on: bool,
    /// Cents offsets from the voice pitch; tone 0 is usually 0.
    pub tones: Vec<f64>,
    /// Tones per second.
    pub speed: f64,
    pub phase: f64,
}

impl ArpeggioState {
    pub fn off() -> Self {
        ArpeggioState {
            on: false,
            tones: Vec::new(),
            speed: 0.0,
            phase: 0.0,
        }
    }
}

/// Pitch processor voice state.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchVState {
    pub controls: PitchControls,
    pub arpeggio: ArpeggioState,
    pub pitch: f64,
}

impl PitchVState {
    pub fn new(controls: PitchControls, arpeggio: ArpeggioState) -> Self {
        let pitch = controls.pitch;
        PitchVState {
            controls,
            arpeggio,
            pitch,
        }
    }
}

pub fn render_voice(
    state: &mut PitchVState,
    vstate: &mut VoiceState,
    outputs: &mut [WorkBuffer],
    frame_count: usize,
    ctx: &ProcCtx,
) -> usize {
    let Some(out_wb) = outputs.get_mut(PORT_OUT_PITCH) else {
        vstate.active = false;
        return 0;
    };

    let pc = &mut state.controls;
    if !pc.pitch.is_finite() {
        vstate.active = false;
        out_wb.invalidate();
        return 0;
    }

    pc.set_audio_rate(ctx.audio_rate);
    pc.set_tempo(ctx.tempo);

    let mut const_start = 0;
    {
        let out = &mut out_wb.contents_mut()[..frame_count];

        // Slider toward the target pitch.
        let mut cur_pos = 0;
        while cur_pos < frame_count {
            let estimated = pc.slider.estimate_active_steps_left() as usize;
            if estimated > 0 {
                let slide_stop = frame_count.min(cur_pos + estimated);
                let mut new_pitch = pc.pitch;
                for v in out[cur_pos..slide_stop].iter_mut() {
                    new_pitch = pc.slider.step();
                    *v = new_pitch as f32;
                }
                pc.pitch = new_pitch;
                const_start = slide_stop;
                cur_pos = slide_stop;
            } else {
                let pitch = pc.pitch as f32;
                out[cur_pos..frame_count].fill(pitch);
                cur_pos = frame_count;
            }
        }

        // Carried offset.
        if pc.pitch_add != 0.0 {
            let add = pc.pitch_add as f32;
            for v in out.iter_mut() {
                *v += add;
            }
        }

        // Arpeggio overrides the settled pitch with its tone pattern.
        let arp = &mut state.arpeggio;
        if arp.on && !arp.tones.is_empty() {
            let tone_count = arp.tones.len();
            for v in out.iter_mut() {
                let index = (arp.phase as usize) % tone_count;
                *v += arp.tones[index] as f32;
                arp.phase += arp.speed / ctx.audio_rate as f64;
                if arp.phase >= tone_count as f64 {
                    arp.phase -= tone_count as f64;
                }
            }
            const_start = frame_count;
        }

        // Vibrato.
        let mut cur_pos = 0;
        let mut final_lfo_stop = 0;
        while cur_pos < frame_count {
            let estimated = pc.vibrato.estimate_active_steps_left() as usize;
            if estimated > 0 {
                let lfo_stop = frame_count.min(cur_pos.saturating_add(estimated));
                for v in out[cur_pos..lfo_stop].iter_mut() {
                    *v += pc.vibrato.step() as f32;
                }
                final_lfo_stop = lfo_stop;
                cur_pos = lfo_stop;
            } else {
                final_lfo_stop = cur_pos;
                break;
            }
        }
        const_start = const_start.max(final_lfo_stop);

        state.pitch = out[frame_count - 1] as f64;
    }

    out_wb.set_const_start(const_start);

    frame_count
}
