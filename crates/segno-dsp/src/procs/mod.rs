//! Processor renderers.
//!
//! Each processor kind gets one module with its voice and/or mixed renderer
//! plus the state it keeps. Dispatch is a match on the parameter variant; the
//! graph executor owns all state and passes it into every call, so renderers
//! hold no references between chunks.
//!
//! # Port conventions
//!
//! Audio is stereo as two adjacent mono ports (L at the even index). The
//! pitch track is cents, the force track dB; generators convert force to an
//! amplitude scale at the point of use.
//!
//! | kind          | inputs                          | outputs      |
//! |---------------|---------------------------------|--------------|
//! | debug         | 0 pitch, 1 force                | 0/1 audio    |
//! | pitch         | -                               | 0 pitch      |
//! | force         | 0 pitch                         | 0 force      |
//! | filter        | 0/1 audio, 2 cutoff, 3 resonance| 0/1 audio    |
//! | sample        | 0 pitch, 1 force                | 0/1 audio    |
//! | noise         | 0 force                         | 0/1 audio    |
//! | ringmod/mult  | 0/1 audio A, 2/3 audio B        | 0/1 audio    |
//! | gaincomp      | 0/1 audio                       | 0/1 audio    |
//! | chorus        | 0/1 audio                       | 0/1 audio    |
//! | karplus-strong| 0 pitch, 1 force, 2/3 excitation| 0/1 audio    |
//! | freeverb      | 0/1 audio                       | 0/1 audio    |

pub mod chorus;
pub mod debug;
pub mod filter_proc;
pub mod force;
pub mod freeverb;
pub mod gaincomp;
pub mod ks;
pub mod mult;
pub mod noise;
pub mod pitch;
pub mod sample_proc;

use segno_core::module::{AuParams, ProcDef, ProcParams};

use crate::work_buffer::WorkBuffer;

/// Shared per-call context.
#[derive(Debug, Clone, Copy)]
pub struct ProcCtx {
    pub audio_rate: u32,
    pub tempo: f64,
}

/// Attack ramp length applied by sample-producing generators, in seconds.
pub const RAMP_ATTACK_SECONDS: f64 = 0.002;

/// Common per-voice state shared by every processor kind.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceState {
    pub active: bool,
    pub note_on: bool,
    /// Frames of the attack ramp already played. An integer so the ramp is
    /// identical no matter how the render is chunked.
    pub ramp_frames: u32,
    /// Earliest frame (relative to the current chunk) at which the voice may
    /// be deactivated once its renderer stops producing signal.
    pub keep_alive_stop: usize,
}

impl VoiceState {
    pub fn new() -> Self {
        VoiceState {
            active: true,
            note_on: true,
            ramp_frames: 0,
            keep_alive_stop: 0,
        }
    }

    pub fn set_note_off(&mut self) {
        self.note_on = false;
    }

    /// Skip the attack ramp entirely.
    pub fn finish_attack_ramp(&mut self) {
        self.ramp_frames = u32::MAX;
    }
}

impl Default for VoiceState {
    fn default() -> Self {
        VoiceState::new()
    }
}

/// Per-voice processor state, one variant per kind.
///
/// A fixed-size tagged union: voice slots reuse their storage across notes
/// without per-note heap churn (the Karplus-Strong ring is the one deliberate
/// allocation, made at note start).
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceProcState {
    /// The bound processor has no voice path.
    Inert,
    Debug(debug::DebugVState),
    Pitch(pitch::PitchVState),
    Force(force::ForceVState),
    Filter(filter_proc::FilterVState),
    Sample(sample_proc::SampleVState),
    Noise(noise::NoiseVState),
    Mult,
    GainComp,
    KarplusStrong(ks::KsVState),
}

/// Per-device state of mixed-path processors.
#[derive(Debug, Clone, PartialEq)]
pub enum MixedProcState {
    Stateless,
    Filter(filter_proc::FilterMState),
    Chorus(chorus::ChorusMState),
    Freeverb(freeverb::FreeverbMState),
}

impl MixedProcState {
    /// Build the mixed state a processor definition needs.
    pub fn for_proc(def: &ProcDef, audio_rate: u32) -> Self {
        match &def.params {
            ProcParams::Filter(params) => {
                MixedProcState::Filter(filter_proc::FilterMState::new(params, audio_rate))
            }
            ProcParams::Chorus(params) => {
                MixedProcState::Chorus(chorus::ChorusMState::new(params, audio_rate))
            }
            ProcParams::Freeverb(params) => {
                MixedProcState::Freeverb(freeverb::FreeverbMState::new(params, audio_rate))
            }
            _ => MixedProcState::Stateless,
        }
    }

    /// Reset DSP tails without reallocating.
    pub fn clear_history(&mut self) {
        match self {
            MixedProcState::Stateless => {}
            MixedProcState::Filter(state) => state.clear_history(),
            MixedProcState::Chorus(state) => state.clear_history(),
            MixedProcState::Freeverb(state) => state.clear_history(),
        }
    }
}

/// Render one voice through a processor.
///
/// Returns the stop index: the frame past the last one written. A stop index
/// of 0 with an elapsed keep-alive window means the voice can be deactivated.
#[allow(clippy::too_many_arguments)]
pub fn render_voice(
    def: &ProcDef,
    au_params: &AuParams,
    au_sustain: f64,
    vstate: &mut VoiceState,
    pstate: &mut VoiceProcState,
    inputs: &[WorkBuffer],
    outputs: &mut [WorkBuffer],
    frame_count: usize,
    ctx: &ProcCtx,
) -> usize {
    debug_assert!(frame_count > 0);
    debug_assert!(ctx.audio_rate > 0);
    debug_assert!(ctx.tempo > 0.0);

    match (&def.params, pstate) {
        (ProcParams::Debug(params), VoiceProcState::Debug(state)) => {
            debug::render_voice(params, state, vstate, inputs, outputs, frame_count, ctx)
        }
        (ProcParams::Pitch, VoiceProcState::Pitch(state)) => {
            pitch::render_voice(state, vstate, outputs, frame_count, ctx)
        }
        (ProcParams::Force, VoiceProcState::Force(state)) => force::render_voice(
            au_params, au_sustain, state, vstate, inputs, outputs, frame_count, ctx,
        ),
        (ProcParams::Filter(params), VoiceProcState::Filter(state)) => {
            filter_proc::render_voice(params, state, vstate, inputs, outputs, frame_count, ctx)
        }
        (ProcParams::Sample(params), VoiceProcState::Sample(state)) => {
            sample_proc::render_voice(params, state, vstate, inputs, outputs, frame_count, ctx)
        }
        (ProcParams::Noise(params), VoiceProcState::Noise(state)) => {
            noise::render_voice(params, state, vstate, inputs, outputs, frame_count, ctx)
        }
        (ProcParams::RingMod | ProcParams::Mult, VoiceProcState::Mult) => {
            mult::render_voice(vstate, inputs, outputs, frame_count)
        }
        (ProcParams::GainComp(params), VoiceProcState::GainComp) => {
            gaincomp::render_voice(params, vstate, inputs, outputs, frame_count)
        }
        (ProcParams::KarplusStrong(params), VoiceProcState::KarplusStrong(state)) => {
            ks::render_voice(params, state, vstate, inputs, outputs, frame_count, ctx)
        }
        _ => {
            // State/definition mismatch: nothing sensible to render.
            vstate.active = false;
            0
        }
    }
}

/// Render a processor's mixed path.
pub fn render_mixed(
    def: &ProcDef,
    pstate: &mut MixedProcState,
    inputs: &[WorkBuffer],
    outputs: &mut [WorkBuffer],
    frame_count: usize,
    ctx: &ProcCtx,
) {
    match (&def.params, pstate) {
        (ProcParams::Filter(params), MixedProcState::Filter(state)) => {
            filter_proc::render_mixed(params, state, inputs, outputs, frame_count, ctx)
        }
        (ProcParams::Chorus(params), MixedProcState::Chorus(state)) => {
            chorus::render_mixed(params, state, inputs, outputs, frame_count, ctx)
        }
        (ProcParams::Freeverb(params), MixedProcState::Freeverb(state)) => {
            freeverb::render_mixed(params, state, inputs, outputs, frame_count, ctx)
        }
        (ProcParams::RingMod | ProcParams::Mult, _) => {
            mult::render_mixed(inputs, outputs, frame_count)
        }
        (ProcParams::GainComp(params), _) => {
            gaincomp::render_mixed(params, inputs, outputs, frame_count)
        }
        _ => {}
    }
}

/// Apply the shared attack ramp to freshly generated audio.
///
/// Generators that start from nothing (noise, sample, karplus-strong) fade in
/// over [`RAMP_ATTACK_SECONDS`] to avoid a click at note start. Each frame's
/// gain is derived from the absolute frame index, so the result does not
/// depend on how rendering was chunked.
pub fn ramp_attack(
    vstate: &mut VoiceState,
    outputs: &mut [WorkBuffer],
    channels: usize,
    frame_count: usize,
    audio_rate: u32,
) {
    let total = (RAMP_ATTACK_SECONDS * audio_rate as f64) as u32;
    if total == 0 || vstate.ramp_frames >= total {
        return;
    }
    let step = 1.0 / total as f64;

    for ch in 0..channels.min(outputs.len()) {
        if !outputs[ch].is_valid() {
            continue;
        }
        for (i, v) in outputs[ch].contents_mut()[..frame_count]
            .iter_mut()
            .enumerate()
        {
            let k = vstate.ramp_frames as usize + i;
            if k >= total as usize {
                break;
            }
            *v *= (k as f64 * step) as f32;
        }
    }

    vstate.ramp_frames = vstate.ramp_frames.saturating_add(frame_count as u32);
}

/// Read a port buffer if it carries output from this cycle.
#[inline]
pub(crate) fn valid_input<'a>(inputs: &'a [WorkBuffer], port: usize) -> Option<&'a WorkBuffer> {
    inputs.get(port).filter(|wb| wb.is_valid())
}
