//! Freeverb reverb.
//!
//! The classic topology: 8 parallel damped comb filters into 4 series
//! all-pass filters per channel, with the right channel's delay lines offset
//! by a 23-sample stereo spread. Tunings are the 44100 Hz reference values
//! scaled to the engine rate. Reflectivity is the comb feedback, damping the
//! comb's internal lowpass.

use segno_core::module::FreeverbParams;

use crate::conversions::clamp_finite;
use crate::work_buffer::WorkBuffer;

use super::{valid_input, ProcCtx};

const PORT_IN_AUDIO_L: usize = 0;

/// Comb delay lengths at 44100 Hz.
const COMB_TUNINGS: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];
/// All-pass delay lengths at 44100 Hz.
const ALLPASS_TUNINGS: [usize; 4] = [556, 441, 341, 225];
/// Right-channel offset at 44100 Hz.
const STEREO_SPREAD: usize = 23;
/// Input attenuation before the comb bank.
const FIXED_GAIN: f32 = 0.015;
/// All-pass feedback.
const ALLPASS_FEEDBACK: f32 = 0.5;

#[derive(Debug, Clone, PartialEq)]
struct Comb {
    buf: Vec<f32>,
    pos: usize,
    filter_store: f32,
}

impl Comb {
    fn new(size: usize) -> Self {
        Comb {
            buf: vec![0.0; size.max(1)],
            pos: 0,
            filter_store: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32, feedback: f32, damp: f32) -> f32 {
        let output = self.buf[self.pos];
        self.filter_store = output * (1.0 - damp) + self.filter_store * damp;
        self.buf[self.pos] = input + self.filter_store * feedback;
        self.pos = (self.pos + 1) % self.buf.len();
        output
    }

    fn clear(&mut self) {
        self.buf.fill(0.0);
        self.filter_store = 0.0;
    }
}

#[derive(Debug, Clone, PartialEq)]
struct AllPass {
    buf: Vec<f32>,
    pos: usize,
}

impl AllPass {
    fn new(size: usize) -> Self {
        AllPass {
            buf: vec![0.0; size.max(1)],
            pos: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let buffered = self.buf[self.pos];
        let output = buffered - input;
        self.buf[self.pos] = input + buffered * ALLPASS_FEEDBACK;
        self.pos = (self.pos + 1) % self.buf.len();
        output
    }

    fn clear(&mut self) {
        self.buf.fill(0.0);
    }
}

#[derive(Debug, Clone, PartialEq)]
struct FreeverbChannel {
    combs: Vec<Comb>,
    allpasses: Vec<AllPass>,
}

impl FreeverbChannel {
    fn new(audio_rate: u32, offset: usize) -> Self {
        let scale = audio_rate as f64 / 44100.0;
        let scaled = |t: usize| ((t + offset) as f64 * scale).round() as usize;
        FreeverbChannel {
            combs: COMB_TUNINGS.iter().map(|t| Comb::new(scaled(*t))).collect(),
            allpasses: ALLPASS_TUNINGS
                .iter()
                .map(|t| AllPass::new(scaled(*t)))
                .collect(),
        }
    }

    #[inline]
    fn process(&mut self, input: f32, feedback: f32, damp: f32) -> f32 {
        let mut output = 0.0;
        for comb in &mut self.combs {
            output += comb.process(input, feedback, damp);
        }
        for allpass in &mut self.allpasses {
            output = allpass.process(output);
        }
        output
    }

    fn clear(&mut self) {
        for comb in &mut self.combs {
            comb.clear();
        }
        for allpass in &mut self.allpasses {
            allpass.clear();
        }
    }
}

/// Freeverb mixed state.
#[derive(Debug, Clone, PartialEq)]
pub struct FreeverbMState {
    channels: [FreeverbChannel; 2],
}

impl FreeverbMState {
    pub fn new(_params: &FreeverbParams, audio_rate: u32) -> Self {
        FreeverbMState {
            channels: [
                FreeverbChannel::new(audio_rate, 0),
                FreeverbChannel::new(audio_rate, STEREO_SPREAD),
            ],
        }
    }

    pub fn clear_history(&mut self) {
        for ch in &mut self.channels {
            ch.clear();
        }
    }
}

pub fn render_mixed(
    params: &FreeverbParams,
    state: &mut FreeverbMState,
    inputs: &[WorkBuffer],
    outputs: &mut [WorkBuffer],
    frame_count: usize,
    _ctx: &ProcCtx,
) {
    if outputs.len() < 2 {
        return;
    }
    let feedback = params.reflectivity.clamp(0.0, 0.999) as f32;
    let damp = params.damping.clamp(0.0, 1.0) as f32;

    let in_l = valid_input(inputs, PORT_IN_AUDIO_L).map(|wb| wb.contents());
    let in_r = valid_input(inputs, PORT_IN_AUDIO_L + 1).map(|wb| wb.contents());

    let (left, right) = outputs.split_at_mut(1);
    let out_l = &mut left[0].contents_mut()[..frame_count];
    let out_r = &mut right[0].contents_mut()[..frame_count];

    for i in 0..frame_count {
        // Mono sum drives both channels, as in the reference topology.
        let dry_l = in_l.map(|b| clamp_finite(b[i])).unwrap_or(0.0);
        let dry_r = in_r.map(|b| clamp_finite(b[i])).unwrap_or(dry_l);
        let input = (dry_l + dry_r) * FIXED_GAIN;

        out_l[i] = state.channels[0].process(input, feedback, damp);
        out_r[i] = state.channels[1].process(input, feedback, damp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ProcCtx {
        ProcCtx {
            audio_rate: 44100,
            tempo: 120.0,
        }
    }

    fn impulse_response(frames: usize) -> (Vec<f32>, Vec<f32>) {
        let params = FreeverbParams::default();
        let mut state = FreeverbMState::new(&params, 44100);

        let mut inputs = vec![WorkBuffer::new(frames); 2];
        inputs[0].clear(frames);
        inputs[0].contents_mut()[0] = 1.0;
        inputs[1].clear(frames);
        inputs[1].contents_mut()[0] = 1.0;
        let mut outputs = vec![WorkBuffer::new(frames); 2];

        render_mixed(&params, &mut state, &inputs, &mut outputs, frames, &ctx());
        (
            outputs[0].contents()[..frames].to_vec(),
            outputs[1].contents()[..frames].to_vec(),
        )
    }

    #[test]
    fn impulse_produces_a_tail() {
        let (out_l, _) = impulse_response(8192);
        // Nothing before the shortest comb delay minus the allpass span.
        let energy: f64 = out_l[2000..].iter().map(|v| (*v as f64).abs()).sum();
        assert!(energy > 0.0, "no reverb tail");
    }

    #[test]
    fn channels_are_decorrelated_by_the_spread() {
        let (out_l, out_r) = impulse_response(8192);
        assert_ne!(out_l, out_r);
    }

    #[test]
    fn silence_in_silence_out() {
        let params = FreeverbParams::default();
        let mut state = FreeverbMState::new(&params, 44100);
        let mut inputs = vec![WorkBuffer::new(256); 2];
        inputs[0].clear(256);
        inputs[1].clear(256);
        let mut outputs = vec![WorkBuffer::new(256); 2];

        render_mixed(&params, &mut state, &inputs, &mut outputs, 256, &ctx());
        assert!(outputs[0].contents()[..256].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn clear_history_silences_the_tail() {
        let params = FreeverbParams::default();
        let mut state = FreeverbMState::new(&params, 44100);

        let mut inputs = vec![WorkBuffer::new(256); 2];
        inputs[0].clear(256);
        inputs[0].contents_mut()[0] = 1.0;
        inputs[1].clear(256);
        let mut outputs = vec![WorkBuffer::new(256); 2];
        render_mixed(&params, &mut state, &inputs, &mut outputs, 256, &ctx());

        state.clear_history();

        inputs[0].clear(256);
        let mut outputs2 = vec![WorkBuffer::new(256); 2];
        render_mixed(&params, &mut state, &inputs, &mut outputs2, 256, &ctx());
        assert!(outputs2[0].contents()[..256].iter().all(|v| *v == 0.0));
    }
}
