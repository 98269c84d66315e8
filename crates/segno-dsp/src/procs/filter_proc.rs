//! Lowpass filter processor.
//!
//! Order-2 lowpass over a stereo pair, driven either by the cutoff/resonance
//! input ports or by the channel filter controls carried into the voice.
//! Coefficient changes crossfade between filter states instead of snapping.

use segno_core::module::FilterParams;

use crate::controls::FilterControls;
use crate::conversions::{clamp_finite, log_cutoff_to_hz};
use crate::filter::SmoothLowpass;
use crate::work_buffer::WorkBuffer;

use super::{valid_input, ProcCtx, VoiceState};

const PORT_IN_AUDIO_L: usize = 0;
const PORT_IN_AUDIO_R: usize = 1;
const PORT_IN_CUTOFF: usize = 2;
const PORT_IN_RESONANCE: usize = 3;

/// Filter processor voice state.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterVState {
    pub controls: FilterControls,
    lowpass: SmoothLowpass,
}

impl FilterVState {
    pub fn new(params: &FilterParams, controls: FilterControls, audio_rate: u32) -> Self {
        let cutoff_hz = log_cutoff_to_hz(controls.lowpass.min(params.cutoff));
        FilterVState {
            controls,
            lowpass: SmoothLowpass::new(cutoff_hz, params.resonance, audio_rate),
        }
    }
}

/// Filter processor mixed state.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterMState {
    lowpass: SmoothLowpass,
}

impl FilterMState {
    pub fn new(params: &FilterParams, audio_rate: u32) -> Self {
        FilterMState {
            lowpass: SmoothLowpass::new(
                log_cutoff_to_hz(params.cutoff),
                params.resonance,
                audio_rate,
            ),
        }
    }

    pub fn clear_history(&mut self) {
        self.lowpass.reset();
    }
}

fn run_filter(
    lowpass: &mut SmoothLowpass,
    cutoff_values: impl Fn(usize) -> (f64, f64),
    inputs: &[WorkBuffer],
    outputs: &mut [WorkBuffer],
    frame_count: usize,
    audio_rate: u32,
) {
    let in_l = valid_input(inputs, PORT_IN_AUDIO_L).map(|wb| wb.contents());
    let in_r = valid_input(inputs, PORT_IN_AUDIO_R).map(|wb| wb.contents());

    let (left, right) = outputs.split_at_mut(1);
    let out_l = &mut left[0].contents_mut()[..frame_count];
    let out_r = &mut right[0].contents_mut()[..frame_count];

    for i in 0..frame_count {
        let (cutoff, resonance) = cutoff_values(i);
        lowpass.set_params(log_cutoff_to_hz(cutoff), resonance, audio_rate);

        if let Some(input) = in_l {
            out_l[i] = lowpass.process(0, clamp_finite(input[i]) as f64) as f32;
        } else {
            out_l[i] = 0.0;
        }
        if let Some(input) = in_r {
            out_r[i] = lowpass.process(1, clamp_finite(input[i]) as f64) as f32;
        } else {
            out_r[i] = 0.0;
        }
        lowpass.step_xfade();
    }
}

#[allow(clippy::too_many_arguments)]
pub fn render_voice(
    params: &FilterParams,
    state: &mut FilterVState,
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
    if valid_input(inputs, PORT_IN_AUDIO_L).is_none()
        && valid_input(inputs, PORT_IN_AUDIO_R).is_none()
    {
        vstate.active = false;
        return 0;
    }

    let fc = &mut state.controls;
    fc.set_audio_rate(ctx.audio_rate);
    fc.set_tempo(ctx.tempo);

    let cutoff_in = valid_input(inputs, PORT_IN_CUTOFF).map(|wb| wb.contents());
    let resonance_in = valid_input(inputs, PORT_IN_RESONANCE).map(|wb| wb.contents());

    // Advance the controls for the whole chunk up front; the slider and
    // autowah move slowly relative to a chunk.
    if fc.slider.in_progress() {
        fc.lowpass = fc.slider.skip(frame_count as u64);
    }
    let wah = if fc.autowah.is_active() {
        fc.autowah.skip(frame_count as u64)
    } else {
        0.0
    };
    let control_cutoff = (fc.lowpass + wah).min(params.cutoff);
    let control_resonance = if fc.resonance > 0.0 {
        fc.resonance
    } else {
        params.resonance
    };

    run_filter(
        &mut state.lowpass,
        |i| {
            let cutoff = cutoff_in.map(|c| c[i] as f64).unwrap_or(control_cutoff);
            let resonance = resonance_in
                .map(|r| r[i] as f64)
                .unwrap_or(control_resonance);
            (cutoff, resonance)
        },
        inputs,
        outputs,
        frame_count,
        ctx.audio_rate,
    );

    frame_count
}

pub fn render_mixed(
    params: &FilterParams,
    state: &mut FilterMState,
    inputs: &[WorkBuffer],
    outputs: &mut [WorkBuffer],
    frame_count: usize,
    ctx: &ProcCtx,
) {
    if outputs.len() < 2 {
        return;
    }
    let cutoff_in = valid_input(inputs, PORT_IN_CUTOFF).map(|wb| wb.contents());
    let resonance_in = valid_input(inputs, PORT_IN_RESONANCE).map(|wb| wb.contents());

    run_filter(
        &mut state.lowpass,
        |i| {
            let cutoff = cutoff_in.map(|c| c[i] as f64).unwrap_or(params.cutoff);
            let resonance = resonance_in
                .map(|r| r[i] as f64)
                .unwrap_or(params.resonance);
            (cutoff, resonance)
        },
        inputs,
        outputs,
        frame_count,
        ctx.audio_rate,
    );
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

    #[test]
    fn no_audio_input_deactivates_voice() {
        let params = FilterParams::default();
        let mut state =
            FilterVState::new(&params, FilterControls::new(48000, 120.0), 48000);
        let mut vstate = VoiceState::new();
        let inputs = vec![WorkBuffer::new(16); 4];
        let mut outputs = vec![WorkBuffer::new(16); 2];

        let stop = render_voice(
            &params,
            &mut state,
            &mut vstate,
            &inputs,
            &mut outputs,
            16,
            &ctx(),
        );
        assert_eq!(stop, 0);
        assert!(!vstate.active);
    }

    #[test]
    fn low_cutoff_attenuates_alternation() {
        let params = FilterParams::default();
        let mut controls = FilterControls::new(48000, 120.0);
        // ~110 Hz cutoff on the log scale.
        controls.lowpass = 45.0;
        let mut state = FilterVState::new(&params, controls, 48000);
        let mut vstate = VoiceState::new();

        let mut inputs = vec![WorkBuffer::new(2048); 4];
        for (i, v) in inputs[0].contents_mut()[..2048].iter_mut().enumerate() {
            *v = if i % 2 == 0 { 1.0 } else { -1.0 };
        }
        let mut outputs = vec![WorkBuffer::new(2048); 2];

        render_voice(
            &params,
            &mut state,
            &mut vstate,
            &inputs,
            &mut outputs,
            2048,
            &ctx(),
        );
        let tail_peak = outputs[0].contents()[1024..2048]
            .iter()
            .fold(0.0f32, |m, v| m.max(v.abs()));
        assert!(tail_peak < 0.02, "tail peak {tail_peak}");
    }

    #[test]
    fn mixed_path_passes_low_frequency_content() {
        let params = FilterParams::default();
        let mut state = FilterMState::new(&params, 48000);

        let mut inputs = vec![WorkBuffer::new(1024); 4];
        inputs[0].contents_mut()[..1024].fill(0.5);
        let mut outputs = vec![WorkBuffer::new(1024); 2];

        render_mixed(&params, &mut state, &inputs, &mut outputs, 1024, &ctx());
        let settled = outputs[0].contents()[1000];
        assert!((settled - 0.5).abs() < 0.01, "settled {settled}");
    }
}
