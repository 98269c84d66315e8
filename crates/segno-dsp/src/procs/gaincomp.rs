//! Gain compensation.
//!
//! Applies a |x| → |y| map envelope to the signal, preserving sign. Without
//! a map the processor passes the signal through unchanged.

use segno_core::module::GainCompParams;

use crate::conversions::clamp_finite;
use crate::work_buffer::WorkBuffer;

use super::{valid_input, VoiceState};

const PORT_IN_AUDIO_L: usize = 0;

fn apply_channel(
    params: &GainCompParams,
    input: Option<&WorkBuffer>,
    out_wb: &mut WorkBuffer,
    frame_count: usize,
) {
    let Some(input) = input else {
        return;
    };
    let out = &mut out_wb.contents_mut()[..frame_count];
    let input = input.contents();

    match &params.map {
        Some(map) if map.node_count() > 0 => {
            for (i, v) in out.iter_mut().enumerate() {
                let x = clamp_finite(input[i]);
                let mapped = map.value_at(x.abs() as f64).max(0.0) as f32;
                *v = mapped.copysign(x);
            }
        }
        _ => {
            out.copy_from_slice(&input[..frame_count]);
        }
    }
}

pub fn render_voice(
    params: &GainCompParams,
    vstate: &mut VoiceState,
    inputs: &[WorkBuffer],
    outputs: &mut [WorkBuffer],
    frame_count: usize,
) -> usize {
    if valid_input(inputs, PORT_IN_AUDIO_L).is_none()
        && valid_input(inputs, PORT_IN_AUDIO_L + 1).is_none()
    {
        vstate.active = false;
        return 0;
    }
    render_mixed(params, inputs, outputs, frame_count);
    frame_count
}

pub fn render_mixed(
    params: &GainCompParams,
    inputs: &[WorkBuffer],
    outputs: &mut [WorkBuffer],
    frame_count: usize,
) {
    if outputs.len() < 2 {
        return;
    }
    let (left, right) = outputs.split_at_mut(1);
    apply_channel(
        params,
        valid_input(inputs, PORT_IN_AUDIO_L),
        &mut left[0],
        frame_count,
    );
    apply_channel(
        params,
        valid_input(inputs, PORT_IN_AUDIO_L + 1),
        &mut right[0],
        frame_count,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use segno_core::Envelope;

    #[test]
    fn no_map_passes_through() {
        let params = GainCompParams::default();
        let mut inputs = vec![WorkBuffer::new(4); 2];
        inputs[0].contents_mut()[..4].copy_from_slice(&[0.1, -0.2, 0.3, -0.4]);
        let mut outputs = vec![WorkBuffer::new(4); 2];

        render_mixed(&params, &inputs, &mut outputs, 4);
        assert_eq!(outputs[0].contents()[..4], [0.1, -0.2, 0.3, -0.4]);
    }

    #[test]
    fn map_preserves_sign() {
        let params = GainCompParams {
            // Square-root-ish boost of quiet signal.
            map: Some(Envelope::from_nodes(&[(0.0, 0.0), (0.25, 0.5), (1.0, 1.0)])),
        };
        let mut inputs = vec![WorkBuffer::new(2); 2];
        inputs[0].contents_mut()[..2].copy_from_slice(&[0.25, -0.25]);
        let mut outputs = vec![WorkBuffer::new(2); 2];

        render_mixed(&params, &inputs, &mut outputs, 2);
        assert_eq!(outputs[0].contents()[..2], [0.5, -0.5]);
    }
}
