//! Signal multiplier (ring modulation).
//!
//! Two stereo inputs, one stereo output, `out = a * b` with both sides
//! clamped to the finite range first. A finalized zero on either input
//! short-circuits the output to a finalized zero.

use crate::conversions::clamp_finite;
use crate::work_buffer::WorkBuffer;

use super::{valid_input, VoiceState};

const PORT_IN_A_L: usize = 0;
const PORT_IN_B_L: usize = 2;

fn multiply_channel(
    a: Option<&WorkBuffer>,
    b: Option<&WorkBuffer>,
    out_wb: &mut WorkBuffer,
    frame_count: usize,
) {
    let (Some(a), Some(b)) = (a, b) else {
        return;
    };

    if a.is_all_final(0.0) || b.is_all_final(0.0) {
        out_wb.clear(frame_count);
        return;
    }

    let out = &mut out_wb.contents_mut()[..frame_count];
    let a = a.contents();
    let b = b.contents();
    for (i, v) in out.iter_mut().enumerate() {
        *v = clamp_finite(a[i]) * clamp_finite(b[i]);
    }
}

pub fn render_voice(
    vstate: &mut VoiceState,
    inputs: &[WorkBuffer],
    outputs: &mut [WorkBuffer],
    frame_count: usize,
) -> usize {
    let has_left = valid_input(inputs, PORT_IN_A_L).is_some()
        && valid_input(inputs, PORT_IN_B_L).is_some();
    let has_right = valid_input(inputs, PORT_IN_A_L + 1).is_some()
        && valid_input(inputs, PORT_IN_B_L + 1).is_some();
    if !has_left && !has_right {
        vstate.active = false;
        return 0;
    }

    // Every input settled to its steady state: the product is settled too,
    // so there is nothing left for this voice to contribute.
    let inputs_settled = [
        PORT_IN_A_L,
        PORT_IN_A_L + 1,
        PORT_IN_B_L,
        PORT_IN_B_L + 1,
    ]
    .into_iter()
    .filter_map(|port| valid_input(inputs, port))
    .all(|wb| wb.is_final() && wb.const_start() == 0);
    if inputs_settled {
        vstate.active = false;
        return 0;
    }

    render_mixed(inputs, outputs, frame_count);
    frame_count
}

pub fn render_mixed(inputs: &[WorkBuffer], outputs: &mut [WorkBuffer], frame_count: usize) {
    if outputs.len() < 2 {
        return;
    }
    let (left, right) = outputs.split_at_mut(1);
    multiply_channel(
        valid_input(inputs, PORT_IN_A_L),
        valid_input(inputs, PORT_IN_B_L),
        &mut left[0],
        frame_count,
    );
    multiply_channel(
        valid_input(inputs, PORT_IN_A_L + 1),
        valid_input(inputs, PORT_IN_B_L + 1),
        &mut right[0],
        frame_count,
    );
}
