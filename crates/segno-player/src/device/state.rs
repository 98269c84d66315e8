//! Per-device runtime state.
//!
//! One [`DeviceState`] per graph node: port buffers for the mixed pipeline,
//! separate port buffers for the per-voice pipeline, the voice-contribution
//! accumulators on unit output interfaces, and the device's mixed DSP state.
//! The executor addresses states by node index and carries the device
//! definition into every call; states hold no references into the graph.

use segno_core::module::{DeviceRef, Module};
use segno_dsp::procs::MixedProcState;
use segno_dsp::WorkBuffer;

use super::graph::DeviceGraph;

/// Input ports allocated per processor node.
const PROC_IN_PORTS: usize = 4;
/// Output ports allocated per processor node.
const PROC_OUT_PORTS: usize = 2;
/// Ports allocated on interface and master nodes.
const INTERFACE_PORTS: usize = 2;

/// Runtime state of one device.
#[derive(Debug, Clone)]
pub struct DeviceState {
    pub device: DeviceRef,
    /// Mixed-pipeline receive buffers.
    pub mixed_in: Vec<WorkBuffer>,
    /// Mixed-pipeline send buffers.
    pub mixed_out: Vec<WorkBuffer>,
    /// Voice-pipeline receive buffers (reused across groups).
    pub voice_in: Vec<WorkBuffer>,
    /// Voice-pipeline send buffers (reused across groups).
    pub voice_out: Vec<WorkBuffer>,
    /// On unit output interfaces: per-chunk accumulation of every group's
    /// contribution.
    pub voice_acc: Vec<WorkBuffer>,
    pub mixed_state: MixedProcState,
}

impl DeviceState {
    fn new(device: DeviceRef, module: &Module, audio_rate: u32, chunk_max: usize) -> Self {
        let make = |count: usize| -> Vec<WorkBuffer> {
            (0..count).map(|_| WorkBuffer::new(chunk_max)).collect()
        };

        match device {
            DeviceRef::Master | DeviceRef::AuInput(_) => DeviceState {
                device,
                mixed_in: make(INTERFACE_PORTS),
                mixed_out: make(INTERFACE_PORTS),
                voice_in: Vec::new(),
                voice_out: Vec::new(),
                voice_acc: Vec::new(),
                mixed_state: MixedProcState::Stateless,
            },
            DeviceRef::AuOutput(_) => DeviceState {
                device,
                mixed_in: make(INTERFACE_PORTS),
                mixed_out: make(INTERFACE_PORTS),
                voice_in: Vec::new(),
                voice_out: Vec::new(),
                voice_acc: make(INTERFACE_PORTS),
                mixed_state: MixedProcState::Stateless,
            },
            DeviceRef::Proc {
                au_index,
                proc_index,
            } => {
                let def = module
                    .audio_unit(au_index)
                    .and_then(|au| au.processor(proc_index));
                let mixed_state = def
                    .map(|def| MixedProcState::for_proc(def, audio_rate))
                    .unwrap_or(MixedProcState::Stateless);
                let voiced = def.map(|def| def.voice_signals).unwrap_or(false);
                DeviceState {
                    device,
                    mixed_in: make(PROC_IN_PORTS),
                    mixed_out: make(PROC_OUT_PORTS),
                    voice_in: if voiced { make(PROC_IN_PORTS) } else { Vec::new() },
                    voice_out: if voiced { make(PROC_OUT_PORTS) } else { Vec::new() },
                    voice_acc: Vec::new(),
                    mixed_state,
                }
            }
        }
    }

    /// Reset DSP tails; buffers are invalidated per cycle anyway.
    pub fn clear_history(&mut self) {
        self.mixed_state.clear_history();
    }
}

/// All device states, indexed parallel to the graph's node table.
#[derive(Debug, Clone)]
pub struct DeviceStates {
    states: Vec<DeviceState>,
    chunk_max: usize,
}

impl DeviceStates {
    pub fn new(
        module: &Module,
        graph: &DeviceGraph,
        audio_rate: u32,
        chunk_max: usize,
    ) -> Self {
        let states = (0..graph.node_count())
            .map(|i| DeviceState::new(graph.node(i).device, module, audio_rate, chunk_max))
            .collect();
        DeviceStates { states, chunk_max }
    }

    pub fn chunk_max(&self) -> usize {
        self.chunk_max
    }

    pub fn get(&self, node: usize) -> &DeviceState {
        &self.states[node]
    }

    pub fn get_mut(&mut self, node: usize) -> &mut DeviceState {
        &mut self.states[node]
    }

    /// Borrow two distinct states mutably.
    pub fn get_two_mut(&mut self, a: usize, b: usize) -> (&mut DeviceState, &mut DeviceState) {
        debug_assert!(a != b);
        if a < b {
            let (left, right) = self.states.split_at_mut(b);
            (&mut left[a], &mut right[0])
        } else {
            let (left, right) = self.states.split_at_mut(a);
            (&mut right[0], &mut left[b])
        }
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut DeviceState> {
        self.states.iter_mut()
    }

    /// Rebuild every buffer for a new chunk size.
    pub fn set_buffer_size(&mut self, chunk_max: usize) {
        self.chunk_max = chunk_max;
        for state in &mut self.states {
            for wb in state
                .mixed_in
                .iter_mut()
                .chain(state.mixed_out.iter_mut())
                .chain(state.voice_in.iter_mut())
                .chain(state.voice_out.iter_mut())
                .chain(state.voice_acc.iter_mut())
            {
                wb.resize(chunk_max);
            }
        }
    }

    /// Rebuild rate-dependent DSP state (delay lines, filter tunings).
    pub fn set_audio_rate(&mut self, module: &Module, audio_rate: u32) {
        for state in &mut self.states {
            if let DeviceRef::Proc {
                au_index,
                proc_index,
            } = state.device
            {
                if let Some(def) = module
                    .audio_unit(au_index)
                    .and_then(|au| au.processor(proc_index))
                {
                    state.mixed_state = MixedProcState::for_proc(def, audio_rate);
                }
            }
        }
    }

    /// Reset every DSP tail, e.g. when playback restarts.
    pub fn clear_all_history(&mut self) {
        for state in &mut self.states {
            state.clear_history();
        }
    }

    /// Clear the history of every processor belonging to one audio unit.
    pub fn clear_au_history(&mut self, au_index: usize) {
        for state in &mut self.states {
            if matches!(state.device, DeviceRef::Proc { au_index: a, .. } if a == au_index) {
                state.clear_history();
            }
        }
    }
}
