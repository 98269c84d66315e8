//! The signal pipeline.
//!
//! One render chunk: clear the cycle's buffers, run every active voice group
//! through its unit's voice-signal processors, accumulate the contributions
//! on the unit output interfaces, execute the mixed graph in topological
//! order, then DC-block, scale and write the master output.

use segno_core::module::{DeviceRef, ProcKind};
use segno_dsp::conversions::db_to_scale;
use segno_dsp::procs::{self, ProcCtx};

use crate::player::Player;
use crate::voice::VoicePriority;

/// Processor kinds that produce audio; a group with none of these still
/// active has nothing left to say and is deactivated.
fn produces_audio(kind: ProcKind) -> bool {
    !matches!(kind, ProcKind::Pitch | ProcKind::Force)
}

impl Player {
    /// Render `frames` frames of every pipeline into the output buffers at
    /// the current write offset.
    pub(crate) fn render_chunk(&mut self, frames: usize) {
        debug_assert!(frames > 0 && frames <= self.chunk_max);

        self.pool.settle_new_voices();
        self.step_cv_slides(frames);

        // Start of cycle: every mixed buffer is unwritten, the voice
        // accumulators are silent.
        for state in self.states.iter_mut() {
            for wb in state.mixed_in.iter_mut().chain(state.mixed_out.iter_mut()) {
                wb.invalidate();
            }
            for wb in state.voice_acc.iter_mut() {
                wb.clear(frames);
            }
        }

        // Voice pipeline: foreground groups in channel order, then the rest.
        let mut rendered_groups = Vec::new();
        for ch in 0..self.channels.len() {
            let gid = self.channels[ch].fg_group_id;
            if gid != 0 {
                self.render_voice_group(gid, frames);
                rendered_groups.push(gid);
            }
        }
        for gid in self.pool.active_group_ids() {
            if !rendered_groups.contains(&gid) {
                self.render_voice_group(gid, frames);
            }
        }

        // Mixed pipeline.
        let order = self.graph.mixed_order().to_vec();
        for node in order {
            self.mix_incoming_edges(node, frames);
            self.execute_mixed_node(node, frames);
        }

        self.write_master_output(frames);
    }

    /// Sum every sender's mixed output into this node's receive buffers.
    fn mix_incoming_edges(&mut self, node: usize, frames: usize) {
        let edge_count = self.graph.node(node).incoming.len();
        for e in 0..edge_count {
            let edge = self.graph.node(node).incoming[e];
            let (sender, recv) = self.states.get_two_mut(edge.send_node, node);
            if let (Some(send_wb), Some(recv_wb)) = (
                sender.mixed_out.get(edge.send_port),
                recv.mixed_in.get_mut(edge.recv_port),
            ) {
                recv_wb.mix(send_wb, frames);
            }
        }
    }

    fn execute_mixed_node(&mut self, node: usize, frames: usize) {
        let device = self.graph.node(node).device;
        match device {
            DeviceRef::Master => {}
            DeviceRef::AuInput(_) => {
                let state = self.states.get_mut(node);
                for (in_wb, out_wb) in state.mixed_in.iter().zip(state.mixed_out.iter_mut()) {
                    out_wb.mix(in_wb, frames);
                }
            }
            DeviceRef::AuOutput(au_index) => {
                let bypass = self
                    .au_states
                    .get(au_index)
                    .map(|s| s.bypass)
                    .unwrap_or(false);
                if bypass {
                    // Pass the unit input through untouched.
                    if let Some(in_node) = self.graph.find(DeviceRef::AuInput(au_index)) {
                        let (input, output) = self.states.get_two_mut(in_node, node);
                        for (in_wb, out_wb) in
                            input.mixed_in.iter().zip(output.mixed_out.iter_mut())
                        {
                            out_wb.mix(in_wb, frames);
                        }
                    }
                    return;
                }
                // Mixed inner signal plus the accumulated voice output.
                let state = self.states.get_mut(node);
                for port in 0..state.mixed_out.len() {
                    if let Some(in_wb) = state.mixed_in.get(port) {
                        state.mixed_out[port].mix(in_wb, frames);
                    }
                }
                for port in 0..state.mixed_out.len() {
                    if let Some(acc_wb) = state.voice_acc.get(port) {
                        state.mixed_out[port].mix(acc_wb, frames);
                    }
                }
            }
            DeviceRef::Proc {
                au_index,
                proc_index,
            } => {
                let Some(def) = self
                    .runtime_procs
                    .get(au_index)
                    .and_then(|procs| procs.get(proc_index))
                    .and_then(|def| def.as_ref())
                    .cloned()
                else {
                    return;
                };
                let ctx = ProcCtx {
                    audio_rate: self.audio_rate,
                    tempo: self.master.tempo,
                };
                let state = self.states.get_mut(node);
                let (mixed_in, mixed_out, mixed_state) = (
                    &state.mixed_in,
                    &mut state.mixed_out,
                    &mut state.mixed_state,
                );
                procs::render_mixed(&def, mixed_state, mixed_in, mixed_out, frames, &ctx);
            }
        }
    }

    /// Render one voice group through its unit's voice-signal processors.
    fn render_voice_group(&mut self, group_id: u64, frames: usize) {
        let slots = self.pool.group_slots(group_id);
        let Some(&first_slot) = slots.first() else {
            return;
        };
        let au_index = self.pool.voice(first_slot).au_index;
        let channel = self.pool.voice(first_slot).channel;

        let order = self.graph.voice_order(au_index).to_vec();
        let edges = self.graph.voice_edges(au_index).to_vec();

        // Fresh silent buffers for this group.
        for &node in &order {
            let state = self.states.get_mut(node);
            for wb in state.voice_in.iter_mut().chain(state.voice_out.iter_mut()) {
                wb.clear(frames);
            }
        }

        let au_params = self.module.audio_units[au_index].params.clone();
        let au_sustain = self
            .au_states
            .get(au_index)
            .map(|s| s.sustain)
            .unwrap_or(0.0);
        let ctx = ProcCtx {
            audio_rate: self.audio_rate,
            tempo: self.master.tempo,
        };

        for &node in &order {
            // Mix this processor's voice inputs from its senders.
            for edge in edges.iter().filter(|e| e.recv_node == node) {
                let (sender, recv) = self.states.get_two_mut(edge.send_node, node);
                if let (Some(send_wb), Some(recv_wb)) = (
                    sender.voice_out.get(edge.send_port),
                    recv.voice_in.get_mut(edge.recv_port),
                ) {
                    recv_wb.mix(send_wb, frames);
                }
            }

            let Some(&slot) = slots
                .iter()
                .find(|&&s| self.pool.voice(s).proc_node == node)
            else {
                continue;
            };

            let voice = self.pool.voice_mut(slot);
            let proc_index = voice.proc_index;
            let Some(def) = self
                .runtime_procs
                .get(au_index)
                .and_then(|procs| procs.get(proc_index))
                .and_then(|def| def.as_ref())
                .cloned()
            else {
                continue;
            };

            let state = self.states.get_mut(node);
            let (voice_in, voice_out) = (&state.voice_in, &mut state.voice_out);
            let voice = self.pool.voice_mut(slot);
            let stop = procs::render_voice(
                &def,
                &au_params,
                au_sustain,
                &mut voice.state,
                &mut voice.proc_state,
                voice_in,
                voice_out,
                frames,
                &ctx,
            );
            voice.state.keep_alive_stop = stop;
        }

        // Accumulate the group's contribution on the unit output interface.
        // The test tap replaces the normal routing entirely.
        let use_test_output = self.channels[channel].use_test_output;
        if !use_test_output {
            if let Some(out_node) = self.graph.find(DeviceRef::AuOutput(au_index)) {
                for edge in edges.iter().filter(|e| e.recv_node == out_node) {
                    let (sender, recv) = self.states.get_two_mut(edge.send_node, out_node);
                    if let (Some(send_wb), Some(acc_wb)) = (
                        sender.voice_out.get(edge.send_port),
                        recv.voice_acc.get_mut(edge.recv_port),
                    ) {
                        acc_wb.mix(send_wb, frames);
                    }
                }
            }
        }

        // Test-output override: route the chosen processor's voice output
        // straight to the master sink.
        if use_test_output {
            let test_proc = self.channels[channel].test_proc_index;
            if let (Some(proc_node), Some(master_node)) = (
                self.graph.find(DeviceRef::Proc {
                    au_index,
                    proc_index: test_proc,
                }),
                self.graph.find(DeviceRef::Master),
            ) {
                let (sender, master) = self.states.get_two_mut(proc_node, master_node);
                for port in 0..2 {
                    if let (Some(send_wb), Some(master_wb)) = (
                        sender.voice_out.get(port),
                        master.mixed_in.get_mut(port),
                    ) {
                        master_wb.mix(send_wb, frames);
                    }
                }
            }
        }

        self.finish_group(group_id, &slots, au_index, channel);
    }

    /// Deactivate finished voices and drop the group when nothing audible is
    /// left in it.
    fn finish_group(&mut self, group_id: u64, slots: &[usize], au_index: usize, channel: usize) {
        let mut audio_left = false;
        for &slot in slots {
            let voice = self.pool.voice_mut(slot);
            if !voice.state.active {
                voice.priority = VoicePriority::Inactive;
                continue;
            }
            let kind = self
                .runtime_procs
                .get(au_index)
                .and_then(|procs| procs.get(voice.proc_index))
                .and_then(|def| def.as_ref())
                .map(|def| def.kind());
            if kind.map(produces_audio).unwrap_or(false) {
                audio_left = true;
            }
        }

        if !audio_left {
            self.pool.reset_group(group_id);
            if self.channels[channel].fg_group_id == group_id {
                self.channels[channel].fg_group_id = 0;
            }
        }
    }

    /// DC-block, scale and copy the master ports into the output buffers.
    fn write_master_output(&mut self, frames: usize) {
        let offset = self.frames_avail;
        let mix_scale = db_to_scale(self.module.mix_volume_db);

        let Some(master_node) = self.graph.find(DeviceRef::Master) else {
            return;
        };

        // The volume slider steps once per frame, shared by both channels.
        let mut volume_scales = Vec::with_capacity(frames);
        for _ in 0..frames {
            if self.master.volume_slider.in_progress() {
                self.master.volume_db = self.master.volume_slider.step();
            }
            volume_scales.push((db_to_scale(self.master.volume_db) * mix_scale) as f32);
        }

        let master = self.states.get_mut(master_node);
        for (ch, out) in [&mut self.out_left, &mut self.out_right]
            .into_iter()
            .enumerate()
        {
            let blocker = &mut self.master.dc_blockers[ch];
            let port = master.mixed_in.get(ch);
            for i in 0..frames {
                let raw = port
                    .filter(|wb| wb.is_valid())
                    .map(|wb| wb.contents()[i])
                    .unwrap_or(0.0);
                let blocked = blocker.process(raw);
                out[offset + i] = blocked * volume_scales[i];
            }
        }
    }
}
