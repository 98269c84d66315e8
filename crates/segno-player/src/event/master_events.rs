//! Master event handlers: tempo, volume, jumps, goto, retuning.

use segno_core::limits::{GOTO_SAFETY_MAX, JUMP_CONTEXTS_MAX, TUNING_TABLES_MAX};
use segno_core::{Tstamp, Value};

use crate::master::{JumpContext, PlaybackState};
use crate::player::Player;

use super::TriggerOrigin;

impl Player {
    pub(super) fn handle_master_event(
        &mut self,
        name: &str,
        arg: &Value,
        origin: Option<&TriggerOrigin>,
    ) {
        match name {
            "m.set_tempo" => {
                let tempo = arg.as_float().unwrap_or_default();
                if tempo.is_finite() && tempo > 0.0 {
                    self.master.tempo = tempo;
                    self.master.tempo_slide = None;
                    self.propagate_tempo();
                }
            }
            "m.slide_tempo" => {
                let target = arg.as_float().unwrap_or_default();
                if target.is_finite() && target > 0.0 {
                    self.master.start_tempo_slide(target);
                }
            }
            "m.slide_tempo_length" => {
                self.master.tempo_slide_length = arg.as_tstamp().unwrap_or(Tstamp::ZERO);
            }
            "m.set_volume" => {
                let db = arg.as_float().unwrap_or_default();
                self.master.volume_db = db.min(0.0);
                self.master.volume_slider.break_slide();
            }
            "m.slide_volume" => {
                let target = arg.as_float().unwrap_or_default().min(0.0);
                if self.master.volume_slider.in_progress() {
                    self.master.volume_slider.change_target(target);
                } else {
                    self.master
                        .volume_slider
                        .start(target, self.master.volume_db);
                }
            }
            "m.slide_volume_length" => {
                let length = arg.as_tstamp().unwrap_or(Tstamp::ZERO);
                self.master.volume_slider.set_length(length);
            }
            "m.pattern_delay" => {
                self.master.delay_left = arg.as_tstamp().unwrap_or(Tstamp::ZERO);
            }
            "m.set_jump_counter" => {
                self.master.jump_counter = arg.as_int().unwrap_or(0).max(0);
            }
            "m.set_jump_pat_inst" => {
                self.master.jump_target_piref = arg.as_pat_inst();
            }
            "m.set_jump_row" => {
                self.master.jump_target_row = arg.as_tstamp().unwrap_or(Tstamp::ZERO);
            }
            "m.jump" => self.handle_jump(origin),
            "m.set_goto_pat_inst" => {
                self.master.goto_target_piref = arg.as_pat_inst();
            }
            "m.set_goto_row" => {
                self.master.goto_target_row = arg.as_tstamp().unwrap_or(Tstamp::ZERO);
            }
            "m.goto" => self.handle_goto(),
            "m.set_retuner" => {
                let index = arg.as_int().unwrap_or(-1);
                if (0..TUNING_TABLES_MAX as i64).contains(&index) {
                    let index = index as usize;
                    self.master.cur_tuning_state = Some(index);
                    let table = self.module.tuning_table(index).cloned();
                    self.master.tuning_states[index].reset(table.as_ref());
                } else {
                    self.master.cur_tuning_state = None;
                }
            }
            "m.retune" => {
                let new_ref = arg.as_float().unwrap_or_default();
                if let Some(index) = self.master.cur_tuning_state {
                    if let Some(table) = self.module.tuning_table(index).cloned() {
                        self.master.tuning_states[index].retune(&table, new_ref);
                    }
                }
            }
            "m.set_retuner_fixed_pitch" => {
                let pitch = arg.as_float().unwrap_or_default();
                if let Some(index) = self.master.cur_tuning_state {
                    if let Some(table) = self.module.tuning_table(index).cloned() {
                        self.master.tuning_states[index].set_fixed_pitch(&table, pitch);
                    }
                }
            }
            "m.set_retuner_offset" => {
                let offset = arg.as_float().unwrap_or_default();
                if offset.is_finite() {
                    if let Some(index) = self.master.cur_tuning_state {
                        self.master.tuning_states[index].set_global_offset(offset);
                    }
                }
            }
            "m.reset_retuner" => {
                if let Some(index) = self.master.cur_tuning_state {
                    let table = self.module.tuning_table(index).cloned();
                    self.master.tuning_states[index].reset(table.as_ref());
                }
            }
            _ => {}
        }
    }

    /// Bounded-repeat jump. The first firing at a given trigger site pushes
    /// a context with the configured counter; later firings count it down
    /// and the jump stops when the context runs out.
    fn handle_jump(&mut self, origin: Option<&TriggerOrigin>) {
        let Some(origin) = origin else {
            // An external jump has no authored site to bind a counter to.
            return;
        };

        let existing = self.master.active_jumps.iter().position(|ctx| {
            ctx.origin_piref == origin.piref
                && ctx.origin_row == origin.row
                && ctx.origin_channel == origin.channel
                && ctx.origin_trigger == origin.trigger_index
        });

        let do_jump = match existing {
            Some(index) => {
                let ctx = &mut self.master.active_jumps[index];
                ctx.counter -= 1;
                if ctx.counter <= 0 {
                    self.master.active_jumps.remove(index);
                    false
                } else {
                    true
                }
            }
            None => {
                if self.master.jump_counter <= 0 {
                    false
                } else if self.master.active_jumps.len() >= JUMP_CONTEXTS_MAX {
                    log::warn!("jump context stack full; ignoring jump");
                    false
                } else {
                    self.master.active_jumps.push(JumpContext {
                        origin_piref: origin.piref,
                        origin_row: origin.row,
                        origin_channel: origin.channel,
                        origin_trigger: origin.trigger_index,
                        counter: self.master.jump_counter,
                    });
                    true
                }
            }
        };

        if do_jump {
            let target = self.master.jump_target_piref.or(self.master.pos.piref);
            let row = self.master.jump_target_row;
            self.seek_to(target, row);
        }
    }

    /// Unconditional goto with a re-entry bound against zero-length loops.
    fn handle_goto(&mut self) {
        self.master.goto_safety_counter += 1;
        if self.master.goto_safety_counter > GOTO_SAFETY_MAX {
            log::warn!("goto re-entry bound exceeded; stopping playback");
            self.master.playback_state = PlaybackState::Stopped;
            return;
        }
        let target = self.master.goto_target_piref.or(self.master.pos.piref);
        let row = self.master.goto_target_row;
        self.seek_to(target, row);
    }
}
