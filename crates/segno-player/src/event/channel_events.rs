//! Channel event handlers: notes, slides, oscillators, arpeggio, carry
//! flags, expressions and the test-output override.

use segno_core::limits::ARPEGGIO_TONES_MAX;
use segno_core::{Tstamp, Value};
use segno_dsp::procs::VoiceProcState;

use crate::player::Player;

impl Player {
    pub(super) fn handle_channel_event(
        &mut self,
        channel: usize,
        name: &str,
        arg: &Value,
        is_external: bool,
    ) {
        match name {
            "c.note_on" => {
                let cents = arg.as_float().unwrap_or_default();
                if cents.is_finite() {
                    self.start_note(channel, cents, is_external);
                }
            }
            "c.note_off" => {
                let gid = self.channels[channel].fg_group_id;
                if gid != 0 {
                    self.pool.set_group_released(gid);
                    self.channels[channel].fg_group_id = 0;
                }
            }
            "c.hit" => {
                let index = arg.as_int().unwrap_or(-1);
                if index >= 0 {
                    self.start_hit(channel, index as usize, is_external);
                }
            }
            "c.set_au" => {
                let index = arg.as_int().unwrap_or(-1);
                if (0..self.module.audio_units.len() as i64).contains(&index) {
                    self.channels[channel].au_index = index as usize;
                }
            }

            "c.set_force" => {
                let db = arg.as_float().unwrap_or_default();
                let ch = &mut self.channels[channel];
                ch.force_controls.force = db;
                ch.force_controls.slider.break_slide();
                self.update_fg_force(channel, |fc| {
                    fc.force = db;
                    fc.slider.break_slide();
                });
            }
            "c.slide_force" => {
                let target = arg.as_float().unwrap_or_default();
                let ch = &mut self.channels[channel];
                if ch.force_controls.slider.in_progress() {
                    ch.force_controls.slider.change_target(target);
                } else {
                    let from = ch.force_controls.force;
                    ch.force_controls.slider.start(target, from);
                }
                let snapshot = ch.force_controls.slider.clone();
                self.update_fg_force(channel, move |fc| {
                    if fc.slider.in_progress() {
                        fc.slider.change_target(target);
                    } else {
                        fc.slider = snapshot.clone();
                    }
                });
            }
            "c.slide_force_length" => {
                let length = arg.as_tstamp().unwrap_or(Tstamp::ZERO);
                self.channels[channel].force_controls.slider.set_length(length);
                self.update_fg_force(channel, move |fc| fc.slider.set_length(length));
            }

            "c.slide_pitch" => {
                let target = arg.as_float().unwrap_or_default();
                let ch = &mut self.channels[channel];
                if ch.pitch_controls.slider.in_progress() {
                    ch.pitch_controls.slider.change_target(target);
                } else {
                    let from = ch.pitch_controls.pitch;
                    if from.is_finite() {
                        ch.pitch_controls.slider.start(target, from);
                    }
                }
                self.update_fg_pitch(channel, move |pc| {
                    if pc.slider.in_progress() {
                        pc.slider.change_target(target);
                    } else if pc.pitch.is_finite() {
                        let from = pc.pitch;
                        pc.slider.start(target, from);
                    }
                });
            }
            "c.slide_pitch_length" => {
                let length = arg.as_tstamp().unwrap_or(Tstamp::ZERO);
                self.channels[channel].pitch_controls.slider.set_length(length);
                self.update_fg_pitch(channel, move |pc| pc.slider.set_length(length));
            }

            "c.set_lowpass" => {
                let value = arg.as_float().unwrap_or_default();
                let ch = &mut self.channels[channel];
                ch.filter_controls.lowpass = value;
                ch.filter_controls.slider.break_slide();
                self.update_fg_filter(channel, move |fc| {
                    fc.lowpass = value;
                    fc.slider.break_slide();
                });
            }
            "c.slide_lowpass" => {
                let target = arg.as_float().unwrap_or_default();
                let ch = &mut self.channels[channel];
                if ch.filter_controls.slider.in_progress() {
                    ch.filter_controls.slider.change_target(target);
                } else {
                    let from = ch.filter_controls.lowpass;
                    ch.filter_controls.slider.start(target, from);
                }
                self.update_fg_filter(channel, move |fc| {
                    if fc.slider.in_progress() {
                        fc.slider.change_target(target);
                    } else {
                        let from = fc.lowpass;
                        fc.slider.start(target, from);
                    }
                });
            }
            "c.slide_lowpass_length" => {
                let length = arg.as_tstamp().unwrap_or(Tstamp::ZERO);
                self.channels[channel].filter_controls.slider.set_length(length);
                self.update_fg_filter(channel, move |fc| fc.slider.set_length(length));
            }
            "c.set_resonance" => {
                let value = arg.as_float().unwrap_or_default().clamp(0.0, 1.0);
                self.channels[channel].filter_controls.resonance = value;
                self.update_fg_filter(channel, move |fc| fc.resonance = value);
            }

            "c.vibrato_speed" => {
                let speed = arg.as_float().unwrap_or_default().max(0.0);
                let ch = &mut self.channels[channel];
                ch.pitch_controls.vibrato.set_speed(speed);
                ch.pitch_controls.vibrato.turn_on();
                self.update_fg_pitch(channel, move |pc| {
                    pc.vibrato.set_speed(speed);
                    pc.vibrato.turn_on();
                });
            }
            "c.vibrato_depth" => {
                let depth = arg.as_float().unwrap_or_default();
                let ch = &mut self.channels[channel];
                ch.pitch_controls.vibrato.set_depth(depth);
                if depth != 0.0 {
                    ch.pitch_controls.vibrato.turn_on();
                } else {
                    ch.pitch_controls.vibrato.turn_off();
                }
                self.update_fg_pitch(channel, move |pc| {
                    pc.vibrato.set_depth(depth);
                    if depth != 0.0 {
                        pc.vibrato.turn_on();
                    } else {
                        pc.vibrato.turn_off();
                    }
                });
            }
            "c.vibrato_speed_slide_length" => {
                let length = arg.as_tstamp().unwrap_or(Tstamp::ZERO);
                self.channels[channel]
                    .pitch_controls
                    .vibrato
                    .set_speed_slide_length(length);
                self.update_fg_pitch(channel, move |pc| pc.vibrato.set_speed_slide_length(length));
            }
            "c.vibrato_depth_slide_length" => {
                let length = arg.as_tstamp().unwrap_or(Tstamp::ZERO);
                self.channels[channel]
                    .pitch_controls
                    .vibrato
                    .set_depth_slide_length(length);
                self.update_fg_pitch(channel, move |pc| pc.vibrato.set_depth_slide_length(length));
            }

            "c.tremolo_speed" => {
                let speed = arg.as_float().unwrap_or_default().max(0.0);
                self.channels[channel].force_controls.tremolo.set_speed(speed);
                self.channels[channel].force_controls.tremolo.turn_on();
                self.update_fg_force(channel, move |fc| {
                    fc.tremolo.set_speed(speed);
                    fc.tremolo.turn_on();
                });
            }
            "c.tremolo_depth" => {
                let depth = arg.as_float().unwrap_or_default();
                let tremolo = &mut self.channels[channel].force_controls.tremolo;
                tremolo.set_depth(depth);
                if depth != 0.0 {
                    tremolo.turn_on();
                } else {
                    tremolo.turn_off();
                }
                self.update_fg_force(channel, move |fc| {
                    fc.tremolo.set_depth(depth);
                    if depth != 0.0 {
                        fc.tremolo.turn_on();
                    } else {
                        fc.tremolo.turn_off();
                    }
                });
            }
            "c.tremolo_speed_slide_length" => {
                let length = arg.as_tstamp().unwrap_or(Tstamp::ZERO);
                self.channels[channel]
                    .force_controls
                    .tremolo
                    .set_speed_slide_length(length);
                self.update_fg_force(channel, move |fc| fc.tremolo.set_speed_slide_length(length));
            }
            "c.tremolo_depth_slide_length" => {
                let length = arg.as_tstamp().unwrap_or(Tstamp::ZERO);
                self.channels[channel]
                    .force_controls
                    .tremolo
                    .set_depth_slide_length(length);
                self.update_fg_force(channel, move |fc| fc.tremolo.set_depth_slide_length(length));
            }

            "c.autowah_speed" => {
                let speed = arg.as_float().unwrap_or_default().max(0.0);
                self.channels[channel].filter_controls.autowah.set_speed(speed);
                self.channels[channel].filter_controls.autowah.turn_on();
                self.update_fg_filter(channel, move |fc| {
                    fc.autowah.set_speed(speed);
                    fc.autowah.turn_on();
                });
            }
            "c.autowah_depth" => {
                let depth = arg.as_float().unwrap_or_default();
                let autowah = &mut self.channels[channel].filter_controls.autowah;
                autowah.set_depth(depth);
                if depth != 0.0 {
                    autowah.turn_on();
                } else {
                    autowah.turn_off();
                }
                self.update_fg_filter(channel, move |fc| {
                    fc.autowah.set_depth(depth);
                    if depth != 0.0 {
                        fc.autowah.turn_on();
                    } else {
                        fc.autowah.turn_off();
                    }
                });
            }
            "c.autowah_speed_slide_length" => {
                let length = arg.as_tstamp().unwrap_or(Tstamp::ZERO);
                self.channels[channel]
                    .filter_controls
                    .autowah
                    .set_speed_slide_length(length);
                self.update_fg_filter(channel, move |fc| fc.autowah.set_speed_slide_length(length));
            }
            "c.autowah_depth_slide_length" => {
                let length = arg.as_tstamp().unwrap_or(Tstamp::ZERO);
                self.channels[channel]
                    .filter_controls
                    .autowah
                    .set_depth_slide_length(length);
                self.update_fg_filter(channel, move |fc| fc.autowah.set_depth_slide_length(length));
            }

            "c.arpeggio_on" => self.set_arpeggio_on(channel, true),
            "c.arpeggio_off" => self.set_arpeggio_on(channel, false),
            "c.set_arpeggio_ref" => {
                let cents = arg.as_float().unwrap_or_default();
                self.channels[channel].arpeggio_ref = cents;
            }
            "c.set_arpeggio_speed" => {
                let speed = arg.as_float().unwrap_or_default().max(0.0);
                self.channels[channel].arpeggio_speed = speed;
                // A speed change never resets the phase of a running
                // arpeggio.
                self.update_fg_arpeggio(channel, move |arp| arp.speed = speed);
            }
            "c.set_arpeggio_note" => {
                let cents = arg.as_float().unwrap_or_default();
                let ch = &mut self.channels[channel];
                if ch.arpeggio_edit_pos < ARPEGGIO_TONES_MAX {
                    ch.arpeggio_tones[ch.arpeggio_edit_pos] = cents;
                    ch.arpeggio_edit_pos += 1;
                }
            }
            "c.reset_arpeggio" => {
                let ch = &mut self.channels[channel];
                ch.arpeggio_tones = [f64::NAN; ARPEGGIO_TONES_MAX];
                ch.arpeggio_edit_pos = 0;
                ch.arpeggio_on = false;
                self.set_arpeggio_on(channel, false);
            }

            "c.set_force_carry" => {
                self.channels[channel].carry_force = arg.as_bool().unwrap_or(false);
            }
            "c.set_pitch_carry" => {
                self.channels[channel].carry_pitch = arg.as_bool().unwrap_or(false);
            }
            "c.set_filter_carry" => {
                self.channels[channel].carry_filter = arg.as_bool().unwrap_or(false);
            }

            "c.set_ch_expression" => {
                self.channels[channel].ch_expression =
                    arg.as_str().unwrap_or_default().to_string();
            }
            "c.set_note_expression" => {
                self.channels[channel].note_expression =
                    arg.as_str().unwrap_or_default().to_string();
            }
            "c.carry_note_expression" => {
                self.channels[channel].carry_note_expression = arg.as_bool().unwrap_or(false);
            }

            "c.use_test_output" => {
                self.channels[channel].use_test_output = arg.as_bool().unwrap_or(false);
            }
            "c.set_test_processor" => {
                let index = arg.as_int().unwrap_or(0).max(0);
                self.channels[channel].test_proc_index = index as usize;
            }

            _ => {}
        }
    }

    /// Apply a change to the foreground group's pitch states.
    fn update_fg_pitch(
        &mut self,
        channel: usize,
        apply: impl Fn(&mut segno_dsp::PitchControls)
    ) {
        let gid = self.channels[channel].fg_group_id;
        for slot in self.pool.group_slots(gid) {
            if let VoiceProcState::Pitch(state) = &mut self.pool.voice_mut(slot).proc_state {
                apply(&mut state.controls);
            }
        }
    }

    /// Apply a change to the foreground group's force states.
    fn update_fg_force(
        &mut self,
        channel: usize,
        apply: impl Fn(&mut segno_dsp::ForceControls)
    ) {
        let gid = self.channels[channel].fg_group_id;
        for slot in self.pool.group_slots(gid) {
            if let VoiceProcState::Force(state) = &mut self.pool.voice_mut(slot).proc_state {
                apply(&mut state.controls);
            }
        }
    }

    /// Apply a change to the foreground group's filter states.
    fn update_fg_filter(
        &mut self,
        channel: usize,
        apply: impl Fn(&mut segno_dsp::FilterControls)
    ) {
        let gid = self.channels[channel].fg_group_id;
        for slot in self.pool.group_slots(gid) {
            if let VoiceProcState::Filter(state) = &mut self.pool.voice_mut(slot).proc_state {
                apply(&mut state.controls);
            }
        }
    }

    /// Apply a change to the foreground group's arpeggio states.
    fn update_fg_arpeggio(
        &mut self,
        channel: usize,
        apply: impl Fn(&mut segno_dsp::procs::pitch::ArpeggioState)
    ) {
        let gid = self.channels[channel].fg_group_id;
        for slot in self.pool.group_slots(gid) {
            if let VoiceProcState::Pitch(state) = &mut self.pool.voice_mut(slot).proc_state {
                apply(&mut state.arpeggio);
            }
        }
    }

    fn set_arpeggio_on(&mut self, channel: usize, on: bool) {
        self.channels[channel].arpeggio_on = on;
        let tones = self.channels[channel].arpeggio_offsets();
        let speed = self.channels[channel].arpeggio_speed;
        self.update_fg_arpeggio(channel, move |arp| {
            arp.on = on && !tones.is_empty();
            if arp.tones != tones {
                arp.tones = tones.clone();
            }
            arp.speed = speed;
        });
    }
}
