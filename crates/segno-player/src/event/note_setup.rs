//! Note and hit setup: voice-group reservation and per-processor voice
//! state initialization.

use segno_core::module::{DeviceRef, ProcParams};
use segno_core::Random;
use segno_dsp::procs::pitch::{ArpeggioState, PitchVState};
use segno_dsp::procs::{
    debug::DebugVState, filter_proc::FilterVState, force::ForceVState, ks::KsVState,
    noise::NoiseVState, sample_proc::SampleVState, VoiceProcState, VoiceState,
};
use segno_dsp::{FilterControls, ForceControls, PitchControls};

use crate::player::Player;
use crate::voice::VoicePriority;

/// What kind of excitation starts the group.
#[derive(Debug, Clone, Copy, PartialEq)]
enum NoteKind {
    Note { cents: f64 },
    Hit { index: usize },
}

impl Player {
    /// `c.note_on`: allocate and initialize a voice group for the channel's
    /// bound instrument.
    pub(crate) fn start_note(&mut self, channel: usize, cents: f64, is_external: bool) {
        // Route the authored pitch through the active retuner.
        let cents = match self.master.cur_tuning_state {
            Some(index) => match self.module.tuning_table(index) {
                Some(table) => self.master.tuning_states[index].retuned_pitch(table, cents),
                None => cents,
            },
            None => cents,
        };
        self.start_group(channel, NoteKind::Note { cents }, is_external);
    }

    /// `c.hit`: like note-on, filtered by the unit's per-hit processor list.
    pub(crate) fn start_hit(&mut self, channel: usize, hit_index: usize, is_external: bool) {
        self.start_group(channel, NoteKind::Hit { index: hit_index }, is_external);
    }

    fn start_group(&mut self, channel: usize, kind: NoteKind, is_external: bool) {
        let au_index = self.channels[channel].au_index;
        let Some(au) = self.module.audio_unit(au_index) else {
            return;
        };
        if !au.is_instrument() {
            return;
        }
        let au = au.clone();

        if let NoteKind::Hit { index } = kind {
            if au.hit(index).is_none() {
                return;
            }
        }

        // A new note supersedes the channel's current foreground group.
        let old_gid = self.channels[channel].fg_group_id;
        if old_gid != 0 {
            self.pool.set_group_released(old_gid);
        }

        let group_id = self.pool.new_group_id();
        let seed_base = self.module.random_seed ^ group_id.wrapping_mul(0x9e37_79b9_7f4a_7c15);

        let note_expr = if self.channels[channel].carry_note_expression
            && !self.channels[channel].note_expression.is_empty()
        {
            self.channels[channel].note_expression.clone()
        } else {
            au.expressions.default_note_expr.clone()
        };
        let ch_expr = self.channels[channel].ch_expression.clone();

        let mut reserved = 0;
        for (proc_index, def) in au.processors() {
            if !def.voice_signals {
                continue;
            }
            if let NoteKind::Hit { index } = kind {
                if let Some(hit) = au.hit(index) {
                    if !hit.allows_proc(proc_index) {
                        continue;
                    }
                }
            }
            if !au.expressions.allows_proc(&note_expr, proc_index)
                || !au.expressions.allows_proc(&ch_expr, proc_index)
            {
                continue;
            }
            let Some(proc_node) = self.graph.find(DeviceRef::Proc {
                au_index,
                proc_index,
            }) else {
                continue;
            };

            let Some(alloc) = self.pool.allocate(channel, group_id, is_external) else {
                continue;
            };
            if let Some(stolen_au) = alloc.stolen_au {
                // The victim's processors would otherwise keep tails from a
                // note that no longer exists.
                self.states.clear_au_history(stolen_au);
                for ch in &mut self.channels {
                    if ch.fg_group_id != 0 && self.pool.group_slots(ch.fg_group_id).is_empty() {
                        ch.fg_group_id = 0;
                    }
                }
            }

            // Each voice of the group gets its own pair of streams.
            let voice_seed = seed_base.wrapping_add(proc_index as u64);
            let mut rand_p = Random::for_stream(voice_seed, "p");
            let rand_s = Random::for_stream(voice_seed, "s");

            let proc_state =
                self.make_voice_state(channel, &def.params, kind, &mut rand_p, au_index);

            let voice = self.pool.voice_mut(alloc.slot);
            voice.au_index = au_index;
            voice.proc_node = proc_node;
            voice.proc_index = proc_index;
            voice.rand_p = rand_p;
            voice.rand_s = rand_s;
            voice.state = VoiceState::new();
            voice.proc_state = proc_state;
            voice.priority = VoicePriority::New;
            reserved += 1;
        }

        if reserved > 0 {
            self.channels[channel].fg_group_id = group_id;
        } else {
            self.channels[channel].fg_group_id = 0;
        }
    }

    /// Build the initial per-processor voice state, carrying channel control
    /// chains where the carry flags ask for it.
    fn make_voice_state(
        &mut self,
        channel: usize,
        params: &ProcParams,
        kind: NoteKind,
        rand_p: &mut Random,
        au_index: usize,
    ) -> VoiceProcState {
        let audio_rate = self.audio_rate;
        let tempo = self.master.tempo;
        let ch = &mut self.channels[channel];

        match params {
            ProcParams::Debug(_) => VoiceProcState::Debug(DebugVState::new()),

            ProcParams::Pitch => {
                let cents = match kind {
                    NoteKind::Note { cents } => cents,
                    NoteKind::Hit { .. } => 0.0,
                };
                let mut controls = if ch.carry_pitch && ch.pitch_controls.pitch.is_finite() {
                    let mut c = ch.pitch_controls.clone();
                    c.pitch = cents;
                    c
                } else {
                    let mut c = PitchControls::new(audio_rate, tempo);
                    c.vibrato = ch.pitch_controls.vibrato.clone();
                    c.slider.set_length(ch.pitch_controls.slider.length());
                    c.reset_to(cents);
                    c
                };
                controls.orig_carried_pitch = cents;
                ch.pitch_controls.pitch = cents;
                ch.pitch_controls.orig_carried_pitch = cents;

                let arpeggio = if ch.arpeggio_on {
                    let tones = ch.arpeggio_offsets();
                    ArpeggioState {
                        on: !tones.is_empty(),
                        tones,
                        speed: ch.arpeggio_speed,
                        phase: 0.0,
                    }
                } else {
                    ArpeggioState::off()
                };
                VoiceProcState::Pitch(PitchVState::new(controls, arpeggio))
            }

            ProcParams::Force => {
                let au_params = &self.module.audio_units[au_index].params;
                let controls = if ch.carry_force {
                    ch.force_controls.clone()
                } else {
                    let mut c = ForceControls::new(audio_rate, tempo);
                    c.tremolo = ch.force_controls.tremolo.clone();
                    c.slider.set_length(ch.force_controls.slider.length());
                    c.force = ch.force_controls.force;
                    c
                };
                let variation = if au_params.force_variation != 0.0 {
                    -rand_p.next_f64() * au_params.force_variation.abs()
                } else {
                    0.0
                };
                VoiceProcState::Force(ForceVState::new(
                    controls,
                    au_params.global_force + variation,
                ))
            }

            ProcParams::Filter(filter_params) => {
                let controls = if ch.carry_filter {
                    ch.filter_controls.clone()
                } else {
                    let mut c = FilterControls::new(audio_rate, tempo);
                    c.autowah = ch.filter_controls.autowah.clone();
                    c.slider.set_length(ch.filter_controls.slider.length());
                    c.lowpass = ch.filter_controls.lowpass;
                    c.resonance = ch.filter_controls.resonance;
                    c
                };
                VoiceProcState::Filter(FilterVState::new(filter_params, controls, audio_rate))
            }

            ProcParams::Sample(sample_params) => match kind {
                NoteKind::Note { cents } => {
                    VoiceProcState::Sample(SampleVState::for_note(sample_params, cents))
                }
                NoteKind::Hit { index } => {
                    let force_db = ch.force_controls.force;
                    VoiceProcState::Sample(SampleVState::for_hit(
                        sample_params,
                        index,
                        force_db,
                        rand_p,
                    ))
                }
            },

            ProcParams::Noise(_) => VoiceProcState::Noise(NoiseVState::new(rand_p)),

            ProcParams::RingMod | ProcParams::Mult => VoiceProcState::Mult,

            ProcParams::GainComp(_) => VoiceProcState::GainComp,

            ProcParams::KarplusStrong(ks_params) => {
                VoiceProcState::KarplusStrong(KsVState::new(ks_params, audio_rate))
            }

            // Mixed-only kinds never get a voice.
            ProcParams::Chorus(_) | ProcParams::Freeverb(_) => VoiceProcState::Inert,
        }
    }
}
