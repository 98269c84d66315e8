//! The event dispatcher.
//!
//! A trigger is `(name, argument)` fired into a channel. The name selects a
//! handler through a static table that also pins the expected argument type;
//! a type mismatch or unknown name drops the event with at most one log line
//! per name. Handlers mutate master, channel, audio-unit or voice state only
//! through their typed setters.

mod au_events;
mod channel_events;
mod master_events;
pub(crate) mod note_setup;
mod proc_params;

use segno_core::module::PatInstRef;
use segno_core::{Tstamp, Value};

use crate::player::Player;

/// Where a fired trigger was authored; external fires have none.
#[derive(Debug, Clone, Copy)]
pub struct TriggerOrigin {
    pub piref: PatInstRef,
    pub row: Tstamp,
    pub channel: usize,
    pub trigger_index: usize,
}

/// Expected argument type of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    None,
    Bool,
    Int,
    Float,
    /// Float or int, read as float.
    Number,
    Tstamp,
    String,
    PatInstRef,
    /// Any value, passed through unchecked.
    Any,
}

fn arg_matches(expected: ArgType, arg: &Value) -> bool {
    match expected {
        ArgType::None => matches!(arg, Value::None),
        ArgType::Bool => matches!(arg, Value::Bool(_)),
        ArgType::Int => matches!(arg, Value::Int(_)),
        ArgType::Float => matches!(arg, Value::Float(_)),
        ArgType::Number => matches!(arg, Value::Float(_) | Value::Int(_)),
        ArgType::Tstamp => matches!(arg, Value::Tstamp(_)),
        ArgType::String => matches!(arg, Value::String(_)),
        ArgType::PatInstRef => matches!(arg, Value::PatInstRef(_)),
        ArgType::Any => true,
    }
}

/// The event table: name to expected argument type.
pub fn event_arg_type(name: &str) -> Option<ArgType> {
    use ArgType::*;
    Some(match name {
        // Master.
        "m.set_tempo" => Number,
        "m.slide_tempo" => Number,
        "m.slide_tempo_length" => Tstamp,
        "m.set_volume" => Number,
        "m.slide_volume" => Number,
        "m.slide_volume_length" => Tstamp,
        "m.pattern_delay" => Tstamp,
        "m.set_jump_counter" => Int,
        "m.set_jump_pat_inst" => PatInstRef,
        "m.set_jump_row" => Tstamp,
        "m.jump" => None,
        "m.set_goto_pat_inst" => PatInstRef,
        "m.set_goto_row" => Tstamp,
        "m.goto" => None,
        "m.set_retuner" => Int,
        "m.retune" => Number,
        "m.set_retuner_fixed_pitch" => Number,
        "m.set_retuner_offset" => Number,
        "m.reset_retuner" => None,

        // Channel.
        "c.note_on" => Number,
        "c.note_off" => None,
        "c.hit" => Int,
        "c.set_au" => Int,
        "c.set_force" => Number,
        "c.slide_force" => Number,
        "c.slide_force_length" => Tstamp,
        "c.slide_pitch" => Number,
        "c.slide_pitch_length" => Tstamp,
        "c.set_lowpass" => Number,
        "c.slide_lowpass" => Number,
        "c.slide_lowpass_length" => Tstamp,
        "c.set_resonance" => Number,
        "c.vibrato_speed" => Number,
        "c.vibrato_depth" => Number,
        "c.vibrato_speed_slide_length" => Tstamp,
        "c.vibrato_depth_slide_length" => Tstamp,
        "c.tremolo_speed" => Number,
        "c.tremolo_depth" => Number,
        "c.tremolo_speed_slide_length" => Tstamp,
        "c.tremolo_depth_slide_length" => Tstamp,
        "c.autowah_speed" => Number,
        "c.autowah_depth" => Number,
        "c.autowah_speed_slide_length" => Tstamp,
        "c.autowah_depth_slide_length" => Tstamp,
        "c.arpeggio_on" => None,
        "c.arpeggio_off" => None,
        "c.set_arpeggio_ref" => Number,
        "c.set_arpeggio_speed" => Number,
        "c.set_arpeggio_note" => Number,
        "c.reset_arpeggio" => None,
        "c.set_force_carry" => Bool,
        "c.set_pitch_carry" => Bool,
        "c.set_filter_carry" => Bool,
        "c.set_ch_expression" => String,
        "c.set_note_expression" => String,
        "c.carry_note_expression" => Bool,
        "c.use_test_output" => Bool,
        "c.set_test_processor" => Int,

        // Audio unit.
        "a.set_bypass" => Bool,
        "a.set_sustain" => Number,

        // Processor parameters.
        "g.set_processor" => Int,
        "g.set_param_name" => String,
        "g.set_bool" => Bool,
        "g.set_int" => Int,
        "g.set_float" => Number,
        "g.set_tstamp" => Tstamp,

        // Control variables.
        "cv.set_name" => String,
        "cv.set_value" => Any,
        "cv.slide_target" => Number,
        "cv.slide_length" => Tstamp,
        "cv.set_carry" => Bool,

        // Environment.
        "env.set_name" => String,
        "env.set_value" => Any,

        _ => return Option::None,
    })
}

impl Player {
    /// Route one event to its handler.
    pub(crate) fn dispatch_event(
        &mut self,
        channel: usize,
        name: &str,
        arg: &Value,
        origin: Option<&TriggerOrigin>,
        is_external: bool,
    ) {
        let Some(expected) = event_arg_type(name) else {
            self.warn_dropped(name, arg, "unknown event");
            return;
        };
        if !arg_matches(expected, arg) {
            self.warn_dropped(name, arg, "argument type mismatch");
            return;
        }

        match name.split('.').next().unwrap_or("") {
            "m" => self.handle_master_event(name, arg, origin),
            "c" => self.handle_channel_event(channel, name, arg, is_external),
            "a" => self.handle_au_event(channel, name, arg),
            "g" => self.handle_proc_event(channel, name, arg),
            "cv" => self.handle_cv_event(channel, name, arg),
            "env" => self.handle_env_event(name, arg),
            _ => self.warn_dropped(name, arg, "unknown category"),
        }
    }

    pub(crate) fn warn_dropped(&mut self, name: &str, arg: &Value, reason: &str) {
        if self.warned_events.insert(name.to_string()) {
            log::warn!("dropping event {name} ({}): {reason}", arg.type_name());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_all_categories() {
        assert_eq!(event_arg_type("m.jump"), Some(ArgType::None));
        assert_eq!(event_arg_type("c.note_on"), Some(ArgType::Number));
        assert_eq!(event_arg_type("a.set_bypass"), Some(ArgType::Bool));
        assert_eq!(event_arg_type("g.set_float"), Some(ArgType::Number));
        assert_eq!(event_arg_type("cv.set_value"), Some(ArgType::Any));
        assert_eq!(event_arg_type("env.set_name"), Some(ArgType::String));
        assert_eq!(event_arg_type("nonsense"), None);
    }

    #[test]
    fn number_accepts_ints_and_floats() {
        assert!(arg_matches(ArgType::Number, &Value::Int(3)));
        assert!(arg_matches(ArgType::Number, &Value::Float(0.5)));
        assert!(!arg_matches(ArgType::Number, &Value::Bool(true)));
        assert!(!arg_matches(ArgType::Float, &Value::Int(3)));
    }
}
