//! Runtime processor-parameter updates (`g.*` events and control-variable
//! bindings).
//!
//! The module's processor definitions stay immutable; the player keeps a
//! runtime copy per processor and these handlers rewrite named fields in it.
//! Unknown names are dropped with one diagnostic.

use segno_core::module::ProcParams;
use segno_core::Value;

use crate::player::Player;

impl Player {
    pub(super) fn handle_proc_event(&mut self, channel: usize, name: &str, arg: &Value) {
        match name {
            "g.set_processor" => {
                let index = arg.as_int().unwrap_or(0).max(0);
                self.channels[channel].proc_target = index as usize;
            }
            "g.set_param_name" => {
                self.channels[channel].proc_param_name = arg.as_str().map(|s| s.to_string());
            }
            "g.set_bool" | "g.set_int" | "g.set_float" | "g.set_tstamp" => {
                let au_index = self.channels[channel].au_index;
                let proc_index = self.channels[channel].proc_target;
                let Some(param_name) = self.channels[channel].proc_param_name.clone() else {
                    self.warn_dropped(name, arg, "no parameter selected");
                    return;
                };
                if !self.set_runtime_proc_param(au_index, proc_index, &param_name, arg) {
                    self.warn_dropped(name, arg, "parameter not found");
                }
            }
            _ => {}
        }
    }

    /// Apply a value to one named field of a runtime processor definition.
    ///
    /// Returns whether the parameter was recognized and the value applied.
    pub(crate) fn set_runtime_proc_param(
        &mut self,
        au_index: usize,
        proc_index: usize,
        param_name: &str,
        value: &Value,
    ) -> bool {
        let Some(def) = self
            .runtime_procs
            .get_mut(au_index)
            .and_then(|procs| procs.get_mut(proc_index))
            .and_then(|def| def.as_mut())
        else {
            return false;
        };

        match &mut def.params {
            ProcParams::Debug(params) => match (param_name, value.as_bool()) {
                ("single_pulse", Some(v)) => {
                    params.single_pulse = v;
                    true
                }
                _ => false,
            },

            ProcParams::Filter(params) => match param_name {
                "cutoff" => assign_finite(&mut params.cutoff, value),
                "resonance" => assign_clamped(&mut params.resonance, value, 0.0, 1.0),
                _ => false,
            },

            ProcParams::Noise(params) => match (param_name, value.as_int()) {
                ("order", Some(v)) if (-8..=8).contains(&v) => {
                    params.order = v as i32;
                    true
                }
                _ => false,
            },

            ProcParams::GainComp(_) => false,

            ProcParams::Chorus(params) => {
                // Tap parameters address as "voice_NN/field".
                let Some(rest) = param_name.strip_prefix("voice_") else {
                    return false;
                };
                let Some((index_str, field)) = rest.split_once('/') else {
                    return false;
                };
                let Ok(tap_index) = index_str.parse::<usize>() else {
                    return false;
                };
                let Some(tap) = params.taps.get_mut(tap_index) else {
                    return false;
                };
                match field {
                    "delay" => assign_finite(&mut tap.delay, value),
                    "range" => assign_finite(&mut tap.range, value),
                    "speed" => assign_finite(&mut tap.speed, value),
                    "volume" => assign_finite(&mut tap.volume, value),
                    _ => false,
                }
            }

            ProcParams::KarplusStrong(params) => match param_name {
                "damp" => assign_clamped(&mut params.damp, value, 0.0, 100.0),
                _ => false,
            },

            ProcParams::Freeverb(params) => match param_name {
                "reflectivity" => assign_clamped(&mut params.reflectivity, value, 0.0, 0.999),
                "damping" => assign_clamped(&mut params.damping, value, 0.0, 1.0),
                _ => false,
            },

            ProcParams::Pitch
            | ProcParams::Force
            | ProcParams::Sample(_)
            | ProcParams::RingMod
            | ProcParams::Mult => false,
        }
    }
}

fn assign_finite(target: &mut f64, value: &Value) -> bool {
    match value.as_float() {
        Some(v) if v.is_finite() => {
            *target = v;
            true
        }
        _ => false,
    }
}

fn assign_clamped(target: &mut f64, value: &Value, min: f64, max: f64) -> bool {
    match value.as_float() {
        Some(v) if v.is_finite() => {
            *target = v.clamp(min, max);
            true
        }
        _ => false,
    }
}
