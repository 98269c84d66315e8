//! Audio-unit, control-variable and environment event handlers.

use segno_core::Value;
use segno_dsp::Slider;

use crate::channel::CvEntry;
use crate::player::Player;

impl Player {
    pub(super) fn handle_au_event(&mut self, channel: usize, name: &str, arg: &Value) {
        let au_index = self.channels[channel].au_index;
        let Some(au_state) = self.au_states.get_mut(au_index) else {
            return;
        };
        match name {
            "a.set_bypass" => {
                au_state.bypass = arg.as_bool().unwrap_or(false);
            }
            "a.set_sustain" => {
                let sustain = arg.as_float().unwrap_or_default();
                if sustain.is_finite() {
                    au_state.sustain = sustain.clamp(0.0, 1.0);
                }
            }
            _ => {}
        }
    }

    pub(super) fn handle_cv_event(&mut self, channel: usize, name: &str, arg: &Value) {
        match name {
            "cv.set_name" => {
                self.channels[channel].cv_active_name =
                    arg.as_str().map(|s| s.to_string());
            }
            "cv.set_carry" => {
                let carry = arg.as_bool().unwrap_or(false);
                if let Some(var_name) = self.channels[channel].cv_active_name.clone() {
                    self.channels[channel]
                        .cv_state
                        .entry(var_name)
                        .or_insert_with(|| CvEntry {
                            value: Value::None,
                            carry: false,
                        })
                        .carry = carry;
                }
            }
            "cv.set_value" => {
                let Some(var_name) = self.channels[channel].cv_active_name.clone() else {
                    self.warn_dropped(name, arg, "no control variable selected");
                    return;
                };
                self.channels[channel]
                    .cv_state
                    .entry(var_name.clone())
                    .or_insert_with(|| CvEntry {
                        value: Value::None,
                        carry: false,
                    })
                    .value = arg.clone();
                self.apply_control_var(channel, &var_name, arg);
            }
            "cv.slide_length" => {
                let length = arg.as_tstamp().unwrap_or_default();
                let (audio_rate, tempo) = (self.audio_rate, self.master.tempo);
                if let Some(var_name) = self.channels[channel].cv_active_name.clone() {
                    let slider = self.channels[channel]
                        .cv_slides
                        .entry(var_name)
                        .or_insert_with(Slider::new);
                    slider.set_audio_rate(audio_rate);
                    slider.set_tempo(tempo);
                    slider.set_length(length);
                }
            }
            "cv.slide_target" => {
                let Some(target) = arg.as_float().filter(|t| t.is_finite()) else {
                    return;
                };
                let Some(var_name) = self.channels[channel].cv_active_name.clone() else {
                    self.warn_dropped(name, arg, "no control variable selected");
                    return;
                };
                let (audio_rate, tempo) = (self.audio_rate, self.master.tempo);
                let current = self.channels[channel]
                    .cv_state
                    .get(&var_name)
                    .and_then(|entry| entry.value.as_float())
                    .unwrap_or(0.0);
                let slider = self.channels[channel]
                    .cv_slides
                    .entry(var_name)
                    .or_insert_with(Slider::new);
                slider.set_audio_rate(audio_rate);
                slider.set_tempo(tempo);
                if slider.in_progress() {
                    slider.change_target(target);
                } else {
                    slider.start(target, current);
                }
            }
            _ => {}
        }
    }

    /// Advance every in-progress control-variable slide by one chunk and
    /// push the values through the bindings.
    pub(crate) fn step_cv_slides(&mut self, frames: usize) {
        for ch_index in 0..self.channels.len() {
            let sliding: Vec<String> = self.channels[ch_index]
                .cv_slides
                .iter()
                .filter(|(_, slider)| slider.in_progress())
                .map(|(name, _)| name.clone())
                .collect();
            for var_name in sliding {
                let value = self.channels[ch_index]
                    .cv_slides
                    .get_mut(&var_name)
                    .map(|slider| slider.skip(frames as u64))
                    .unwrap_or(0.0);
                let entry = self.channels[ch_index]
                    .cv_state
                    .entry(var_name.clone())
                    .or_insert_with(|| CvEntry {
                        value: Value::None,
                        carry: false,
                    });
                entry.value = Value::Float(value);
                self.apply_control_var(ch_index, &var_name, &Value::Float(value));
            }
        }
    }

    /// Push a control-variable value through the unit's bindings into the
    /// runtime processor parameters.
    fn apply_control_var(&mut self, channel: usize, var_name: &str, value: &Value) {
        let au_index = self.channels[channel].au_index;
        let Some(au) = self.module.audio_unit(au_index) else {
            return;
        };
        let Some(def) = au.control_var(var_name) else {
            return;
        };
        let bindings = def.bindings.clone();
        for binding in bindings {
            self.set_runtime_proc_param(au_index, binding.proc_index, &binding.param_name, value);
        }
    }

    pub(super) fn handle_env_event(&mut self, name: &str, arg: &Value) {
        match name {
            "env.set_name" => {
                self.env_active_name = arg.as_str().map(|s| s.to_string());
            }
            "env.set_value" => {
                if let Some(var_name) = self.env_active_name.clone() {
                    self.environment.insert(var_name, arg.clone());
                }
            }
            _ => {}
        }
    }
}
