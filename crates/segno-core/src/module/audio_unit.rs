//! Audio units: composite devices of processors and inner connections.

use serde::{Deserialize, Serialize};

use super::connection::Connection;
use super::processor::ProcDef;
use crate::envelope::Envelope;
use crate::limits::PROCESSORS_MAX;
use crate::value::Value;

/// Role of an audio unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AuType {
    /// Voiced: receives note-on/hit events and runs the voice pipeline.
    #[default]
    Instrument,
    /// Mixed-only signal processing.
    Effect,
}

/// Force envelope settings of an audio unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForceEnvelopeParams {
    pub enabled: bool,
    pub envelope: Envelope,
    pub loop_enabled: bool,
    /// Pitch-scaling exponent for envelope time.
    pub scale_amount: f64,
    /// Pitch at which the envelope runs at nominal speed, in cents.
    pub scale_center: f64,
}

impl ForceEnvelopeParams {
    pub fn new(envelope: Envelope) -> Self {
        ForceEnvelopeParams {
            enabled: true,
            envelope,
            loop_enabled: false,
            scale_amount: 0.0,
            scale_center: 0.0,
        }
    }
}

/// Instrument-level parameters consumed by the force processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuParams {
    /// Global force in dB added to every voice.
    pub global_force: f64,
    /// Random force variation span in dB, drawn from the voice's
    /// parameter-random stream.
    pub force_variation: f64,
    pub env_force: Option<ForceEnvelopeParams>,
    pub env_force_release: Option<ForceEnvelopeParams>,
}

impl Default for AuParams {
    fn default() -> Self {
        AuParams {
            global_force: 0.0,
            force_variation: 0.0,
            env_force: None,
            env_force_release: None,
        }
    }
}

/// Hit configuration: existence plus an optional processor filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HitInfo {
    pub exists: bool,
    /// `allowed_procs[i]` gates processor `i` for this hit; `None` allows
    /// every processor.
    pub allowed_procs: Option<Vec<bool>>,
}

impl HitInfo {
    pub fn allows_proc(&self, proc_index: usize) -> bool {
        match &self.allowed_procs {
            Some(flags) => flags.get(proc_index).copied().unwrap_or(false),
            None => true,
        }
    }
}

/// Expression table: named processor filters for articulations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Expressions {
    pub default_note_expr: String,
    entries: Vec<(String, Vec<bool>)>,
}

impl Expressions {
    pub fn add(&mut self, name: impl Into<String>, allowed_procs: Vec<bool>) {
        self.entries.push((name.into(), allowed_procs));
    }

    pub fn get(&self, name: &str) -> Option<&[bool]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, flags)| flags.as_slice())
    }

    /// Whether `proc_index` renders under the named expression. An unknown
    /// or empty name allows every processor.
    pub fn allows_proc(&self, name: &str, proc_index: usize) -> bool {
        if name.is_empty() {
            return true;
        }
        match self.get(name) {
            Some(flags) => flags.get(proc_index).copied().unwrap_or(false),
            None => true,
        }
    }
}

/// Binding of a control variable to one processor parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlVarBinding {
    pub proc_index: usize,
    pub param_name: String,
}

/// A control variable definition on an audio unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlVarDef {
    pub name: String,
    pub init_value: Value,
    pub bindings: Vec<ControlVarBinding>,
}

/// A composite device: processors wired by an inner connection graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioUnit {
    pub au_type: AuType,
    /// Dense processor table; holes keep authored indices stable.
    pub processors: Vec<Option<ProcDef>>,
    /// Inner connections between processors and the unit's interfaces.
    pub connections: Vec<Connection>,
    pub params: AuParams,
    pub hits: Vec<HitInfo>,
    pub expressions: Expressions,
    pub control_vars: Vec<ControlVarDef>,
}

impl AudioUnit {
    pub fn new(au_type: AuType) -> Self {
        AudioUnit {
            au_type,
            ..AudioUnit::default()
        }
    }

    pub fn is_instrument(&self) -> bool {
        self.au_type == AuType::Instrument
    }

    pub fn set_processor(&mut self, index: usize, def: ProcDef) {
        debug_assert!(index < PROCESSORS_MAX);
        if self.processors.len() <= index {
            self.processors.resize_with(index + 1, || None);
        }
        self.processors[index] = Some(def);
    }

    pub fn processor(&self, index: usize) -> Option<&ProcDef> {
        self.processors.get(index).and_then(|p| p.as_ref())
    }

    /// Iterate existing processors as `(index, def)`.
    pub fn processors(&self) -> impl Iterator<Item = (usize, &ProcDef)> {
        self.processors
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.as_ref().map(|def| (i, def)))
    }

    pub fn hit(&self, index: usize) -> Option<&HitInfo> {
        self.hits.get(index).filter(|h| h.exists)
    }

    pub fn control_var(&self, name: &str) -> Option<&ControlVarDef> {
        self.control_vars.iter().find(|cv| cv.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::processor::{NoiseParams, ProcParams};

    #[test]
    fn processor_table_keeps_holes() {
        let mut au = AudioUnit::new(AuType::Instrument);
        au.set_processor(2, ProcDef::new(ProcParams::Noise(NoiseParams::default())));
        assert!(au.processor(0).is_none());
        assert!(au.processor(2).is_some());
        assert_eq!(au.processors().count(), 1);
    }

    #[test]
    fn hit_filter() {
        let hit = HitInfo {
            exists: true,
            allowed_procs: Some(vec![true, false]),
        };
        assert!(hit.allows_proc(0));
        assert!(!hit.allows_proc(1));
        assert!(!hit.allows_proc(5));

        let open = HitInfo {
            exists: true,
            allowed_procs: None,
        };
        assert!(open.allows_proc(5));
    }

    #[test]
    fn expression_filter() {
        let mut exprs = Expressions::default();
        exprs.add("muted", vec![false, true]);
        assert!(exprs.allows_proc("", 0));
        assert!(!exprs.allows_proc("muted", 0));
        assert!(exprs.allows_proc("muted", 1));
        assert!(exprs.allows_proc("unknown", 0));
    }
}
