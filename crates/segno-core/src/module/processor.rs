//! Processor definitions.
//!
//! A processor is a typed DSP node inside an audio unit. Dispatch is by
//! [`ProcKind`]; type-specific parameters live in the matching
//! [`ProcParams`] variant. The runtime keeps per-voice and per-device state
//! elsewhere; everything here is immutable configuration.

use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;
use crate::hit_map::HitMap;
use crate::limits::{CHORUS_DELAY_MAX, CHORUS_VOICES_MAX};
use crate::sample::Sample;

/// Processor type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcKind {
    Debug,
    Pitch,
    Force,
    Filter,
    Sample,
    Noise,
    RingMod,
    Mult,
    GainComp,
    Chorus,
    KarplusStrong,
    Freeverb,
}

impl ProcKind {
    /// Whether this processor participates in the per-voice pipeline.
    pub fn supports_voice_signals(&self) -> bool {
        !matches!(self, ProcKind::Chorus | ProcKind::Freeverb)
    }
}

/// Parameters of the debug generator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebugParams {
    /// Emit a single force-scaled frame and stop.
    pub single_pulse: bool,
}

/// Parameters of the voice lowpass filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    /// Default cutoff on the log scale used by filter controls
    /// (semitone-like; 100 maps to the top of the audible range).
    pub cutoff: f64,
    /// Resonance in [0, 1]; multiplies the filter's internal gain.
    pub resonance: f64,
}

impl Default for FilterParams {
    fn default() -> Self {
        FilterParams {
            cutoff: 100.0,
            resonance: 0.0,
        }
    }
}

/// One playable sample with its mapping information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleEntry {
    pub sample: Sample,
    /// Pitch at which the sample plays at its native rate, in cents.
    pub middle_pitch: f64,
    /// Playback volume in dB.
    pub volume: f64,
}

/// Parameters of the sample player.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleProcParams {
    pub samples: Vec<SampleEntry>,
    /// Hit-index → sample selection for hit events.
    pub hit_map: HitMap,
}

/// Parameters of the noise generator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NoiseParams {
    /// Filter order: >= 0 selects a cascaded DC-zero chain, < 0 a pole chain
    /// of `-order` stages.
    pub order: i32,
}

/// Parameters of the gain compensation processor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GainCompParams {
    /// |x| → |y| map applied sign-preservingly; absent means pass-through.
    pub map: Option<Envelope>,
}

/// One chorus delay tap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChorusTapParams {
    /// Base delay in seconds; negative disables the tap.
    pub delay: f64,
    /// Delay oscillation range in seconds.
    pub range: f64,
    /// Delay oscillation speed in Hz.
    pub speed: f64,
    /// Tap volume in dB.
    pub volume: f64,
}

impl Default for ChorusTapParams {
    fn default() -> Self {
        ChorusTapParams {
            delay: -1.0,
            range: 0.0,
            speed: 0.0,
            volume: 0.0,
        }
    }
}

impl ChorusTapParams {
    pub fn is_enabled(&self) -> bool {
        (0.0..CHORUS_DELAY_MAX).contains(&self.delay)
    }
}

/// Parameters of the chorus processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChorusParams {
    pub taps: Vec<ChorusTapParams>,
}

impl Default for ChorusParams {
    fn default() -> Self {
        ChorusParams {
            taps: vec![ChorusTapParams::default(); CHORUS_VOICES_MAX],
        }
    }
}

/// Parameters of the Karplus-Strong string.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KsParams {
    /// Damping in [0, 100]; 100 sustains indefinitely.
    pub damp: f64,
    /// Fixed internal audio rate; `None` follows the engine rate.
    pub audio_rate_override: Option<u32>,
}

impl Default for KsParams {
    fn default() -> Self {
        KsParams {
            damp: 50.0,
            audio_rate_override: None,
        }
    }
}

/// Parameters of the reverb.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FreeverbParams {
    /// Comb feedback amount in [0, 1).
    pub reflectivity: f64,
    /// High-frequency damping in [0, 1].
    pub damping: f64,
}

impl Default for FreeverbParams {
    fn default() -> Self {
        FreeverbParams {
            reflectivity: 0.84,
            damping: 0.4,
        }
    }
}

/// Typed parameter payload, one variant per processor kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProcParams {
    Debug(DebugParams),
    Pitch,
    Force,
    Filter(FilterParams),
    Sample(SampleProcParams),
    Noise(NoiseParams),
    RingMod,
    Mult,
    GainComp(GainCompParams),
    Chorus(ChorusParams),
    KarplusStrong(KsParams),
    Freeverb(FreeverbParams),
}

impl ProcParams {
    pub fn kind(&self) -> ProcKind {
        match self {
            ProcParams::Debug(_) => ProcKind::Debug,
            ProcParams::Pitch => ProcKind::Pitch,
            ProcParams::Force => ProcKind::Force,
            ProcParams::Filter(_) => ProcKind::Filter,
            ProcParams::Sample(_) => ProcKind::Sample,
            ProcParams::Noise(_) => ProcKind::Noise,
            ProcParams::RingMod => ProcKind::RingMod,
            ProcParams::Mult => ProcKind::Mult,
            ProcParams::GainComp(_) => ProcKind::GainComp,
            ProcParams::Chorus(_) => ProcKind::Chorus,
            ProcParams::KarplusStrong(_) => ProcKind::KarplusStrong,
            ProcParams::Freeverb(_) => ProcKind::Freeverb,
        }
    }
}

/// A processor definition inside an audio unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcDef {
    pub params: ProcParams,
    /// Whether this processor renders in the per-voice pipeline. Forced off
    /// for mixed-only kinds.
    pub voice_signals: bool,
}

impl ProcDef {
    pub fn new(params: ProcParams) -> Self {
        let voice_signals = params.kind().supports_voice_signals();
        ProcDef {
            params,
            voice_signals,
        }
    }

    pub fn kind(&self) -> ProcKind {
        self.params.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_only_kinds_never_claim_voice_signals() {
        let chorus = ProcDef::new(ProcParams::Chorus(ChorusParams::default()));
        assert!(!chorus.voice_signals);
        let noise = ProcDef::new(ProcParams::Noise(NoiseParams::default()));
        assert!(noise.voice_signals);
    }

    #[test]
    fn default_chorus_taps_are_disabled() {
        let params = ChorusParams::default();
        assert_eq!(params.taps.len(), CHORUS_VOICES_MAX);
        assert!(params.taps.iter().all(|t| !t.is_enabled()));
    }
}
