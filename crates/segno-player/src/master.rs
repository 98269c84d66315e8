//! Master playback state.

use segno_core::limits::{JUMP_CONTEXTS_MAX, TSTAMP_BEAT, TUNING_TABLES_MAX};
use segno_core::module::{Module, PatInstRef};
use segno_core::{Random, Tstamp};
use segno_dsp::filter::DcBlocker;
use segno_dsp::Slider;

use crate::tuning::TuningState;

/// Default tempo when a song does not provide one.
pub const DEFAULT_TEMPO: f64 = 120.0;

/// Tempo-slide slice length: 1/24 beat, so a one-beat slide moves in 24
/// steps and a slice never exceeds a beat.
pub fn tempo_slide_slice() -> Tstamp {
    Tstamp::new(0, (TSTAMP_BEAT / 24) as i64)
}

/// Overall playback mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    /// Walking a track's pattern order.
    Song,
    /// Looping one pattern instance.
    Pattern,
}

/// Position within the composition timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackPosition {
    pub track: usize,
    /// Index into the song's pattern order.
    pub system: usize,
    pub piref: Option<PatInstRef>,
    /// Offset within the current pattern.
    pub row: Tstamp,
}

/// One bounded-repeat jump context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpContext {
    /// Where the jump trigger lives.
    pub origin_piref: PatInstRef,
    pub origin_row: Tstamp,
    pub origin_channel: usize,
    pub origin_trigger: usize,
    /// Repeats left.
    pub counter: i64,
}

/// An in-progress tempo slide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoSlide {
    pub target: f64,
    /// Tempo change applied at each slice boundary.
    pub update: f64,
    /// Beat time left in the whole slide.
    pub slide_left: Tstamp,
    /// Beat time left in the current slice.
    pub slice_left: Tstamp,
}

/// Master parameters: position, tempo, volume, jumps, retuning.
#[derive(Debug, Clone)]
pub struct MasterParams {
    pub playback_state: PlaybackState,
    pub pos: PlaybackPosition,

    pub tempo: f64,
    pub tempo_slide: Option<TempoSlide>,
    pub tempo_slide_length: Tstamp,

    /// Master volume in dB, with its slider.
    pub volume_db: f64,
    pub volume_slider: Slider,

    /// Remaining pattern delay.
    pub delay_left: Tstamp,

    pub active_jumps: Vec<JumpContext>,
    pub jump_counter: i64,
    pub jump_target_piref: Option<PatInstRef>,
    pub jump_target_row: Tstamp,

    pub goto_target_piref: Option<PatInstRef>,
    pub goto_target_row: Tstamp,
    pub goto_safety_counter: u32,

    pub cur_tuning_state: Option<usize>,
    pub tuning_states: Vec<TuningState>,

    pub dc_blockers: [DcBlocker; 2],

    pub random: Random,
    pub end_reached: bool,
}

impl MasterParams {
    pub fn new(module: &Module) -> Self {
        let mut params = MasterParams {
            playback_state: PlaybackState::Stopped,
            pos: PlaybackPosition::default(),
            tempo: DEFAULT_TEMPO,
            tempo_slide: None,
            tempo_slide_length: Tstamp::ZERO,
            volume_db: 0.0,
            volume_slider: Slider::new(),
            delay_left: Tstamp::ZERO,
            active_jumps: Vec::with_capacity(JUMP_CONTEXTS_MAX),
            jump_counter: 0,
            jump_target_piref: None,
            jump_target_row: Tstamp::ZERO,
            goto_target_piref: None,
            goto_target_row: Tstamp::ZERO,
            goto_safety_counter: 0,
            cur_tuning_state: None,
            tuning_states: vec![TuningState::new(); TUNING_TABLES_MAX],
            dc_blockers: [DcBlocker::default(); 2],
            random: Random::for_stream(module.random_seed, "m"),
            end_reached: false,
        };
        params.reset(module);
        params
    }

    /// Restore the pre-playback state; the module is needed to reseed.
    pub fn reset(&mut self, module: &Module) {
        self.playback_state = PlaybackState::Stopped;
        self.pos = PlaybackPosition::default();
        self.tempo = DEFAULT_TEMPO;
        self.tempo_slide = None;
        self.tempo_slide_length = Tstamp::ZERO;
        self.volume_db = 0.0;
        self.volume_slider = Slider::new();
        self.delay_left = Tstamp::ZERO;
        self.active_jumps.clear();
        self.jump_counter = 0;
        self.jump_target_piref = None;
        self.jump_target_row = Tstamp::ZERO;
        self.goto_target_piref = None;
        self.goto_target_row = Tstamp::ZERO;
        self.goto_safety_counter = 0;
        self.cur_tuning_state = None;
        for state in &mut self.tuning_states {
            state.reset(None);
        }
        self.dc_blockers = [DcBlocker::default(); 2];
        self.random = Random::for_stream(module.random_seed, "m");
        self.end_reached = false;
    }

    /// Start a tempo slide toward `target` over the configured length.
    pub fn start_tempo_slide(&mut self, target: f64) {
        debug_assert!(target.is_finite() && target > 0.0);
        if self.tempo_slide_length.is_zero() {
            self.tempo = target;
            self.tempo_slide = None;
            return;
        }
        let slice = tempo_slide_slice();
        let total_beats = self.tempo_slide_length.as_beats_f64();
        let slice_beats = slice.as_beats_f64();
        let slices = (total_beats / slice_beats).ceil().max(1.0);
        self.tempo_slide = Some(TempoSlide {
            target,
            update: (target - self.tempo) / slices,
            slide_left: self.tempo_slide_length,
            slice_left: slice.min(self.tempo_slide_length),
        });
    }

    /// Drop the slide, keeping the tempo reached so far. Used when a pattern
    /// boundary snaps an in-progress slide.
    pub fn snap_tempo_slide(&mut self) {
        self.tempo_slide = None;
    }

    pub fn is_playing(&self) -> bool {
        self.playback_state != PlaybackState::Stopped
    }
}
