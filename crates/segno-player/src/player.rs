//! The player facade.
//!
//! A [`Player`] owns every piece of mutable rendering state for one module.
//! The caller drives it: `play_track`/`play_pattern`, then `render(frames)`
//! repeatedly, reading the produced audio from `output_buffer`. External
//! triggers go through `fire`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use segno_core::limits::CHANNELS_MAX;
use segno_core::module::{Module, PatInstRef, ProcDef};
use segno_core::{Result, SetupError, Tstamp, Value};

use crate::channel::Channel;
use crate::device::{DeviceGraph, DeviceStates};
use crate::master::{MasterParams, PlaybackPosition, PlaybackState, DEFAULT_TEMPO};
use crate::voice_pool::{VoicePool, VOICES_DEFAULT};

/// Runtime state of one audio unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuState {
    /// Sustain level in [0, 1]; non-zero holds release envelopes.
    pub sustain: f64,
    pub bypass: bool,
}

impl Default for AuState {
    fn default() -> Self {
        AuState {
            sustain: 0.0,
            bypass: false,
        }
    }
}

/// The rendering core for one module.
pub struct Player {
    pub(crate) module: Arc<Module>,
    pub(crate) audio_rate: u32,
    pub(crate) chunk_max: usize,

    pub(crate) master: MasterParams,
    pub(crate) channels: Vec<Channel>,
    pub(crate) au_states: Vec<AuState>,
    /// Runtime copies of the processor definitions; `g.*` and control-var
    /// events mutate these, the module stays immutable.
    pub(crate) runtime_procs: Vec<Vec<Option<ProcDef>>>,

    pub(crate) graph: DeviceGraph,
    pub(crate) states: DeviceStates,
    pub(crate) pool: VoicePool,

    pub(crate) out_left: Vec<f32>,
    pub(crate) out_right: Vec<f32>,
    /// Frames written by the current `render` call.
    pub(crate) frames_avail: usize,

    /// Next unfired trigger per pattern column.
    pub(crate) col_positions: Vec<usize>,
    /// Set when an event handler moved the playback position mid-row.
    pub(crate) position_dirty: bool,

    /// Event names already diagnosed, to keep the log at one line per name.
    pub(crate) warned_events: HashSet<String>,
    pub(crate) environment: HashMap<String, Value>,
    pub(crate) env_active_name: Option<String>,
}

impl Player {
    /// Set up a player for a module.
    pub fn new(module: Arc<Module>, audio_rate: u32, chunk_max: usize) -> Result<Player> {
        Self::with_voices(module, audio_rate, chunk_max, VOICES_DEFAULT)
    }

    /// Set up with an explicit voice-pool size.
    pub fn with_voices(
        module: Arc<Module>,
        audio_rate: u32,
        chunk_max: usize,
        voices: usize,
    ) -> Result<Player> {
        if audio_rate == 0 {
            return Err(SetupError::InvalidAudioRate(audio_rate));
        }
        if chunk_max == 0 {
            return Err(SetupError::InvalidChunkSize(chunk_max));
        }

        let graph = DeviceGraph::build(&module)?;
        let states = DeviceStates::new(&module, &graph, audio_rate, chunk_max);
        let mut master = MasterParams::new(&module);
        master.volume_slider.set_audio_rate(audio_rate);
        let channels = (0..CHANNELS_MAX)
            .map(|num| Channel::new(num, audio_rate, DEFAULT_TEMPO, module.random_seed))
            .collect();
        let au_states = vec![AuState::default(); module.audio_units.len()];
        let runtime_procs = module
            .audio_units
            .iter()
            .map(|au| au.processors.clone())
            .collect();

        Ok(Player {
            master,
            channels,
            au_states,
            runtime_procs,
            graph,
            states,
            pool: VoicePool::new(voices),
            out_left: vec![0.0; chunk_max],
            out_right: vec![0.0; chunk_max],
            frames_avail: 0,
            col_positions: vec![0; CHANNELS_MAX],
            position_dirty: false,
            warned_events: HashSet::new(),
            environment: HashMap::new(),
            env_active_name: None,
            module,
            audio_rate,
            chunk_max,
        })
    }

    pub fn audio_rate(&self) -> u32 {
        self.audio_rate
    }

    /// Change the audio rate; playback state is kept, DSP tails restart.
    pub fn set_audio_rate(&mut self, audio_rate: u32) -> Result<()> {
        if audio_rate == 0 {
            return Err(SetupError::InvalidAudioRate(audio_rate));
        }
        if audio_rate == self.audio_rate {
            return Ok(());
        }
        self.audio_rate = audio_rate;
        self.states.set_audio_rate(&self.module, audio_rate);
        self.master.volume_slider.set_audio_rate(audio_rate);
        for ch in &mut self.channels {
            ch.set_audio_rate(audio_rate);
        }
        // Per-voice DSP is sized at note start; cut current notes.
        self.pool.reset();
        Ok(())
    }

    /// Change the render-chunk maximum. Previously rendered output is
    /// dropped; on allocation failure the old size stays valid.
    pub fn set_buffer_size(&mut self, chunk_max: usize) -> Result<()> {
        if chunk_max == 0 {
            return Err(SetupError::InvalidChunkSize(chunk_max));
        }
        self.chunk_max = chunk_max;
        self.states.set_buffer_size(chunk_max);
        self.out_left = vec![0.0; chunk_max];
        self.out_right = vec![0.0; chunk_max];
        self.frames_avail = 0;
        Ok(())
    }

    /// Start playing a track from its first pattern.
    pub fn play_track(&mut self, track: usize) -> Result<()> {
        let song_index = self
            .module
            .song_for_track(track)
            .ok_or(SetupError::TrackOutOfRange(track))?;
        let song = self
            .module
            .songs
            .get(song_index)
            .ok_or(SetupError::TrackOutOfRange(track))?;
        let first_piref = song.system(0);
        let tempo = song.tempo;

        self.reset_playback_state();
        self.master.playback_state = PlaybackState::Song;
        self.master.pos = PlaybackPosition {
            track,
            system: 0,
            piref: first_piref,
            row: Tstamp::ZERO,
        };
        self.master.tempo = tempo;
        self.propagate_tempo();
        if self.master.pos.piref.is_none() {
            self.master.playback_state = PlaybackState::Stopped;
            self.master.end_reached = true;
        }
        Ok(())
    }

    /// Loop one pattern instance.
    pub fn play_pattern(&mut self, piref: PatInstRef) -> Result<()> {
        if self.module.pattern(piref.pattern).is_none() {
            return Err(SetupError::PatternOutOfRange(piref.pattern));
        }

        self.reset_playback_state();
        self.master.playback_state = PlaybackState::Pattern;
        // Tempo comes from the first song that plays this pattern.
        let tempo = self
            .module
            .songs
            .iter()
            .find(|song| song.contains(piref))
            .map(|song| song.tempo)
            .unwrap_or(DEFAULT_TEMPO);
        self.master.pos = PlaybackPosition {
            track: 0,
            system: 0,
            piref: Some(piref),
            row: Tstamp::ZERO,
        };
        self.master.tempo = tempo;
        self.propagate_tempo();
        Ok(())
    }

    /// Stop playback and silence every voice.
    pub fn stop(&mut self) {
        self.master.playback_state = PlaybackState::Stopped;
        self.pool.reset();
    }

    pub fn position(&self) -> PlaybackPosition {
        self.master.pos
    }

    pub fn end_reached(&self) -> bool {
        self.master.end_reached
    }

    pub fn active_voice_count(&self) -> usize {
        self.pool.active_count()
    }

    /// Fire an external trigger into a channel.
    pub fn fire(&mut self, channel: usize, name: &str, arg: Value) {
        if channel >= CHANNELS_MAX {
            return;
        }
        self.dispatch_event(channel, name, &arg, None, true);
    }

    /// Current value of an environment variable set through `env.*` events.
    pub fn environment_value(&self, name: &str) -> Option<&Value> {
        self.environment.get(name)
    }

    /// Audio produced by the last `render` call.
    pub fn output_buffer(&self, channel: usize) -> &[f32] {
        let buf = if channel == 0 {
            &self.out_left
        } else {
            &self.out_right
        };
        &buf[..self.frames_avail]
    }

    fn reset_playback_state(&mut self) {
        let module = Arc::clone(&self.module);
        self.master.reset(&module);
        self.master.volume_slider.set_audio_rate(self.audio_rate);
        for ch in &mut self.channels {
            ch.reset(self.audio_rate, DEFAULT_TEMPO, module.random_seed);
        }
        self.au_states = vec![AuState::default(); module.audio_units.len()];
        self.runtime_procs = module
            .audio_units
            .iter()
            .map(|au| au.processors.clone())
            .collect();
        self.pool.reset();
        self.states.clear_all_history();
        self.col_positions = vec![0; CHANNELS_MAX];
        self.position_dirty = false;
        self.frames_avail = 0;
    }

    /// Push the current tempo into every tempo-scaled component.
    pub(crate) fn propagate_tempo(&mut self) {
        let tempo = self.master.tempo;
        self.master.volume_slider.set_tempo(tempo);
        for ch in &mut self.channels {
            ch.set_tempo(tempo);
        }
    }
}
