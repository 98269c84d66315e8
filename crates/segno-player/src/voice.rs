//! Voice slots.

use segno_core::Random;
use segno_dsp::procs::{VoiceProcState, VoiceState};

/// Scheduling priority of a voice slot. Lower values are stolen first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum VoicePriority {
    #[default]
    Inactive,
    /// Released note still sounding.
    Background,
    /// Held note.
    Foreground,
    /// Allocated this cycle, not yet rendered.
    New,
}

/// One voice slot: a processor-bound state machine tied to a note group.
#[derive(Debug, Clone)]
pub struct Voice {
    /// Note group token; 0 is the null group.
    pub group_id: u64,
    pub channel: usize,
    pub priority: VoicePriority,
    /// Audio unit the group belongs to.
    pub au_index: usize,
    /// Graph node of the bound processor.
    pub proc_node: usize,
    /// Processor index within the unit.
    pub proc_index: usize,
    /// Parameter-jitter random stream.
    pub rand_p: Random,
    /// Signal-dither random stream.
    pub rand_s: Random,
    pub state: VoiceState,
    pub proc_state: VoiceProcState,
}

impl Voice {
    pub fn empty() -> Self {
        Voice {
            group_id: 0,
            channel: 0,
            priority: VoicePriority::Inactive,
            au_index: 0,
            proc_node: 0,
            proc_index: 0,
            rand_p: Random::with_seed(0),
            rand_s: Random::with_seed(0),
            state: VoiceState::new(),
            proc_state: VoiceProcState::Inert,
        }
    }

    pub fn is_active(&self) -> bool {
        self.priority != VoicePriority::Inactive
    }

    /// Return the slot to the unused state.
    pub fn reset(&mut self) {
        self.group_id = 0;
        self.priority = VoicePriority::Inactive;
        self.state = VoiceState::new();
        self.proc_state = VoiceProcState::Inert;
    }
}
