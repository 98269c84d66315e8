//! The voice pool.
//!
//! A fixed set of voice slots reused for the whole player lifetime. Notes
//! allocate one voice per eligible processor under a shared group token;
//! when every slot is taken the pool steals the lowest-priority voice that is
//! not part of the requesting group and invalidates the victim's whole group
//! in the same call, so processors never see half a group.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::voice::{Voice, VoicePriority};

/// Default number of voice slots.
pub const VOICES_DEFAULT: usize = 64;

/// Result of a voice allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub slot: usize,
    /// Audio unit of a stolen group, for history clearing.
    pub stolen_au: Option<usize>,
}

/// Owner of all voice slots and the group-id counter.
#[derive(Debug)]
pub struct VoicePool {
    voices: Vec<Voice>,
    /// The one shared atomic of the renderer: group ids stay unique even if
    /// voice groups are one day processed from worker threads.
    next_group_id: AtomicU64,
}

impl VoicePool {
    pub fn new(size: usize) -> Self {
        VoicePool {
            voices: (0..size).map(|_| Voice::empty()).collect(),
            next_group_id: AtomicU64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Draw a fresh group token; never 0.
    pub fn new_group_id(&self) -> u64 {
        self.next_group_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn voice(&self, slot: usize) -> &Voice {
        &self.voices[slot]
    }

    pub fn voice_mut(&mut self, slot: usize) -> &mut Voice {
        &mut self.voices[slot]
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn voices_mut(&mut self) -> &mut [Voice] {
        &mut self.voices
    }

    /// Allocate a voice for `group_id` on `channel`.
    ///
    /// External allocations (note-on/hit triggers) always succeed, stealing
    /// the lowest-priority oldest voice outside the group when the pool is
    /// full. Internal allocations never steal a held note and return `None`
    /// instead.
    pub fn allocate(
        &mut self,
        channel: usize,
        group_id: u64,
        is_external: bool,
    ) -> Option<Allocation> {
        debug_assert!(group_id != 0);

        let candidate = self
            .voices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.group_id != group_id)
            .min_by_key(|(_, v)| (v.priority, v.group_id))
            .map(|(i, _)| i)?;

        let victim = &self.voices[candidate];
        if victim.priority >= VoicePriority::Foreground && !is_external {
            return None;
        }

        let stolen_au = if victim.is_active() {
            let au = victim.au_index;
            let stolen_group = victim.group_id;
            self.reset_group(stolen_group);
            Some(au)
        } else {
            None
        };

        let voice = &mut self.voices[candidate];
        voice.reset();
        voice.group_id = group_id;
        voice.channel = channel;
        voice.priority = VoicePriority::New;

        Some(Allocation {
            slot: candidate,
            stolen_au,
        })
    }

    /// Invalidate every voice of a group.
    pub fn reset_group(&mut self, group_id: u64) {
        if group_id == 0 {
            return;
        }
        for voice in &mut self.voices {
            if voice.group_id == group_id {
                voice.reset();
            }
        }
    }

    /// Demote a group to background and start its note-off processing.
    pub fn set_group_released(&mut self, group_id: u64) {
        if group_id == 0 {
            return;
        }
        for voice in &mut self.voices {
            if voice.group_id == group_id && voice.is_active() {
                voice.priority = VoicePriority::Background;
                voice.state.set_note_off();
            }
        }
    }

    /// Promote freshly allocated voices to foreground before rendering.
    pub fn settle_new_voices(&mut self) {
        for voice in &mut self.voices {
            if voice.priority == VoicePriority::New {
                voice.priority = VoicePriority::Foreground;
            }
        }
    }

    /// Slots belonging to a group.
    pub fn group_slots(&self, group_id: u64) -> Vec<usize> {
        if group_id == 0 {
            return Vec::new();
        }
        self.voices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.group_id == group_id && v.is_active())
            .map(|(i, _)| i)
            .collect()
    }

    /// Distinct active group ids, in allocation order.
    pub fn active_group_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self
            .voices
            .iter()
            .filter(|v| v.is_active())
            .map(|v| v.group_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    /// Reset every slot; the group-id counter keeps running.
    pub fn reset(&mut self) {
        for voice in &mut self.voices {
            voice.reset();
        }
    }
}
