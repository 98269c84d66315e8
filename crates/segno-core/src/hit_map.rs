//! Hit maps: velocity-layered sample selection.
//!
//! A hit map binds `(hit index, force)` to a sample with playback
//! adjustments. Entries at the force level nearest to the request form a
//! random list; the voice's parameter-random stream picks one, so repeated
//! hits vary deterministically.

use serde::{Deserialize, Serialize};

use crate::random::Random;

/// One selectable sample entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitMapEntry {
    /// Force level this entry is mapped at, in dB.
    pub force: f64,
    /// Index into the module sample table.
    pub sample_index: usize,
    /// Pitch offset applied at playback, in cents.
    pub cents_offset: f64,
    /// Volume adjustment, in dB.
    pub volume_adjust: f64,
}

/// Map from hit index to its entry list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HitMap {
    hits: Vec<Vec<HitMapEntry>>,
}

impl HitMap {
    pub fn new() -> Self {
        HitMap::default()
    }

    /// Register an entry under a hit index, growing the table as needed.
    pub fn add_entry(&mut self, hit_index: usize, entry: HitMapEntry) {
        if self.hits.len() <= hit_index {
            self.hits.resize(hit_index + 1, Vec::new());
        }
        self.hits[hit_index].push(entry);
    }

    pub fn has_hit(&self, hit_index: usize) -> bool {
        self.hits.get(hit_index).is_some_and(|e| !e.is_empty())
    }

    /// Select an entry for `(hit_index, force)`.
    ///
    /// Entries at the force level nearest to the request are candidates; ties
    /// between candidates resolve through `rand`.
    pub fn entry(&self, hit_index: usize, force: f64, rand: &mut Random) -> Option<HitMapEntry> {
        let entries = self.hits.get(hit_index)?;
        if entries.is_empty() {
            return None;
        }

        let mut best = f64::INFINITY;
        for e in entries {
            let d = (e.force - force).abs();
            if d < best {
                best = d;
            }
        }
        let candidates: Vec<&HitMapEntry> = entries
            .iter()
            .filter(|e| (e.force - force).abs() <= best)
            .collect();

        Some(*candidates[rand.next_below(candidates.len())])
    }
}
