//! Songs and the track list.

use serde::{Deserialize, Serialize};

use super::pattern::PatInstRef;

/// An ordered list of pattern instances with a starting tempo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub tempo: f64,
    order: Vec<PatInstRef>,
}

impl Song {
    pub fn new(tempo: f64) -> Self {
        debug_assert!(tempo > 0.0);
        Song {
            tempo,
            order: Vec::new(),
        }
    }

    pub fn push(&mut self, piref: PatInstRef) {
        self.order.push(piref);
    }

    pub fn system(&self, index: usize) -> Option<PatInstRef> {
        self.order.get(index).copied()
    }

    pub fn system_count(&self) -> usize {
        self.order.len()
    }

    pub fn contains(&self, piref: PatInstRef) -> bool {
        self.order.contains(&piref)
    }

    /// Position of a pattern instance within the order, if present.
    pub fn find(&self, piref: PatInstRef) -> Option<usize> {
        self.order.iter().position(|p| *p == piref)
    }
}

/// Maps playable track indices to song indices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackList {
    songs: Vec<usize>,
}

impl TrackList {
    pub fn new(songs: Vec<usize>) -> Self {
        TrackList { songs }
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn song_index(&self, track: usize) -> Option<usize> {
        self.songs.get(track).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_lookup() {
        let mut song = Song::new(120.0);
        song.push(PatInstRef::new(0, 0));
        song.push(PatInstRef::new(1, 0));
        song.push(PatInstRef::new(0, 1));

        assert_eq!(song.system(1), Some(PatInstRef::new(1, 0)));
        assert_eq!(song.system(3), None);
        assert_eq!(song.find(PatInstRef::new(0, 1)), Some(2));
        assert!(song.contains(PatInstRef::new(0, 0)));
    }
}
