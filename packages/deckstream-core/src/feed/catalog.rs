//! In-memory track database.

use dashmap::DashMap;

use crate::prolink::{Track, TrackKey, TrackLookup, TrackLookupError, TrackLookupResult};

/// A [`TrackLookup`] over tracks registered in memory.
#[derive(Default)]
pub struct TrackCatalog {
    tracks: DashMap<TrackKey, Track>,
}

impl TrackCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a track, replacing any previous entry for the key.
    pub fn insert(&self, key: TrackKey, track: Track) {
        self.tracks.insert(key, track);
    }

    pub fn remove(&self, key: &TrackKey) -> Option<Track> {
        self.tracks.remove(key).map(|(_, track)| track)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

impl TrackLookup for TrackCatalog {
    fn get_track(&self, key: &TrackKey) -> TrackLookupResult<Track> {
        self.tracks
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or(TrackLookupError::NotFound(*key))
    }
}
