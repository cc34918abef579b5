//! Boundary with the on-device indexer
//!
//! Scanning and tag extraction are done elsewhere; the backend only reads
//! the result through [`LocalIndex`].

use async_trait::async_trait;
use polysource::{ChangeTracker, Result};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use tokio::sync::watch;

/// One indexed audio file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedTrack {
    /// Backend name of the volume holding the file
    pub volume: String,
    /// Path relative to the volume root
    pub path: String,
    pub title: String,
    pub artist: Option<String>,
    pub album_artist: Option<String>,
    pub album: Option<String>,
    pub track: Option<u32>,
    pub disc: Option<u32>,
    pub duration_ms: Option<u64>,
    pub genre: Option<String>,
    pub year: Option<i32>,
    /// Unix timestamp (seconds) of the first indexing
    pub added: i64,
    pub lyrics: Option<String>,
}

impl IndexedTrack {
    pub fn new(volume: impl Into<String>, path: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            volume: volume.into(),
            path: path.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    /// Artist used to group the track into an album
    pub fn grouping_artist(&self) -> Option<&str> {
        self.album_artist.as_deref().or(self.artist.as_deref())
    }
}

/// A playlist file found on a volume
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedPlaylist {
    pub volume: String,
    /// Stable key of the playlist within its volume
    pub key: String,
    pub name: String,
    /// Track paths relative to the same volume, in playlist order
    pub entries: Vec<String>,
}

/// Read access to the local index
#[async_trait]
pub trait LocalIndex: std::fmt::Debug + Send + Sync {
    /// Every indexed track of every volume
    async fn tracks(&self) -> Result<Vec<IndexedTrack>>;

    async fn playlists(&self) -> Result<Vec<IndexedPlaylist>>;

    /// Ticks whenever the index content changes
    fn changes(&self) -> watch::Receiver<u64>;
}

/// Index held in memory, filled by the caller
#[derive(Debug, Default)]
pub struct MemoryIndex {
    tracks: RwLock<Vec<IndexedTrack>>,
    playlists: RwLock<Vec<IndexedPlaylist>>,
    tracker: ChangeTracker,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tracks(tracks: Vec<IndexedTrack>) -> Self {
        let index = Self::new();
        *index.tracks.write().unwrap() = tracks;
        index
    }

    /// Adds or replaces a track (same volume and path)
    pub fn upsert_track(&self, track: IndexedTrack) {
        {
            let mut tracks = self.tracks.write().unwrap();
            match tracks
                .iter_mut()
                .find(|t| t.volume == track.volume && t.path == track.path)
            {
                Some(existing) => *existing = track,
                None => tracks.push(track),
            }
        }
        self.tracker.bump();
    }

    /// Returns `true` if the track existed
    pub fn remove_track(&self, volume: &str, path: &str) -> bool {
        let removed = {
            let mut tracks = self.tracks.write().unwrap();
            let before = tracks.len();
            tracks.retain(|t| !(t.volume == volume && t.path == path));
            before != tracks.len()
        };
        if removed {
            self.tracker.bump();
        }
        removed
    }

    /// Drops everything indexed on a volume
    pub fn remove_volume(&self, volume: &str) {
        self.tracks.write().unwrap().retain(|t| t.volume != volume);
        self.playlists.write().unwrap().retain(|p| p.volume != volume);
        self.tracker.bump();
    }

    pub fn set_playlists(&self, playlists: Vec<IndexedPlaylist>) {
        *self.playlists.write().unwrap() = playlists;
        self.tracker.bump();
    }
}

#[async_trait]
impl LocalIndex for MemoryIndex {
    async fn tracks(&self) -> Result<Vec<IndexedTrack>> {
        Ok(self.tracks.read().unwrap().clone())
    }

    async fn playlists(&self) -> Result<Vec<IndexedPlaylist>> {
        Ok(self.playlists.read().unwrap().clone())
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.tracker.subscribe()
    }
}
