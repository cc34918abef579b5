//! # polylocal - Local library backend
//!
//! Exposes the on-device index as a [`MediaBackend`](polysource::MediaBackend).
//!
//! - [`StorageVolume`]: volumes reported by the platform, with the stable
//!   provider id of each ([`volume_instance_id`])
//! - [`LocalIndex`]: read access to the indexer, [`MemoryIndex`] being the
//!   in-process implementation
//! - [`LocalLibrary`]: index, statistics store and change tracker shared by
//!   every local backend
//! - [`LocalBackend`]: undivided (`local://*/...`) or per-volume
//!   (`local://<volume>/...`) view of the library
//!
//! Audio identifiers always name the volume holding the file, so the same
//! track has the same identifier whether volumes are split or not:
//!
//! ```text
//! local://primary/audio/Music/Artist/Album/01 - Track.flac
//! local://*/album/3fa1c07d9be2a410
//! local://1A2B-3C4D/playlist/favorites
//! ```
//!
//! # Example
//!
//! ```no_run
//! use polylocal::{
//!     IndexedTrack, LocalBackend, LocalLibrary, MemoryIndex, StorageVolume, VolumeState,
//! };
//! use polydb::{Database, StatsStore};
//! use polysource::{first, MediaBackend, SortingRule};
//! use std::sync::Arc;
//! use tokio::sync::watch;
//!
//! # async fn run() -> polysource::Result<()> {
//! let index = Arc::new(MemoryIndex::new());
//! index.upsert_track(IndexedTrack::new("primary", "Music/a.flac", "A"));
//!
//! let stats = StatsStore::new(Database::open_in_memory()?);
//! let internal = StorageVolume::new(None, "Internal", "/sdcard", VolumeState::Mounted, true);
//! let (_volumes_tx, volumes) = watch::channel(vec![internal]);
//! let library = Arc::new(LocalLibrary::new(index, stats, volumes));
//!
//! let backend = LocalBackend::undivided(library);
//! let tracks = first(backend.audios(SortingRule::default())).await?;
//! assert_eq!(tracks.len(), 1);
//! # Ok(())
//! # }
//! ```

mod backend;
mod index;
mod library;
mod snapshot;
mod volume;

pub use backend::LocalBackend;
pub use index::{IndexedPlaylist, IndexedTrack, LocalIndex, MemoryIndex};
pub use library::LocalLibrary;
pub use volume::{
    PRIMARY_VOLUME, StorageVolume, UNDIVIDED_INSTANCE_ID, VolumeState, volume_instance_id,
};

/// Identifier scheme of local items
pub const LOCAL_SCHEME: &str = snapshot::SCHEME;
