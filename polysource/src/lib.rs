//! # PolySource
//!
//! Common traits and types for Polyphon media backends.
//!
//! This crate provides the foundational abstractions shared by the local
//! index backend and the remote protocol backends (`polysubsonic`,
//! `polyjellyfin`), and consumed by the aggregator in `polycore`.
//!
//! ## Features
//!
//! - **Identifiers**: backend-namespaced [`Identifier`]s and
//!   [`ProviderIdentifier`]s with a stable ordering.
//! - **Media model**: albums, artists, tracks, genres, playlists.
//! - **Live streams**: every query re-emits when the backing data changes
//!   ([`ChangeTracker`], [`LiveStream`]).
//! - **Switch-latest**: [`switch_latest`] follows a changing upstream and
//!   cancels superseded subscriptions.
//! - **Send + Sync**: ready for async services.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use polysource::{MediaBackend, SortingRule};
//! use futures::StreamExt;
//!
//! let mut albums = backend.albums(SortingRule::default());
//! while let Some(result) = albums.next().await {
//!     match result {
//!         Ok(albums) => println!("{} albums", albums.len()),
//!         Err(e) => eprintln!("backend degraded: {}", e),
//!     }
//! }
//! ```

pub mod dummy;
pub mod error;
pub mod identifier;
pub mod live;
pub mod model;

use futures::StreamExt;
use std::fmt::Debug;

pub use dummy::DummyBackend;
pub use error::{MediaError, Result};
pub use identifier::{
    BackendKind, Identifier, IdentifierParts, MediaKind, Provider, ProviderIdentifier,
};
pub use live::{ChangeSignal, ChangeTracker, LiveStream, first, live_from, once, switch_latest};
pub use model::*;

// Re-export commonly used types
pub use async_trait::async_trait;

/// Main trait for media backends
///
/// This trait defines the capability interface every backend kind
/// implements. It provides methods for:
/// - Probing identifier ownership ([`identify`](MediaBackend::identify))
/// - Querying collections (albums, artists, genres, playlists, tracks)
/// - Resolving single items by identifier
/// - Mutating playlists, favorites and play statistics
///
/// Every query returns a [`LiveStream`]: results are re-emitted when the
/// backing data changes, and failures are emitted as `Err` items rather
/// than ending the stream. Every successful mutation must make active
/// streams of the same backend re-emit; there is no separate
/// invalidation call.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`.
#[async_trait]
pub trait MediaBackend: Debug + Send + Sync {
    // ============= Identity =============

    /// Kind of this backend
    fn kind(&self) -> BackendKind;

    /// Does this backend own `id`, and if so what kind of item is it
    ///
    /// Must be side-effect free: the aggregator calls it speculatively on
    /// every backend of the catalog.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let id = Identifier::new("subsonic://3/album/al-12");
    /// assert_eq!(backend.identify(&id).await, Some(MediaKind::Album));
    /// ```
    async fn identify(&self, id: &Identifier) -> Option<MediaKind>;

    /// Human-readable health and version information
    fn status(&self) -> LiveStream<Vec<DiagnosticField>>;

    // ============= Collections =============

    /// Every track of the backend
    fn audios(&self, rule: SortingRule) -> LiveStream<Vec<Audio>>;

    /// Albums owning at least one track
    fn albums(&self, rule: SortingRule) -> LiveStream<Vec<Album>>;

    /// Artists owning at least one track
    fn artists(&self, rule: SortingRule) -> LiveStream<Vec<Artist>>;

    /// Genres owning at least one track
    fn genres(&self, rule: SortingRule) -> LiveStream<Vec<Genre>>;

    /// Playlists, possibly empty ones
    fn playlists(&self, rule: SortingRule) -> LiveStream<Vec<Playlist>>;

    /// Collection query by kind
    ///
    /// Dispatches to the typed collection methods.
    fn collection(&self, kind: MediaKind, rule: SortingRule) -> LiveStream<Vec<MediaItem>> {
        fn wrap<T, F>(stream: LiveStream<Vec<T>>, f: F) -> LiveStream<Vec<MediaItem>>
        where
            T: Send + 'static,
            F: Fn(T) -> MediaItem + Send + Sync + 'static,
        {
            stream
                .map(move |result| result.map(|items| items.into_iter().map(&f).collect()))
                .boxed()
        }

        match kind {
            MediaKind::Audio => wrap(self.audios(rule), MediaItem::Audio),
            MediaKind::Album => wrap(self.albums(rule), MediaItem::Album),
            MediaKind::Artist => wrap(self.artists(rule), MediaItem::Artist),
            MediaKind::Genre => wrap(self.genres(rule), MediaItem::Genre),
            MediaKind::Playlist => wrap(self.playlists(rule), MediaItem::Playlist),
        }
    }

    // ============= Single items =============

    fn audio(&self, id: &Identifier) -> LiveStream<Audio>;

    /// Album with its tracks
    fn album(&self, id: &Identifier) -> LiveStream<AlbumDetail>;

    /// Artist with its albums
    fn artist(&self, id: &Identifier) -> LiveStream<ArtistDetail>;

    /// Genre with its tracks
    fn genre(&self, id: &Identifier) -> LiveStream<GenreDetail>;

    /// Playlist with its tracks
    fn playlist(&self, id: &Identifier) -> LiveStream<PlaylistDetail>;

    /// Single-item lookup by kind, without related children
    fn item(&self, kind: MediaKind, id: &Identifier) -> LiveStream<MediaItem> {
        match kind {
            MediaKind::Audio => self.audio(id).map(|r| r.map(MediaItem::Audio)).boxed(),
            MediaKind::Album => self
                .album(id)
                .map(|r| r.map(|d| MediaItem::Album(d.album)))
                .boxed(),
            MediaKind::Artist => self
                .artist(id)
                .map(|r| r.map(|d| MediaItem::Artist(d.artist)))
                .boxed(),
            MediaKind::Genre => self
                .genre(id)
                .map(|r| r.map(|d| MediaItem::Genre(d.genre)))
                .boxed(),
            MediaKind::Playlist => self
                .playlist(id)
                .map(|r| r.map(|d| MediaItem::Playlist(d.playlist)))
                .boxed(),
        }
    }

    /// Lyrics of a track, `None` when the backend has none
    fn lyrics(&self, id: &Identifier) -> LiveStream<Option<String>>;

    /// Every playlist of the backend, flagged with whether it contains `id`
    fn audio_playlists_status(&self, id: &Identifier) -> LiveStream<Vec<PlaylistMembership>>;

    /// Resolve the URI the player should open for a track
    ///
    /// Local tracks resolve to a `file://` URI, remote tracks to an
    /// authenticated streaming URL.
    async fn stream_uri(&self, id: &Identifier) -> Result<String>;

    // ============= Search & activity =============

    /// Full-text search over the backend
    fn search(&self, query: &str) -> LiveStream<Vec<MediaItem>>;

    /// Recently played, most played and recently added content
    fn activity(&self) -> LiveStream<Activity>;

    // ============= Mutations =============

    /// Create an empty playlist and return its identifier
    ///
    /// # Errors
    ///
    /// Returns `MediaError::NotImplemented` if playlists are read-only.
    async fn create_playlist(&self, name: &str) -> Result<Identifier> {
        let _ = name;
        Err(MediaError::not_implemented("create_playlist"))
    }

    async fn rename_playlist(&self, playlist: &Identifier, name: &str) -> Result<()> {
        let _ = (playlist, name);
        Err(MediaError::not_implemented("rename_playlist"))
    }

    async fn delete_playlist(&self, playlist: &Identifier) -> Result<()> {
        let _ = playlist;
        Err(MediaError::not_implemented("delete_playlist"))
    }

    /// Append a track to a playlist
    async fn add_audio_to_playlist(&self, playlist: &Identifier, audio: &Identifier) -> Result<()> {
        let _ = (playlist, audio);
        Err(MediaError::not_implemented("add_audio_to_playlist"))
    }

    /// Remove every occurrence of a track from a playlist
    async fn remove_audio_from_playlist(
        &self,
        playlist: &Identifier,
        audio: &Identifier,
    ) -> Result<()> {
        let _ = (playlist, audio);
        Err(MediaError::not_implemented("remove_audio_from_playlist"))
    }

    /// Mark or unmark an item as favorite
    async fn set_favorite(&self, id: &Identifier, favorite: bool) -> Result<()> {
        let _ = (id, favorite);
        Err(MediaError::not_implemented("set_favorite"))
    }

    /// Record that a track has been played
    async fn notify_played(&self, id: &Identifier) -> Result<()> {
        let _ = id;
        Err(MediaError::not_implemented("notify_played"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct TestBackend;

    fn track() -> Audio {
        Audio::new(Identifier::new("test://0/audio/1"), "Track")
    }

    #[async_trait]
    impl MediaBackend for TestBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Local
        }

        async fn identify(&self, id: &Identifier) -> Option<MediaKind> {
            id.parts_for("test").map(|p| p.kind)
        }

        fn status(&self) -> LiveStream<Vec<DiagnosticField>> {
            once(Ok(vec![DiagnosticField::new("Backend", "test")]))
        }

        fn audios(&self, _rule: SortingRule) -> LiveStream<Vec<Audio>> {
            once(Ok(vec![track()]))
        }

        fn albums(&self, _rule: SortingRule) -> LiveStream<Vec<Album>> {
            once(Ok(vec![]))
        }

        fn artists(&self, _rule: SortingRule) -> LiveStream<Vec<Artist>> {
            once(Ok(vec![]))
        }

        fn genres(&self, _rule: SortingRule) -> LiveStream<Vec<Genre>> {
            once(Ok(vec![]))
        }

        fn playlists(&self, _rule: SortingRule) -> LiveStream<Vec<Playlist>> {
            once(Ok(vec![]))
        }

        fn audio(&self, _id: &Identifier) -> LiveStream<Audio> {
            once(Ok(track()))
        }

        fn album(&self, id: &Identifier) -> LiveStream<AlbumDetail> {
            once(Err(MediaError::not_found(id)))
        }

        fn artist(&self, id: &Identifier) -> LiveStream<ArtistDetail> {
            once(Err(MediaError::not_found(id)))
        }

        fn genre(&self, id: &Identifier) -> LiveStream<GenreDetail> {
            once(Err(MediaError::not_found(id)))
        }

        fn playlist(&self, id: &Identifier) -> LiveStream<PlaylistDetail> {
            once(Err(MediaError::not_found(id)))
        }

        fn lyrics(&self, _id: &Identifier) -> LiveStream<Option<String>> {
            once(Ok(None))
        }

        fn audio_playlists_status(&self, _id: &Identifier) -> LiveStream<Vec<PlaylistMembership>> {
            once(Ok(vec![]))
        }

        async fn stream_uri(&self, id: &Identifier) -> Result<String> {
            Ok(format!("http://example.com/{}", id))
        }

        fn search(&self, _query: &str) -> LiveStream<Vec<MediaItem>> {
            once(Ok(vec![]))
        }

        fn activity(&self) -> LiveStream<Activity> {
            once(Ok(Activity::default()))
        }
    }

    #[tokio::test]
    async fn test_identify() {
        let backend = TestBackend;
        assert_eq!(
            backend.identify(&Identifier::new("test://0/album/a")).await,
            Some(MediaKind::Album)
        );
        assert_eq!(backend.identify(&Identifier::new("other://0/album/a")).await, None);
    }

    #[tokio::test]
    async fn test_collection_dispatch() {
        let backend = TestBackend;
        let items = first(backend.collection(MediaKind::Audio, SortingRule::default()))
            .await
            .unwrap();
        assert_eq!(items, vec![MediaItem::Audio(track())]);
    }

    #[tokio::test]
    async fn test_item_dispatch() {
        let backend = TestBackend;
        let item = first(backend.item(MediaKind::Audio, &"test://0/audio/1".into()))
            .await
            .unwrap();
        assert_eq!(item.kind(), MediaKind::Audio);

        let missing = first(backend.item(MediaKind::Album, &"test://0/album/x".into())).await;
        assert!(matches!(missing, Err(MediaError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_mutations_default_to_not_implemented() {
        let backend = TestBackend;
        let id = Identifier::new("test://0/audio/1");
        assert!(matches!(
            backend.notify_played(&id).await,
            Err(MediaError::NotImplemented(_))
        ));
        assert!(matches!(
            backend.add_audio_to_playlist(&id, &id).await,
            Err(MediaError::NotImplemented(_))
        ));
    }
}
