//! MediaBackend over the local library

use crate::library::LocalLibrary;
use crate::snapshot::{ALL_VOLUMES, FAVORITES_KEY, SCHEME, Snapshot};
use chrono::Utc;
use polysource::{
    Activity, Album, AlbumDetail, Artist, ArtistDetail, Audio, BackendKind, DiagnosticField,
    Genre, GenreDetail, Identifier, LiveStream, MediaBackend, MediaError, MediaItem, MediaKind,
    Playlist, PlaylistDetail, PlaylistMembership, Result, SortStrategy, SortingRule, async_trait,
};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Number of entries in each activity list
const ACTIVITY_LIMIT: usize = 20;

/// Local provider, either undivided or restricted to one volume
#[derive(Debug, Clone)]
pub struct LocalBackend {
    library: Arc<LocalLibrary>,
    volume: Option<String>,
}

impl LocalBackend {
    /// Backend over every volume
    pub fn undivided(library: Arc<LocalLibrary>) -> Self {
        Self {
            library,
            volume: None,
        }
    }

    /// Backend over a single volume, by backend name
    pub fn for_volume(library: Arc<LocalLibrary>, volume: impl Into<String>) -> Self {
        Self {
            library,
            volume: Some(volume.into()),
        }
    }

    pub fn volume(&self) -> Option<&str> {
        self.volume.as_deref()
    }

    pub fn library(&self) -> &Arc<LocalLibrary> {
        &self.library
    }

    fn authority(&self) -> &str {
        self.volume.as_deref().unwrap_or(ALL_VOLUMES)
    }

    /// Kind of a local identifier if this backend owns it
    fn owned_kind(&self, id: &Identifier) -> Option<MediaKind> {
        let parts = id.parts_for(SCHEME)?;
        let owned = match (parts.kind, self.volume.as_deref()) {
            (MediaKind::Audio, Some(volume)) => parts.authority == volume,
            (MediaKind::Audio, None) => parts.authority != ALL_VOLUMES,
            (_, _) => parts.authority == self.authority(),
        };
        owned.then_some(parts.kind)
    }

    fn require(&self, id: &Identifier, kind: MediaKind) -> Result<()> {
        match self.owned_kind(id) {
            Some(k) if k == kind => Ok(()),
            _ => Err(MediaError::not_found(id)),
        }
    }

    /// Volumes this backend shows: its own, or every one that can be read
    fn visible_volumes(&self) -> HashSet<String> {
        let mut readable = self.library.readable_volumes();
        if let Some(volume) = &self.volume {
            readable.retain(|v| v == volume);
        }
        readable
    }

    async fn snapshot(&self) -> Result<Snapshot> {
        let visible = self.visible_volumes();
        let mut tracks = self.library.index().tracks().await?;
        tracks.retain(|t| visible.contains(&t.volume));
        let favorites: HashSet<Identifier> = self
            .library
            .stats()
            .favorites()?
            .into_iter()
            .map(|s| s.identifier)
            .collect();
        Ok(Snapshot::new(self.authority(), tracks, &favorites))
    }

    async fn playlist_details(&self, snapshot: &Snapshot) -> Result<Vec<PlaylistDetail>> {
        let visible = self.visible_volumes();
        let mut playlists = self.library.index().playlists().await?;
        playlists.retain(|p| visible.contains(&p.volume));
        Ok(snapshot.playlist_details(&playlists))
    }

    fn play_counts(&self) -> Result<HashMap<Identifier, u32>> {
        Ok(self
            .library
            .stats()
            .all()?
            .into_iter()
            .map(|s| (s.identifier, s.play_count))
            .collect())
    }

    /// Stats rows mapped back to tracks of the snapshot, dropping the others
    fn resolve_stats(snapshot: &Snapshot, ids: Vec<polydb::LocalStats>) -> Vec<Audio> {
        ids.into_iter()
            .filter_map(|s| snapshot.audio(&s.identifier))
            .collect()
    }

    /// Live query re-run on every library change
    fn query<T, F, Fut>(&self, f: F) -> LiveStream<T>
    where
        T: Send + 'static,
        F: Fn(LocalBackend) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let this = self.clone();
        self.library.live(move || f(this.clone()))
    }

    fn favorites_playlist(&self, playlist: &Identifier) -> Result<()> {
        self.require(playlist, MediaKind::Playlist)?;
        match playlist.parts() {
            Some(parts) if parts.key == FAVORITES_KEY => Ok(()),
            _ => Err(MediaError::not_implemented("local playlists are read-only")),
        }
    }
}

#[async_trait]
impl MediaBackend for LocalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn identify(&self, id: &Identifier) -> Option<MediaKind> {
        self.owned_kind(id)
    }

    fn status(&self) -> LiveStream<Vec<DiagnosticField>> {
        self.query(|this| async move {
            let snapshot = this.snapshot().await?;
            let tracker = this.library.tracker();
            let scope = match this.library.volume(this.authority()) {
                Some(volume) => volume.description,
                None => "All volumes".to_string(),
            };
            let mut fields = vec![
                DiagnosticField::new("Backend", "Local"),
                DiagnosticField::new("Scope", scope),
                DiagnosticField::new("Tracks", snapshot.audios().len().to_string()),
                DiagnosticField::new("Albums", snapshot.albums().len().to_string()),
                DiagnosticField::new("Update id", tracker.update_id().to_string()),
            ];
            if let Some(changed) = tracker.last_change() {
                let changed: chrono::DateTime<Utc> = changed.into();
                fields.push(DiagnosticField::new("Last change", changed.to_rfc3339()));
            }
            Ok(fields)
        })
    }

    fn audios(&self, rule: SortingRule) -> LiveStream<Vec<Audio>> {
        self.query(move |this| async move {
            let snapshot = this.snapshot().await?;
            let counts = match rule.strategy {
                SortStrategy::PlayCount => this.play_counts()?,
                _ => HashMap::new(),
            };
            Ok(snapshot.sorted_audios(rule, &counts))
        })
    }

    fn albums(&self, rule: SortingRule) -> LiveStream<Vec<Album>> {
        self.query(move |this| async move {
            let snapshot = this.snapshot().await?;
            let albums = match rule.strategy {
                SortStrategy::Added => {
                    let mut albums = snapshot.recently_added_albums(usize::MAX);
                    if rule.reverse {
                        albums.reverse();
                    }
                    albums
                }
                _ => {
                    let mut albums = snapshot.albums();
                    rule.apply(&mut albums);
                    albums
                }
            };
            Ok(albums)
        })
    }

    fn artists(&self, rule: SortingRule) -> LiveStream<Vec<Artist>> {
        self.query(move |this| async move {
            let mut artists = this.snapshot().await?.artists();
            rule.apply(&mut artists);
            Ok(artists)
        })
    }

    fn genres(&self, rule: SortingRule) -> LiveStream<Vec<Genre>> {
        self.query(move |this| async move {
            let mut genres = this.snapshot().await?.genres();
            rule.apply(&mut genres);
            Ok(genres)
        })
    }

    fn playlists(&self, rule: SortingRule) -> LiveStream<Vec<Playlist>> {
        self.query(move |this| async move {
            let snapshot = this.snapshot().await?;
            let mut playlists: Vec<Playlist> = this
                .playlist_details(&snapshot)
                .await?
                .into_iter()
                .map(|d| d.playlist)
                .collect();
            rule.apply(&mut playlists);
            Ok(playlists)
        })
    }

    fn audio(&self, id: &Identifier) -> LiveStream<Audio> {
        let id = id.clone();
        self.query(move |this| {
            let id = id.clone();
            async move {
                this.require(&id, MediaKind::Audio)?;
                this.snapshot()
                    .await?
                    .audio(&id)
                    .ok_or_else(|| MediaError::not_found(&id))
            }
        })
    }

    fn album(&self, id: &Identifier) -> LiveStream<AlbumDetail> {
        let id = id.clone();
        self.query(move |this| {
            let id = id.clone();
            async move {
                this.require(&id, MediaKind::Album)?;
                this.snapshot()
                    .await?
                    .album(&id)
                    .ok_or_else(|| MediaError::not_found(&id))
            }
        })
    }

    fn artist(&self, id: &Identifier) -> LiveStream<ArtistDetail> {
        let id = id.clone();
        self.query(move |this| {
            let id = id.clone();
            async move {
                this.require(&id, MediaKind::Artist)?;
                this.snapshot()
                    .await?
                    .artist(&id)
                    .ok_or_else(|| MediaError::not_found(&id))
            }
        })
    }

    fn genre(&self, id: &Identifier) -> LiveStream<GenreDetail> {
        let id = id.clone();
        self.query(move |this| {
            let id = id.clone();
            async move {
                this.require(&id, MediaKind::Genre)?;
                this.snapshot()
                    .await?
                    .genre(&id)
                    .ok_or_else(|| MediaError::not_found(&id))
            }
        })
    }

    fn playlist(&self, id: &Identifier) -> LiveStream<PlaylistDetail> {
        let id = id.clone();
        self.query(move |this| {
            let id = id.clone();
            async move {
                this.require(&id, MediaKind::Playlist)?;
                let snapshot = this.snapshot().await?;
                this.playlist_details(&snapshot)
                    .await?
                    .into_iter()
                    .find(|d| d.playlist.id == id)
                    .ok_or_else(|| MediaError::not_found(&id))
            }
        })
    }

    fn lyrics(&self, id: &Identifier) -> LiveStream<Option<String>> {
        let id = id.clone();
        self.query(move |this| {
            let id = id.clone();
            async move {
                this.require(&id, MediaKind::Audio)?;
                let snapshot = this.snapshot().await?;
                let track = snapshot.track(&id).ok_or_else(|| MediaError::not_found(&id))?;
                Ok(track.lyrics.clone())
            }
        })
    }

    fn audio_playlists_status(&self, id: &Identifier) -> LiveStream<Vec<PlaylistMembership>> {
        let id = id.clone();
        self.query(move |this| {
            let id = id.clone();
            async move {
                this.require(&id, MediaKind::Audio)?;
                let snapshot = this.snapshot().await?;
                Ok(this
                    .playlist_details(&snapshot)
                    .await?
                    .into_iter()
                    .map(|d| PlaylistMembership {
                        contains: d.tracks.iter().any(|t| t.id == id),
                        playlist: d.playlist,
                    })
                    .collect())
            }
        })
    }

    async fn stream_uri(&self, id: &Identifier) -> Result<String> {
        self.require(id, MediaKind::Audio)?;
        let parts = id.parts().ok_or_else(|| MediaError::not_found(id))?;
        let volume = self
            .library
            .volume(parts.authority)
            .filter(|v| v.state.is_readable())
            .ok_or_else(|| MediaError::not_found(format!("volume {}", parts.authority)))?;
        Ok(format!("file://{}", volume.resolve(parts.key).display()))
    }

    fn search(&self, query: &str) -> LiveStream<Vec<MediaItem>> {
        let query = query.to_string();
        self.query(move |this| {
            let query = query.clone();
            async move {
                let (artists, albums, audios) = this.snapshot().await?.search(&query);
                Ok(artists
                    .into_iter()
                    .map(MediaItem::Artist)
                    .chain(albums.into_iter().map(MediaItem::Album))
                    .chain(audios.into_iter().map(MediaItem::Audio))
                    .collect())
            }
        })
    }

    fn activity(&self) -> LiveStream<Activity> {
        self.query(|this| async move {
            let snapshot = this.snapshot().await?;
            let stats = this.library.stats();
            Ok(Activity {
                recently_played: Self::resolve_stats(
                    &snapshot,
                    stats.recently_played(ACTIVITY_LIMIT)?,
                ),
                most_played: Self::resolve_stats(&snapshot, stats.most_played(ACTIVITY_LIMIT)?),
                recently_added: snapshot.recently_added_albums(ACTIVITY_LIMIT),
            })
        })
    }

    async fn add_audio_to_playlist(&self, playlist: &Identifier, audio: &Identifier) -> Result<()> {
        self.favorites_playlist(playlist)?;
        self.set_favorite(audio, true).await
    }

    async fn remove_audio_from_playlist(
        &self,
        playlist: &Identifier,
        audio: &Identifier,
    ) -> Result<()> {
        self.favorites_playlist(playlist)?;
        self.set_favorite(audio, false).await
    }

    async fn set_favorite(&self, id: &Identifier, favorite: bool) -> Result<()> {
        match self.owned_kind(id) {
            Some(MediaKind::Audio) => {}
            Some(kind) => {
                return Err(MediaError::not_implemented(format!(
                    "favorite {} on local library",
                    kind
                )));
            }
            None => return Err(MediaError::not_found(id)),
        }
        self.library.stats().set_favorite(id, favorite)?;
        debug!(id=%id, favorite, "Local favorite updated");
        self.library.notify_changed();
        Ok(())
    }

    async fn notify_played(&self, id: &Identifier) -> Result<()> {
        self.require(id, MediaKind::Audio)?;
        self.library.stats().record_played(id, Utc::now())?;
        debug!(id=%id, "Local play recorded");
        self.library.notify_changed();
        Ok(())
    }
}
