//! Implémentation de [`MediaBackend`] pour un serveur Jellyfin

use crate::FAVORITES_KEY;
use crate::SCHEME;
use crate::api::library::{ItemQuery, item_type};
use crate::api::{JellyfinApi, JellyfinSettings};
use crate::config_ext::DEFAULT_PAGE_SIZE;
use crate::error::JellyfinError;
use crate::models::BaseItem;
use polysource::{
    Activity, Album, AlbumDetail, Artist, ArtistDetail, Audio, BackendKind, ChangeTracker,
    DiagnosticField, Genre, GenreDetail, Identifier, LiveStream, MediaBackend, MediaError,
    MediaItem, MediaKind, Playlist, PlaylistDetail, PlaylistMembership, Result, SortStrategy,
    SortingRule, async_trait,
};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};

/// Nombre d'éléments par liste d'activité
const ACTIVITY_LIMIT: usize = 20;

/// Nombre maximal de résultats de recherche
const SEARCH_LIMIT: usize = 60;

/// Types renvoyés par la recherche
const SEARCH_TYPES: &str = "MusicArtist,MusicAlbum,Audio";

/// Type Jellyfin attendu pour un type d'élément
fn expected_type(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Audio => item_type::AUDIO,
        MediaKind::Album => item_type::ALBUM,
        MediaKind::Artist => item_type::ARTIST,
        MediaKind::Genre => item_type::GENRE,
        MediaKind::Playlist => item_type::PLAYLIST,
    }
}

/// Tri serveur correspondant à une règle
///
/// Retourne aussi si la règle doit être réappliquée localement.
fn server_sort(rule: SortingRule) -> (&'static str, bool, bool) {
    match rule.strategy {
        SortStrategy::Title => ("SortName", false, true),
        SortStrategy::Artist => ("AlbumArtist,SortName", false, true),
        SortStrategy::Year => ("ProductionYear,SortName", false, true),
        SortStrategy::Added => ("DateCreated,SortName", !rule.reverse, false),
        SortStrategy::PlayCount => ("PlayCount,SortName", !rule.reverse, false),
    }
}

/// Backend Jellyfin
///
/// Les clones partagent le client HTTP, la session et le compteur de
/// changements.
#[derive(Debug, Clone)]
pub struct JellyfinBackend {
    instance_id: i64,
    authority: String,
    api: Arc<JellyfinApi>,
    tracker: Arc<ChangeTracker>,
    page_size: usize,
}

impl JellyfinBackend {
    /// Crée un backend pour l'enregistrement serveur `instance_id`
    ///
    /// Aucune connexion n'est ouverte avant la première requête.
    pub fn new(instance_id: i64, api: JellyfinApi) -> Self {
        Self {
            instance_id,
            authority: instance_id.to_string(),
            api: Arc::new(api),
            tracker: Arc::new(ChangeTracker::new()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn from_settings(instance_id: i64, settings: JellyfinSettings) -> crate::Result<Self> {
        Ok(Self::new(instance_id, JellyfinApi::new(settings)?))
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn instance_id(&self) -> i64 {
        self.instance_id
    }

    pub fn api(&self) -> &JellyfinApi {
        &self.api
    }

    pub(crate) fn authority(&self) -> &str {
        &self.authority
    }

    fn remote_id<'a>(&self, id: &'a Identifier, kind: MediaKind) -> Result<&'a str> {
        match id.parts_for(SCHEME) {
            Some(parts) if parts.authority == self.authority && parts.kind == kind => {
                Ok(parts.key)
            }
            _ => Err(MediaError::not_found(id)),
        }
    }

    /// Identifiant serveur d'une playlist, `None` pour la pseudo-playlist
    fn playlist_key<'a>(&self, id: &'a Identifier) -> Result<Option<&'a str>> {
        let key = self.remote_id(id, MediaKind::Playlist)?;
        Ok((key != FAVORITES_KEY).then_some(key))
    }

    fn query<T, F, Fut>(&self, f: F) -> LiveStream<T>
    where
        T: Send + 'static,
        F: Fn(JellyfinBackend) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let this = self.clone();
        self.tracker.live(move || f(this.clone()))
    }

    fn changed(&self) {
        self.tracker.bump();
    }

    /// Élément de ce backend, vérifié contre le type attendu
    async fn typed_item(&self, id: &Identifier, kind: MediaKind) -> Result<BaseItem> {
        let key = self.remote_id(id, kind)?;
        let item = self.api.get_item(key).await?;
        match item.item_type.as_deref() {
            Some(t) if t == expected_type(kind) => Ok(item),
            _ => Err(MediaError::not_found(id)),
        }
    }

    async fn all(&self, query: ItemQuery) -> Result<Vec<BaseItem>> {
        Ok(self.api.get_all_items(&query, self.page_size).await?)
    }

    async fn favorite_songs(&self) -> Result<Vec<BaseItem>> {
        self.all(
            ItemQuery::of_type(item_type::AUDIO)
                .favorites()
                .sort("SortName", false),
        )
        .await
    }

    async fn favorites_count(&self) -> Result<u32> {
        let page = self
            .api
            .get_items(&ItemQuery::of_type(item_type::AUDIO).favorites().limit(0))
            .await?;
        Ok(page.total_record_count)
    }

    async fn server_playlists(&self) -> Result<Vec<BaseItem>> {
        self.all(ItemQuery::of_type(item_type::PLAYLIST).sort("SortName", false))
            .await
    }

    async fn sorted<T: polysource::Sortable>(
        &self,
        item_type: &'static str,
        rule: SortingRule,
        convert: impl Fn(&Self, &BaseItem) -> T,
        keep: impl Fn(&BaseItem) -> bool,
    ) -> Result<Vec<T>> {
        let (sort_by, descending, local) = server_sort(rule);
        let items = self
            .all(ItemQuery::of_type(item_type).sort(sort_by, descending))
            .await?;
        let mut converted: Vec<T> = items
            .iter()
            .filter(|i| keep(*i))
            .map(|i| convert(self, i))
            .collect();
        if local {
            rule.apply(&mut converted);
        }
        Ok(converted)
    }
}

#[async_trait]
impl MediaBackend for JellyfinBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Jellyfin
    }

    async fn identify(&self, id: &Identifier) -> Option<MediaKind> {
        id.parts_for(SCHEME)
            .filter(|p| p.authority == self.authority)
            .map(|p| p.kind)
    }

    fn status(&self) -> LiveStream<Vec<DiagnosticField>> {
        self.query(|this| async move {
            let info = this.api.system_info().await?;
            let session = this.api.session().await?;
            let mut fields = vec![
                DiagnosticField::new("Backend", "Jellyfin"),
                DiagnosticField::new("Server", this.api.base_url()),
            ];
            if let Some(name) = info.server_name {
                fields.push(DiagnosticField::new("Server name", name));
            }
            if let Some(product) = info.product_name {
                fields.push(DiagnosticField::new("Product", product));
            }
            if let Some(version) = info.version {
                fields.push(DiagnosticField::new("Version", version));
            }
            fields.push(DiagnosticField::new("User", this.api.username()));
            fields.push(DiagnosticField::new("User id", session.user_id));
            Ok(fields)
        })
    }

    fn audios(&self, rule: SortingRule) -> LiveStream<Vec<Audio>> {
        self.query(move |this| async move {
            this.sorted(item_type::AUDIO, rule, Self::to_audio, |_| true)
                .await
        })
    }

    fn albums(&self, rule: SortingRule) -> LiveStream<Vec<Album>> {
        self.query(move |this| async move {
            this.sorted(item_type::ALBUM, rule, Self::to_album, |a| {
                a.child_count != Some(0)
            })
            .await
        })
    }

    fn artists(&self, rule: SortingRule) -> LiveStream<Vec<Artist>> {
        self.query(move |this| async move {
            let mut artists: Vec<Artist> = this
                .api
                .get_album_artists()
                .await?
                .iter()
                .map(|a| this.to_artist(a))
                .collect();
            rule.apply(&mut artists);
            Ok(artists)
        })
    }

    fn genres(&self, rule: SortingRule) -> LiveStream<Vec<Genre>> {
        self.query(move |this| async move {
            let mut genres: Vec<Genre> = this
                .api
                .get_music_genres()
                .await?
                .iter()
                .filter(|g| g.song_count != Some(0))
                .map(|g| this.to_genre(g))
                .collect();
            rule.apply(&mut genres);
            Ok(genres)
        })
    }

    fn playlists(&self, rule: SortingRule) -> LiveStream<Vec<Playlist>> {
        self.query(move |this| async move {
            let mut playlists = vec![this.favorites_playlist(this.favorites_count().await?)];
            playlists.extend(
                this.server_playlists()
                    .await?
                    .iter()
                    .map(|p| this.to_playlist(p)),
            );
            rule.apply(&mut playlists);
            Ok(playlists)
        })
    }

    fn audio(&self, id: &Identifier) -> LiveStream<Audio> {
        let id = id.clone();
        self.query(move |this| {
            let id = id.clone();
            async move {
                let item = this.typed_item(&id, MediaKind::Audio).await?;
                Ok(this.to_audio(&item))
            }
        })
    }

    fn album(&self, id: &Identifier) -> LiveStream<AlbumDetail> {
        let id = id.clone();
        self.query(move |this| {
            let id = id.clone();
            async move {
                let album = this.typed_item(&id, MediaKind::Album).await?;
                let tracks = this
                    .all(
                        ItemQuery::of_type(item_type::AUDIO)
                            .parent(album.id.clone())
                            .sort("ParentIndexNumber,IndexNumber,SortName", false),
                    )
                    .await?;
                Ok(AlbumDetail {
                    album: this.to_album(&album),
                    tracks: this.to_audios(&tracks),
                })
            }
        })
    }

    fn artist(&self, id: &Identifier) -> LiveStream<ArtistDetail> {
        let id = id.clone();
        self.query(move |this| {
            let id = id.clone();
            async move {
                let artist = this.typed_item(&id, MediaKind::Artist).await?;
                let albums = this
                    .all(
                        ItemQuery::of_type(item_type::ALBUM)
                            .artist(artist.id.clone())
                            .sort("ProductionYear,SortName", false),
                    )
                    .await?;
                Ok(ArtistDetail {
                    artist: this.to_artist(&artist),
                    albums: albums.iter().map(|a| this.to_album(a)).collect(),
                })
            }
        })
    }

    fn genre(&self, id: &Identifier) -> LiveStream<GenreDetail> {
        let id = id.clone();
        self.query(move |this| {
            let id = id.clone();
            async move {
                let genre = this.typed_item(&id, MediaKind::Genre).await?;
                let tracks = this
                    .all(
                        ItemQuery::of_type(item_type::AUDIO)
                            .genre(genre.id.clone())
                            .sort("SortName", false),
                    )
                    .await?;
                Ok(GenreDetail {
                    genre: this.to_genre(&genre),
                    tracks: this.to_audios(&tracks),
                })
            }
        })
    }

    fn playlist(&self, id: &Identifier) -> LiveStream<PlaylistDetail> {
        let id = id.clone();
        self.query(move |this| {
            let id = id.clone();
            async move {
                if this.playlist_key(&id)?.is_none() {
                    let songs = this.favorite_songs().await?;
                    return Ok(PlaylistDetail {
                        playlist: this.favorites_playlist(songs.len() as u32),
                        tracks: this.to_audios(&songs),
                    });
                }
                let playlist = this.typed_item(&id, MediaKind::Playlist).await?;
                let entries = this.api.get_playlist_items(&playlist.id).await?;
                let mut playlist = this.to_playlist(&playlist);
                playlist.track_count = entries.len() as u32;
                Ok(PlaylistDetail {
                    playlist,
                    tracks: this.to_audios(&entries),
                })
            }
        })
    }

    fn lyrics(&self, id: &Identifier) -> LiveStream<Option<String>> {
        let id = id.clone();
        self.query(move |this| {
            let id = id.clone();
            async move {
                let key = this.remote_id(&id, MediaKind::Audio)?;
                match this.api.get_lyrics(key).await {
                    Ok(lyrics) => Ok(lyrics.text()),
                    Err(JellyfinError::NotFound(_)) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            }
        })
    }

    fn audio_playlists_status(&self, id: &Identifier) -> LiveStream<Vec<PlaylistMembership>> {
        let id = id.clone();
        self.query(move |this| {
            let id = id.clone();
            async move {
                let audio = this.typed_item(&id, MediaKind::Audio).await?;
                let mut memberships = vec![PlaylistMembership {
                    playlist: this.favorites_playlist(this.favorites_count().await?),
                    contains: audio.is_favorite(),
                }];
                for playlist in this.server_playlists().await? {
                    let entries = this.api.get_playlist_items(&playlist.id).await?;
                    memberships.push(PlaylistMembership {
                        playlist: this.to_playlist(&playlist),
                        contains: entries.iter().any(|e| e.id == audio.id),
                    });
                }
                Ok(memberships)
            }
        })
    }

    async fn stream_uri(&self, id: &Identifier) -> Result<String> {
        let key = self.remote_id(id, MediaKind::Audio)?;
        Ok(self.api.stream_url(key).await?)
    }

    fn search(&self, query: &str) -> LiveStream<Vec<MediaItem>> {
        let query = query.trim().to_string();
        self.query(move |this| {
            let query = query.clone();
            async move {
                if query.is_empty() {
                    return Ok(Vec::new());
                }
                let result = this
                    .api
                    .get_items(
                        &ItemQuery::of_type(SEARCH_TYPES)
                            .search(query.clone())
                            .limit(SEARCH_LIMIT),
                    )
                    .await?;
                debug!("Search {:?}: {} items", query, result.items.len());
                Ok(result
                    .items
                    .iter()
                    .filter_map(|i| this.to_media_item(i))
                    .collect())
            }
        })
    }

    fn activity(&self) -> LiveStream<Activity> {
        self.query(|this| async move {
            let recently_played = this
                .api
                .get_items(
                    &ItemQuery::of_type(item_type::AUDIO)
                        .filter("IsPlayed")
                        .sort("DatePlayed", true)
                        .limit(ACTIVITY_LIMIT),
                )
                .await?;
            let most_played = this
                .api
                .get_items(
                    &ItemQuery::of_type(item_type::AUDIO)
                        .filter("IsPlayed")
                        .sort("PlayCount", true)
                        .limit(ACTIVITY_LIMIT),
                )
                .await?;
            let recently_added = this
                .api
                .get_items(
                    &ItemQuery::of_type(item_type::ALBUM)
                        .sort("DateCreated", true)
                        .limit(ACTIVITY_LIMIT),
                )
                .await?;
            Ok(Activity {
                recently_played: this.to_audios(&recently_played.items),
                most_played: this.to_audios(&most_played.items),
                recently_added: recently_added.items.iter().map(|a| this.to_album(a)).collect(),
            })
        })
    }

    async fn create_playlist(&self, name: &str) -> Result<Identifier> {
        let id = self.api.create_playlist(name).await?;
        self.changed();
        Ok(self.id(MediaKind::Playlist, &id))
    }

    async fn rename_playlist(&self, playlist: &Identifier, name: &str) -> Result<()> {
        let Some(key) = self.playlist_key(playlist)? else {
            return Err(MediaError::not_implemented("renaming the favorites playlist"));
        };
        self.api.rename_item(key, name).await?;
        info!("Renamed Jellyfin playlist {} to {}", key, name);
        self.changed();
        Ok(())
    }

    async fn delete_playlist(&self, playlist: &Identifier) -> Result<()> {
        let Some(key) = self.playlist_key(playlist)? else {
            return Err(MediaError::not_implemented("deleting the favorites playlist"));
        };
        self.api.delete_item(key).await?;
        info!("Deleted Jellyfin playlist {}", key);
        self.changed();
        Ok(())
    }

    async fn add_audio_to_playlist(&self, playlist: &Identifier, audio: &Identifier) -> Result<()> {
        let target = self.playlist_key(playlist)?;
        let item = self.remote_id(audio, MediaKind::Audio)?;
        match target {
            None => self.api.set_favorite(item, true).await?,
            Some(key) => self.api.add_to_playlist(key, &[item]).await?,
        }
        self.changed();
        Ok(())
    }

    async fn remove_audio_from_playlist(
        &self,
        playlist: &Identifier,
        audio: &Identifier,
    ) -> Result<()> {
        let target = self.playlist_key(playlist)?;
        let item = self.remote_id(audio, MediaKind::Audio)?;
        match target {
            None => self.api.set_favorite(item, false).await?,
            Some(key) => {
                let entries: Vec<String> = self
                    .api
                    .get_playlist_items(key)
                    .await?
                    .into_iter()
                    .filter(|e| e.id == item)
                    .filter_map(|e| e.playlist_item_id)
                    .collect();
                if entries.is_empty() {
                    return Ok(());
                }
                self.api.remove_from_playlist(key, &entries).await?;
            }
        }
        self.changed();
        Ok(())
    }

    async fn set_favorite(&self, id: &Identifier, favorite: bool) -> Result<()> {
        let kind = self
            .identify(id)
            .await
            .ok_or_else(|| MediaError::not_found(id))?;
        if kind == MediaKind::Playlist && self.playlist_key(id)?.is_none() {
            return Err(MediaError::not_implemented("starring the favorites playlist"));
        }
        let key = self.remote_id(id, kind)?;
        self.api.set_favorite(key, favorite).await?;
        self.changed();
        Ok(())
    }

    async fn notify_played(&self, id: &Identifier) -> Result<()> {
        let key = self.remote_id(id, MediaKind::Audio)?;
        self.api.mark_played(key).await?;
        self.changed();
        Ok(())
    }
}
