//! Implémentation de [`MediaBackend`] pour un serveur Subsonic
//!
//! Chaque requête est une [`LiveStream`] réévaluée après chaque mutation
//! réussie du même backend : les modifications faites depuis un autre client
//! ne sont visibles qu'à la prochaine souscription.

use crate::api::catalog::AlbumListType;
use crate::api::user::StarTarget;
use crate::api::{SubsonicApi, SubsonicSettings};
use crate::config_ext::DEFAULT_PAGE_SIZE;
use crate::error::SubsonicError;
use crate::{API_VERSION, FAVORITES_KEY, SCHEME};
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

/// Nombre maximal de morceaux demandés pour un genre
const GENRE_SONG_LIMIT: usize = 500;

/// Backend Subsonic
///
/// Les clones partagent le client HTTP et le compteur de changements.
#[derive(Debug, Clone)]
pub struct SubsonicBackend {
    instance_id: i64,
    authority: String,
    api: Arc<SubsonicApi>,
    tracker: Arc<ChangeTracker>,
    page_size: usize,
}

impl SubsonicBackend {
    /// Crée un backend pour l'enregistrement serveur `instance_id`
    pub fn new(instance_id: i64, api: SubsonicApi) -> Self {
        Self {
            instance_id,
            authority: instance_id.to_string(),
            api: Arc::new(api),
            tracker: Arc::new(ChangeTracker::new()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Crée le client puis le backend
    ///
    /// # Errors
    ///
    /// * `SubsonicError::Configuration` - URL de base invalide
    pub fn from_settings(instance_id: i64, settings: SubsonicSettings) -> crate::Result<Self> {
        Ok(Self::new(instance_id, SubsonicApi::new(settings)?))
    }

    /// Taille de page des requêtes paginées
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, DEFAULT_PAGE_SIZE);
        self
    }

    pub fn instance_id(&self) -> i64 {
        self.instance_id
    }

    pub fn api(&self) -> &SubsonicApi {
        &self.api
    }

    pub(crate) fn authority(&self) -> &str {
        &self.authority
    }

    /// Identifiant serveur d'un élément de ce backend, du type attendu
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
        F: Fn(SubsonicBackend) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let this = self.clone();
        self.tracker.live(move || f(this.clone()))
    }

    fn changed(&self) {
        self.tracker.bump();
    }

    async fn starred_songs(&self) -> Result<Vec<crate::models::Song>> {
        Ok(self.api.get_starred2().await?.song)
    }

    async fn album_list(&self, rule: SortingRule) -> Result<Vec<Album>> {
        let list_type = match rule.strategy {
            SortStrategy::Artist => AlbumListType::AlphabeticalByArtist,
            SortStrategy::Added => AlbumListType::Newest,
            SortStrategy::PlayCount => AlbumListType::Frequent,
            SortStrategy::Title | SortStrategy::Year => AlbumListType::AlphabeticalByName,
        };
        let albums = self.api.get_all_albums(list_type, self.page_size).await?;
        let mut albums: Vec<Album> = albums
            .iter()
            .filter(|a| a.song_count != Some(0))
            .map(|a| self.to_album(a))
            .collect();

        match rule.strategy {
            SortStrategy::Added | SortStrategy::PlayCount => {
                if rule.reverse {
                    albums.reverse();
                }
            }
            _ => rule.apply(&mut albums),
        }
        Ok(albums)
    }

    async fn playlist_list(&self) -> Result<Vec<Playlist>> {
        let starred = self.starred_songs().await?;
        let mut playlists = vec![self.favorites_playlist(&starred)];
        playlists.extend(
            self.api
                .get_playlists()
                .await?
                .iter()
                .map(|p| self.to_playlist(p)),
        );
        Ok(playlists)
    }
}

#[async_trait]
impl MediaBackend for SubsonicBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Subsonic
    }

    async fn identify(&self, id: &Identifier) -> Option<MediaKind> {
        id.parts_for(SCHEME)
            .filter(|p| p.authority == self.authority)
            .map(|p| p.kind)
    }

    fn status(&self) -> LiveStream<Vec<DiagnosticField>> {
        self.query(|this| async move {
            let info = this.api.ping().await?;
            let mut fields = vec![
                DiagnosticField::new("Backend", "Subsonic"),
                DiagnosticField::new("Server", this.api.base_url()),
                DiagnosticField::new("User", this.api.username()),
                DiagnosticField::new("Client API version", API_VERSION),
            ];
            if let Some(version) = info.version {
                fields.push(DiagnosticField::new("Server API version", version));
            }
            if let Some(server_type) = info.server_type {
                let version = info.server_version.unwrap_or_default();
                fields.push(DiagnosticField::new(
                    "Server type",
                    format!("{} {}", server_type, version).trim_end().to_string(),
                ));
            }
            Ok(fields)
        })
    }

    fn audios(&self, rule: SortingRule) -> LiveStream<Vec<Audio>> {
        self.query(move |this| async move {
            let mut songs = this.api.get_all_songs(this.page_size).await?;
            match rule.strategy {
                SortStrategy::PlayCount | SortStrategy::Added => {
                    if rule.strategy == SortStrategy::PlayCount {
                        songs.sort_by(|a, b| b.play_count.cmp(&a.play_count));
                    } else {
                        songs.sort_by(|a, b| b.created.cmp(&a.created));
                    }
                    let mut audios = this.to_audios(&songs);
                    if rule.reverse {
                        audios.reverse();
                    }
                    Ok(audios)
                }
                _ => {
                    let mut audios = this.to_audios(&songs);
                    rule.apply(&mut audios);
                    Ok(audios)
                }
            }
        })
    }

    fn albums(&self, rule: SortingRule) -> LiveStream<Vec<Album>> {
        self.query(move |this| async move { this.album_list(rule).await })
    }

    fn artists(&self, rule: SortingRule) -> LiveStream<Vec<Artist>> {
        self.query(move |this| async move {
            let mut artists: Vec<Artist> = this
                .api
                .get_artists()
                .await?
                .iter()
                .filter(|a| a.album_count != Some(0))
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
                .get_genres()
                .await?
                .iter()
                .filter(|g| g.song_count.unwrap_or(0) > 0)
                .map(|g| this.to_genre(g))
                .collect();
            rule.apply(&mut genres);
            Ok(genres)
        })
    }

    fn playlists(&self, rule: SortingRule) -> LiveStream<Vec<Playlist>> {
        self.query(move |this| async move {
            let mut playlists = this.playlist_list().await?;
            rule.apply(&mut playlists);
            Ok(playlists)
        })
    }

    fn audio(&self, id: &Identifier) -> LiveStream<Audio> {
        let id = id.clone();
        self.query(move |this| {
            let id = id.clone();
            async move {
                let key = this.remote_id(&id, MediaKind::Audio)?;
                let song = this.api.get_song(key).await?;
                Ok(this.to_audio(&song))
            }
        })
    }

    fn album(&self, id: &Identifier) -> LiveStream<AlbumDetail> {
        let id = id.clone();
        self.query(move |this| {
            let id = id.clone();
            async move {
                let key = this.remote_id(&id, MediaKind::Album)?;
                let album = this.api.get_album(key).await?;
                Ok(AlbumDetail {
                    album: this.to_album(&album),
                    tracks: this.to_audios(&album.song),
                })
            }
        })
    }

    fn artist(&self, id: &Identifier) -> LiveStream<ArtistDetail> {
        let id = id.clone();
        self.query(move |this| {
            let id = id.clone();
            async move {
                let key = this.remote_id(&id, MediaKind::Artist)?;
                let artist = this.api.get_artist(key).await?;
                Ok(ArtistDetail {
                    artist: this.to_artist(&artist),
                    albums: artist.album.iter().map(|a| this.to_album(a)).collect(),
                })
            }
        })
    }

    fn genre(&self, id: &Identifier) -> LiveStream<GenreDetail> {
        let id = id.clone();
        self.query(move |this| {
            let id = id.clone();
            async move {
                let name = this.remote_id(&id, MediaKind::Genre)?;
                let genre = this
                    .api
                    .get_genres()
                    .await?
                    .into_iter()
                    .find(|g| g.value == name)
                    .ok_or_else(|| MediaError::not_found(&id))?;
                let songs = this.api.get_songs_by_genre(name, GENRE_SONG_LIMIT).await?;
                Ok(GenreDetail {
                    genre: this.to_genre(&genre),
                    tracks: this.to_audios(&songs),
                })
            }
        })
    }

    fn playlist(&self, id: &Identifier) -> LiveStream<PlaylistDetail> {
        let id = id.clone();
        self.query(move |this| {
            let id = id.clone();
            async move {
                match this.playlist_key(&id)? {
                    None => {
                        let starred = this.starred_songs().await?;
                        Ok(PlaylistDetail {
                            playlist: this.favorites_playlist(&starred),
                            tracks: this.to_audios(&starred),
                        })
                    }
                    Some(key) => {
                        let playlist = this.api.get_playlist(key).await?;
                        Ok(PlaylistDetail {
                            playlist: this.to_playlist(&playlist),
                            tracks: this.to_audios(&playlist.entry),
                        })
                    }
                }
            }
        })
    }

    fn lyrics(&self, id: &Identifier) -> LiveStream<Option<String>> {
        let id = id.clone();
        self.query(move |this| {
            let id = id.clone();
            async move {
                let key = this.remote_id(&id, MediaKind::Audio)?;
                let song = this.api.get_song(key).await?;
                let Some(artist) = song.artist.as_deref() else {
                    return Ok(None);
                };
                let lyrics = this.api.get_lyrics(artist, &song.title).await?;
                Ok(lyrics.value.filter(|text| !text.trim().is_empty()))
            }
        })
    }

    fn audio_playlists_status(&self, id: &Identifier) -> LiveStream<Vec<PlaylistMembership>> {
        let id = id.clone();
        self.query(move |this| {
            let id = id.clone();
            async move {
                let key = this.remote_id(&id, MediaKind::Audio)?;
                let starred = this.starred_songs().await?;
                let mut memberships = vec![PlaylistMembership {
                    playlist: this.favorites_playlist(&starred),
                    contains: starred.iter().any(|s| s.id == key),
                }];

                for summary in this.api.get_playlists().await? {
                    let playlist = this.api.get_playlist(&summary.id).await?;
                    memberships.push(PlaylistMembership {
                        playlist: this.to_playlist(&playlist),
                        contains: playlist.entry.iter().any(|s| s.id == key),
                    });
                }
                Ok(memberships)
            }
        })
    }

    async fn stream_uri(&self, id: &Identifier) -> Result<String> {
        let key = self.remote_id(id, MediaKind::Audio)?;
        Ok(self.api.stream_url(key)?)
    }

    fn search(&self, query: &str) -> LiveStream<Vec<MediaItem>> {
        let query = query.trim().to_string();
        self.query(move |this| {
            let query = query.clone();
            async move {
                if query.is_empty() {
                    return Ok(Vec::new());
                }
                let result = this.api.search3(&query, 20, 20, 50, 0).await?;
                debug!(
                    "Search {:?}: {} artists, {} albums, {} songs",
                    query,
                    result.artist.len(),
                    result.album.len(),
                    result.song.len()
                );
                let mut items: Vec<MediaItem> = result
                    .artist
                    .iter()
                    .map(|a| MediaItem::Artist(this.to_artist(a)))
                    .collect();
                items.extend(result.album.iter().map(|a| MediaItem::Album(this.to_album(a))));
                items.extend(result.song.iter().map(|s| MediaItem::Audio(this.to_audio(s))));
                Ok(items)
            }
        })
    }

    fn activity(&self) -> LiveStream<Activity> {
        self.query(|this| async move {
            let recent = this
                .api
                .get_album_list2(AlbumListType::Newest, ACTIVITY_LIMIT, 0)
                .await?;
            Ok(Activity {
                recently_played: Vec::new(),
                most_played: Vec::new(),
                recently_added: recent.iter().map(|a| this.to_album(a)).collect(),
            })
        })
    }

    async fn create_playlist(&self, name: &str) -> Result<Identifier> {
        let playlist = self.api.create_playlist(name).await?;
        self.changed();
        Ok(self.id(MediaKind::Playlist, &playlist.id))
    }

    async fn rename_playlist(&self, playlist: &Identifier, name: &str) -> Result<()> {
        let Some(key) = self.playlist_key(playlist)? else {
            return Err(MediaError::not_implemented("renaming the favorites playlist"));
        };
        self.api.update_playlist(key, Some(name), &[], &[]).await?;
        info!("Renamed Subsonic playlist {} to {}", key, name);
        self.changed();
        Ok(())
    }

    async fn delete_playlist(&self, playlist: &Identifier) -> Result<()> {
        let Some(key) = self.playlist_key(playlist)? else {
            return Err(MediaError::not_implemented("deleting the favorites playlist"));
        };
        self.api.delete_playlist(key).await?;
        info!("Deleted Subsonic playlist {}", key);
        self.changed();
        Ok(())
    }

    async fn add_audio_to_playlist(&self, playlist: &Identifier, audio: &Identifier) -> Result<()> {
        let target = self.playlist_key(playlist)?;
        let song = self.remote_id(audio, MediaKind::Audio)?;
        match target {
            None => self.api.star(StarTarget::Song(song)).await?,
            Some(key) => self.api.update_playlist(key, None, &[song], &[]).await?,
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
        let song = self.remote_id(audio, MediaKind::Audio)?;
        match target {
            None => self.api.unstar(StarTarget::Song(song)).await?,
            Some(key) => {
                let indexes: Vec<usize> = self
                    .api
                    .get_playlist(key)
                    .await?
                    .entry
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| s.id == song)
                    .map(|(index, _)| index)
                    .collect();
                if indexes.is_empty() {
                    return Ok(());
                }
                self.api.update_playlist(key, None, &[], &indexes).await?;
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
        let key = self.remote_id(id, kind)?;
        let target = match kind {
            MediaKind::Audio => StarTarget::Song(key),
            MediaKind::Album => StarTarget::Album(key),
            MediaKind::Artist => StarTarget::Artist(key),
            MediaKind::Genre | MediaKind::Playlist => {
                return Err(MediaError::not_implemented(format!("starring a {}", kind)));
            }
        };
        if favorite {
            self.api.star(target).await?;
        } else {
            self.api.unstar(target).await?;
        }
        self.changed();
        Ok(())
    }

    async fn notify_played(&self, id: &Identifier) -> Result<()> {
        let key = self.remote_id(id, MediaKind::Audio)?;
        self.api.scrobble(key).await.map_err(|e: SubsonicError| {
            debug!("Scrobble of {} failed: {}", key, e);
            MediaError::from(e)
        })?;
        self.changed();
        Ok(())
    }
}
