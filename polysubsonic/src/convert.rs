//! Conversion des réponses Subsonic vers le modèle polysource

use crate::backend::SubsonicBackend;
use crate::models::{AlbumId3, ArtistId3, GenreEntry, PlaylistEntry, Song};
use crate::{FAVORITES_KEY, SCHEME};
use polysource::{Album, Artist, Audio, Genre, Identifier, MediaKind, Playlist};

/// Nom affiché de la pseudo-playlist des favoris
pub(crate) const FAVORITES_NAME: &str = "Favorites";

impl SubsonicBackend {
    pub(crate) fn id(&self, kind: MediaKind, key: &str) -> Identifier {
        Identifier::build(SCHEME, self.authority(), kind, key)
    }

    pub(crate) fn favorites_id(&self) -> Identifier {
        self.id(MediaKind::Playlist, FAVORITES_KEY)
    }

    /// URL de pochette, `None` si le serveur n'en fournit pas
    fn thumbnail(&self, cover_art: Option<&str>) -> Option<String> {
        cover_art.and_then(|c| self.api().cover_art_url(c).ok())
    }

    pub(crate) fn to_audio(&self, song: &Song) -> Audio {
        let mut audio = Audio::new(self.id(MediaKind::Audio, &song.id), song.title.clone());
        audio.artist = song.artist.clone();
        audio.artist_id = song
            .artist_id
            .as_deref()
            .map(|id| self.id(MediaKind::Artist, id));
        audio.album = song.album.clone();
        audio.album_id = song
            .album_id
            .as_deref()
            .map(|id| self.id(MediaKind::Album, id));
        audio.track = song.track;
        audio.disc = song.disc_number;
        audio.duration_ms = song.duration.map(|secs| secs * 1000);
        audio.genre = song.genre.clone();
        audio.year = song.year;
        audio.favorite = song.starred.is_some();
        audio.thumbnail = self.thumbnail(song.cover_art.as_deref());
        audio
    }

    pub(crate) fn to_audios(&self, songs: &[Song]) -> Vec<Audio> {
        songs.iter().map(|s| self.to_audio(s)).collect()
    }

    pub(crate) fn to_album(&self, album: &AlbumId3) -> Album {
        Album {
            id: self.id(MediaKind::Album, &album.id),
            title: album.name.clone(),
            artist: album.artist.clone(),
            artist_id: album
                .artist_id
                .as_deref()
                .map(|id| self.id(MediaKind::Artist, id)),
            year: album.year,
            track_count: album
                .song_count
                .unwrap_or(album.song.len() as u32),
            thumbnail: self.thumbnail(album.cover_art.as_deref()),
        }
    }

    pub(crate) fn to_artist(&self, artist: &ArtistId3) -> Artist {
        Artist {
            id: self.id(MediaKind::Artist, &artist.id),
            name: artist.name.clone(),
            album_count: artist
                .album_count
                .unwrap_or(artist.album.len() as u32),
            thumbnail: self.thumbnail(artist.cover_art.as_deref()),
        }
    }

    pub(crate) fn to_genre(&self, genre: &GenreEntry) -> Genre {
        Genre {
            id: self.id(MediaKind::Genre, &genre.value),
            name: genre.value.clone(),
            track_count: genre.song_count.unwrap_or(0),
        }
    }

    pub(crate) fn to_playlist(&self, playlist: &PlaylistEntry) -> Playlist {
        Playlist {
            id: self.id(MediaKind::Playlist, &playlist.id),
            name: playlist.name.clone(),
            track_count: playlist
                .song_count
                .unwrap_or(playlist.entry.len() as u32),
            thumbnail: self.thumbnail(playlist.cover_art.as_deref()),
            editable: true,
        }
    }

    /// Pseudo-playlist des morceaux étoilés, non éditable par renommage
    pub(crate) fn favorites_playlist(&self, starred: &[Song]) -> Playlist {
        Playlist {
            id: self.favorites_id(),
            name: FAVORITES_NAME.to_string(),
            track_count: starred.len() as u32,
            thumbnail: None,
            editable: false,
        }
    }
}
