//! Conversion des éléments Jellyfin vers le modèle polysource

use crate::backend::JellyfinBackend;
use crate::models::BaseItem;
use crate::{FAVORITES_KEY, SCHEME};
use polysource::{Album, Artist, Audio, Genre, Identifier, MediaItem, MediaKind, Playlist};

/// Nom affiché de la pseudo-playlist des favoris
pub(crate) const FAVORITES_NAME: &str = "Favorites";

fn name(item: &BaseItem) -> String {
    item.name.clone().unwrap_or_default()
}

impl JellyfinBackend {
    pub(crate) fn id(&self, kind: MediaKind, key: &str) -> Identifier {
        Identifier::build(SCHEME, self.authority(), kind, key)
    }

    pub(crate) fn favorites_id(&self) -> Identifier {
        self.id(MediaKind::Playlist, FAVORITES_KEY)
    }

    fn thumbnail(&self, item: &BaseItem) -> Option<String> {
        item.primary_image_tag()
            .map(|tag| self.api().image_url(&item.id, tag))
    }

    pub(crate) fn to_audio(&self, item: &BaseItem) -> Audio {
        let mut audio = Audio::new(self.id(MediaKind::Audio, &item.id), name(item));
        let performer = item.artist_items.first();
        audio.artist = item
            .album_artist
            .clone()
            .or_else(|| performer.and_then(|a| a.name.clone()));
        audio.artist_id = item
            .album_artists
            .first()
            .or(performer)
            .map(|a| self.id(MediaKind::Artist, &a.id));
        audio.album = item.album.clone();
        audio.album_id = item
            .album_id
            .as_deref()
            .map(|id| self.id(MediaKind::Album, id));
        audio.track = item.index_number;
        audio.disc = item.parent_index_number;
        audio.duration_ms = item.duration_ms();
        audio.genre = item.genres.first().cloned();
        audio.year = item.production_year;
        audio.favorite = item.is_favorite();
        audio.thumbnail = self.thumbnail(item);
        audio
    }

    pub(crate) fn to_audios(&self, items: &[BaseItem]) -> Vec<Audio> {
        items.iter().map(|i| self.to_audio(i)).collect()
    }

    pub(crate) fn to_album(&self, item: &BaseItem) -> Album {
        Album {
            id: self.id(MediaKind::Album, &item.id),
            title: name(item),
            artist: item.album_artist.clone(),
            artist_id: item
                .album_artists
                .first()
                .map(|a| self.id(MediaKind::Artist, &a.id)),
            year: item.production_year,
            track_count: item.child_count.or(item.song_count).unwrap_or(0),
            thumbnail: self.thumbnail(item),
        }
    }

    pub(crate) fn to_artist(&self, item: &BaseItem) -> Artist {
        Artist {
            id: self.id(MediaKind::Artist, &item.id),
            name: name(item),
            album_count: item.album_count.or(item.child_count).unwrap_or(0),
            thumbnail: self.thumbnail(item),
        }
    }

    pub(crate) fn to_genre(&self, item: &BaseItem) -> Genre {
        Genre {
            id: self.id(MediaKind::Genre, &item.id),
            name: name(item),
            track_count: item.song_count.unwrap_or(0),
        }
    }

    pub(crate) fn to_playlist(&self, item: &BaseItem) -> Playlist {
        Playlist {
            id: self.id(MediaKind::Playlist, &item.id),
            name: name(item),
            track_count: item.child_count.unwrap_or(0),
            thumbnail: self.thumbnail(item),
            editable: true,
        }
    }

    pub(crate) fn favorites_playlist(&self, track_count: u32) -> Playlist {
        Playlist {
            id: self.favorites_id(),
            name: FAVORITES_NAME.to_string(),
            track_count,
            thumbnail: None,
            editable: false,
        }
    }

    /// Élément de résultat de recherche, `None` pour les types non musicaux
    pub(crate) fn to_media_item(&self, item: &BaseItem) -> Option<MediaItem> {
        match item.item_type.as_deref()? {
            "Audio" => Some(MediaItem::Audio(self.to_audio(item))),
            "MusicAlbum" => Some(MediaItem::Album(self.to_album(item))),
            "MusicArtist" => Some(MediaItem::Artist(self.to_artist(item))),
            "MusicGenre" => Some(MediaItem::Genre(self.to_genre(item))),
            "Playlist" => Some(MediaItem::Playlist(self.to_playlist(item))),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{JellyfinBackend, JellyfinSettings};
    use polysource::MediaItem;
    use serde_json::json;

    fn backend() -> JellyfinBackend {
        JellyfinBackend::from_settings(5, JellyfinSettings::new("http://jf:8096", "bob", "pw"))
            .unwrap()
    }

    #[test]
    fn test_audio_conversion() {
        let item = serde_json::from_value(json!({
            "Id": "t1",
            "Name": "Teen Town",
            "Type": "Audio",
            "Album": "Heavy Weather",
            "AlbumId": "a1",
            "AlbumArtist": "Weather Report",
            "AlbumArtists": [{"Name": "Weather Report", "Id": "ar1"}],
            "ArtistItems": [{"Name": "Jaco Pastorius", "Id": "ar2"}],
            "IndexNumber": 3,
            "RunTimeTicks": 1_720_000_000u64,
            "Genres": ["Jazz Fusion"],
            "ImageTags": {"Primary": "xyz"}
        }))
        .unwrap();
        let audio = backend().to_audio(&item);

        assert_eq!(audio.id.as_str(), "jellyfin://5/audio/t1");
        assert_eq!(audio.artist.as_deref(), Some("Weather Report"));
        assert_eq!(audio.artist_id.unwrap().as_str(), "jellyfin://5/artist/ar1");
        assert_eq!(audio.album_id.unwrap().as_str(), "jellyfin://5/album/a1");
        assert_eq!(audio.duration_ms, Some(172_000));
        assert_eq!(audio.genre.as_deref(), Some("Jazz Fusion"));
        assert_eq!(
            audio.thumbnail.as_deref(),
            Some("http://jf:8096/Items/t1/Images/Primary?tag=xyz")
        );
    }

    #[test]
    fn test_unknown_types_are_skipped() {
        let video = serde_json::from_value(json!({"Id": "v", "Type": "Movie"})).unwrap();
        assert!(backend().to_media_item(&video).is_none());

        let album = serde_json::from_value(json!({"Id": "a", "Name": "A", "Type": "MusicAlbum"}))
            .unwrap();
        assert!(matches!(
            backend().to_media_item(&album),
            Some(MediaItem::Album(_))
        ));
    }
}
