//! Views derived from one read of the index
//!
//! Albums, artists and genres are not stored: they are grouped from the
//! tracks of a snapshot, so every one of them owns at least one track.

use crate::index::{IndexedPlaylist, IndexedTrack};
use polysource::{
    Album, AlbumDetail, Artist, ArtistDetail, Audio, Genre, GenreDetail, Identifier, MediaKind,
    Playlist, PlaylistDetail, SortStrategy, SortingRule,
};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};

pub(crate) const SCHEME: &str = "local";

/// Authority of collections spanning every volume
pub(crate) const ALL_VOLUMES: &str = "*";

/// Key of the favorites pseudo-playlist
pub(crate) const FAVORITES_KEY: &str = "favorites";

pub(crate) fn audio_id(track: &IndexedTrack) -> Identifier {
    Identifier::build(SCHEME, &track.volume, MediaKind::Audio, &track.path)
}

/// Short stable key of a derived collection
pub(crate) fn derived_key(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.to_lowercase().as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(&hasher.finalize()[..8])
}

/// Tracks visible to one backend, with statistics applied
#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
    authority: String,
    entries: Vec<(IndexedTrack, Audio)>,
}

impl Snapshot {
    pub fn new(
        authority: &str,
        tracks: Vec<IndexedTrack>,
        favorites: &HashSet<Identifier>,
    ) -> Self {
        let entries = tracks
            .into_iter()
            .map(|track| {
                let mut audio = Self::to_audio(authority, &track);
                audio.favorite = favorites.contains(&audio.id);
                (track, audio)
            })
            .collect();
        Self {
            authority: authority.to_string(),
            entries,
        }
    }

    fn id(authority: &str, kind: MediaKind, key: &str) -> Identifier {
        Identifier::build(SCHEME, authority, kind, key)
    }

    fn album_key(track: &IndexedTrack) -> Option<String> {
        let title = track.album.as_deref()?;
        Some(derived_key(&[track.grouping_artist().unwrap_or(""), title]))
    }

    fn to_audio(authority: &str, track: &IndexedTrack) -> Audio {
        let mut audio = Audio::new(audio_id(track), &track.title);
        audio.artist = track.artist.clone();
        audio.artist_id = track
            .artist
            .as_deref()
            .map(|a| Self::id(authority, MediaKind::Artist, &derived_key(&[a])));
        audio.album = track.album.clone();
        audio.album_id = Self::album_key(track).map(|k| Self::id(authority, MediaKind::Album, &k));
        audio.track = track.track;
        audio.disc = track.disc;
        audio.duration_ms = track.duration_ms;
        audio.genre = track.genre.clone();
        audio.year = track.year;
        audio
    }

    pub fn audios(&self) -> Vec<Audio> {
        self.entries.iter().map(|(_, a)| a.clone()).collect()
    }

    /// Tracks ordered by `rule`
    ///
    /// `Added` and `PlayCount` put the newest or most played first; other
    /// strategies use [`SortingRule::apply`].
    pub fn sorted_audios(
        &self,
        rule: SortingRule,
        play_counts: &HashMap<Identifier, u32>,
    ) -> Vec<Audio> {
        let key = |(track, audio): &(IndexedTrack, Audio)| match rule.strategy {
            SortStrategy::Added => track.added,
            _ => play_counts.get(&audio.id).copied().unwrap_or(0) as i64,
        };
        match rule.strategy {
            SortStrategy::Added | SortStrategy::PlayCount => {
                let mut entries: Vec<&(IndexedTrack, Audio)> = self.entries.iter().collect();
                entries.sort_by(|a, b| {
                    key(*b)
                        .cmp(&key(*a))
                        .then_with(|| a.1.title.to_lowercase().cmp(&b.1.title.to_lowercase()))
                });
                let mut audios: Vec<Audio> = entries.into_iter().map(|(_, a)| a.clone()).collect();
                if rule.reverse {
                    audios.reverse();
                }
                audios
            }
            _ => {
                let mut audios = self.audios();
                rule.apply(&mut audios);
                audios
            }
        }
    }

    pub fn track(&self, id: &Identifier) -> Option<&IndexedTrack> {
        self.entries.iter().find(|(_, a)| &a.id == id).map(|(t, _)| t)
    }

    pub fn audio(&self, id: &Identifier) -> Option<Audio> {
        self.entries
            .iter()
            .find(|(_, a)| &a.id == id)
            .map(|(_, a)| a.clone())
    }

    /// Tracks in album order (disc, track number, title)
    fn album_tracks(&self, album_id: &Identifier) -> Vec<Audio> {
        let mut tracks: Vec<Audio> = self
            .entries
            .iter()
            .filter(|(_, a)| a.album_id.as_ref() == Some(album_id))
            .map(|(_, a)| a.clone())
            .collect();
        tracks.sort_by(|a, b| {
            (a.disc.unwrap_or(1), a.track.unwrap_or(u32::MAX), &a.title).cmp(&(
                b.disc.unwrap_or(1),
                b.track.unwrap_or(u32::MAX),
                &b.title,
            ))
        });
        tracks
    }

    pub fn albums(&self) -> Vec<Album> {
        let mut albums: BTreeMap<Identifier, Album> = BTreeMap::new();
        for (track, audio) in &self.entries {
            let Some(album_id) = audio.album_id.clone() else {
                continue;
            };
            let album = albums.entry(album_id.clone()).or_insert_with(|| {
                let artist = track.grouping_artist().map(str::to_string);
                Album {
                    id: album_id,
                    title: audio.album.clone().unwrap_or_default(),
                    artist_id: artist.as_deref().map(|a| {
                        Self::id(&self.authority, MediaKind::Artist, &derived_key(&[a]))
                    }),
                    artist,
                    year: None,
                    track_count: 0,
                    thumbnail: None,
                }
            });
            album.track_count += 1;
            album.year = album.year.max(track.year);
        }
        albums.into_values().collect()
    }

    /// Albums ordered by their most recently indexed track, newest first
    pub fn recently_added_albums(&self, limit: usize) -> Vec<Album> {
        let mut added: HashMap<Identifier, i64> = HashMap::new();
        for (track, audio) in &self.entries {
            if let Some(album_id) = &audio.album_id {
                let latest = added.entry(album_id.clone()).or_insert(track.added);
                *latest = (*latest).max(track.added);
            }
        }
        let mut albums = self.albums();
        albums.sort_by_key(|a| std::cmp::Reverse(added.get(&a.id).copied().unwrap_or(0)));
        albums.truncate(limit);
        albums
    }

    pub fn album(&self, id: &Identifier) -> Option<AlbumDetail> {
        let album = self.albums().into_iter().find(|a| &a.id == id)?;
        Some(AlbumDetail {
            tracks: self.album_tracks(id),
            album,
        })
    }

    pub fn artists(&self) -> Vec<Artist> {
        let mut artists: BTreeMap<Identifier, (Artist, HashSet<Identifier>)> = BTreeMap::new();
        for (_, audio) in &self.entries {
            let (Some(name), Some(artist_id)) = (&audio.artist, &audio.artist_id) else {
                continue;
            };
            let (_, albums) = artists.entry(artist_id.clone()).or_insert_with(|| {
                (
                    Artist {
                        id: artist_id.clone(),
                        name: name.clone(),
                        album_count: 0,
                        thumbnail: None,
                    },
                    HashSet::new(),
                )
            });
            if let Some(album_id) = &audio.album_id {
                albums.insert(album_id.clone());
            }
        }
        artists
            .into_values()
            .map(|(mut artist, albums)| {
                artist.album_count = albums.len() as u32;
                artist
            })
            .collect()
    }

    pub fn artist(&self, id: &Identifier) -> Option<ArtistDetail> {
        let artist = self.artists().into_iter().find(|a| &a.id == id)?;
        let album_ids: HashSet<&Identifier> = self
            .entries
            .iter()
            .filter(|(_, a)| a.artist_id.as_ref() == Some(id))
            .filter_map(|(_, a)| a.album_id.as_ref())
            .collect();
        let albums = self
            .albums()
            .into_iter()
            .filter(|a| album_ids.contains(&a.id))
            .collect();
        Some(ArtistDetail { artist, albums })
    }

    fn genre_id(&self, name: &str) -> Identifier {
        Self::id(&self.authority, MediaKind::Genre, &derived_key(&[name]))
    }

    pub fn genres(&self) -> Vec<Genre> {
        let mut genres: BTreeMap<Identifier, Genre> = BTreeMap::new();
        for (_, audio) in &self.entries {
            let Some(name) = audio.genre.as_deref().filter(|g| !g.is_empty()) else {
                continue;
            };
            let id = self.genre_id(name);
            genres
                .entry(id.clone())
                .or_insert_with(|| Genre {
                    id,
                    name: name.to_string(),
                    track_count: 0,
                })
                .track_count += 1;
        }
        genres.into_values().collect()
    }

    pub fn genre(&self, id: &Identifier) -> Option<GenreDetail> {
        let genre = self.genres().into_iter().find(|g| &g.id == id)?;
        let tracks = self
            .entries
            .iter()
            .filter(|(_, a)| a.genre.as_deref().map(|g| self.genre_id(g)).as_ref() == Some(id))
            .map(|(_, a)| a.clone())
            .collect();
        Some(GenreDetail { genre, tracks })
    }

    pub fn favorites_id(&self) -> Identifier {
        Self::id(&self.authority, MediaKind::Playlist, FAVORITES_KEY)
    }

    fn favorites_detail(&self) -> PlaylistDetail {
        let tracks: Vec<Audio> = self
            .entries
            .iter()
            .filter(|(_, a)| a.favorite)
            .map(|(_, a)| a.clone())
            .collect();
        PlaylistDetail {
            playlist: Playlist {
                id: self.favorites_id(),
                name: "Favorites".to_string(),
                track_count: tracks.len() as u32,
                thumbnail: None,
                editable: true,
            },
            tracks,
        }
    }

    fn playlist_id(&self, playlist: &IndexedPlaylist) -> Identifier {
        Self::id(
            &self.authority,
            MediaKind::Playlist,
            &derived_key(&[&playlist.volume, &playlist.key]),
        )
    }

    fn playlist_detail(&self, playlist: &IndexedPlaylist) -> PlaylistDetail {
        let by_path: HashMap<(&str, &str), &Audio> = self
            .entries
            .iter()
            .map(|(t, a)| ((t.volume.as_str(), t.path.as_str()), a))
            .collect();
        let tracks: Vec<Audio> = playlist
            .entries
            .iter()
            .filter_map(|path| by_path.get(&(playlist.volume.as_str(), path.as_str())))
            .map(|a| (*a).clone())
            .collect();
        PlaylistDetail {
            playlist: Playlist {
                id: self.playlist_id(playlist),
                name: playlist.name.clone(),
                track_count: tracks.len() as u32,
                thumbnail: None,
                editable: false,
            },
            tracks,
        }
    }

    /// Favorites first, then the indexed playlists
    pub fn playlist_details(&self, playlists: &[IndexedPlaylist]) -> Vec<PlaylistDetail> {
        std::iter::once(self.favorites_detail())
            .chain(playlists.iter().map(|p| self.playlist_detail(p)))
            .collect()
    }

    /// Case-insensitive substring match on names
    pub fn search(&self, query: &str) -> (Vec<Artist>, Vec<Album>, Vec<Audio>) {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return (vec![], vec![], vec![]);
        }
        let matches = |s: &str| s.to_lowercase().contains(&needle);

        let artists = self.artists().into_iter().filter(|a| matches(&a.name)).collect();
        let albums = self.albums().into_iter().filter(|a| matches(&a.title)).collect();
        let audios = self
            .entries
            .iter()
            .filter(|(_, a)| {
                matches(&a.title)
                    || a.artist.as_deref().is_some_and(matches)
                    || a.album.as_deref().is_some_and(matches)
            })
            .map(|(_, a)| a.clone())
            .collect();
        (artists, albums, audios)
    }
}
