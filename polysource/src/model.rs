//! Media model returned by every backend

use crate::identifier::{Identifier, MediaKind};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A single playable track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Audio {
    pub id: Identifier,
    pub title: String,
    pub artist: Option<String>,
    pub artist_id: Option<Identifier>,
    pub album: Option<String>,
    pub album_id: Option<Identifier>,
    pub track: Option<u32>,
    pub disc: Option<u32>,
    pub duration_ms: Option<u64>,
    pub genre: Option<String>,
    pub year: Option<i32>,
    pub favorite: bool,
    pub thumbnail: Option<String>,
}

impl Audio {
    /// Track with only the mandatory fields set
    pub fn new(id: Identifier, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            artist: None,
            artist_id: None,
            album: None,
            album_id: None,
            track: None,
            disc: None,
            duration_ms: None,
            genre: None,
            year: None,
            favorite: false,
            thumbnail: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub id: Identifier,
    pub title: String,
    pub artist: Option<String>,
    pub artist_id: Option<Identifier>,
    pub year: Option<i32>,
    pub track_count: u32,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub id: Identifier,
    pub name: String,
    pub album_count: u32,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub id: Identifier,
    pub name: String,
    pub track_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: Identifier,
    pub name: String,
    pub track_count: u32,
    pub thumbnail: Option<String>,
    /// `false` for read-only playlists (local index, favorites pseudo-playlist)
    pub editable: bool,
}

/// Any media item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MediaItem {
    Audio(Audio),
    Album(Album),
    Artist(Artist),
    Genre(Genre),
    Playlist(Playlist),
}

impl MediaItem {
    pub fn id(&self) -> &Identifier {
        match self {
            MediaItem::Audio(a) => &a.id,
            MediaItem::Album(a) => &a.id,
            MediaItem::Artist(a) => &a.id,
            MediaItem::Genre(g) => &g.id,
            MediaItem::Playlist(p) => &p.id,
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            MediaItem::Audio(_) => MediaKind::Audio,
            MediaItem::Album(_) => MediaKind::Album,
            MediaItem::Artist(_) => MediaKind::Artist,
            MediaItem::Genre(_) => MediaKind::Genre,
            MediaItem::Playlist(_) => MediaKind::Playlist,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            MediaItem::Audio(a) => &a.title,
            MediaItem::Album(a) => &a.title,
            MediaItem::Artist(a) => &a.name,
            MediaItem::Genre(g) => &g.name,
            MediaItem::Playlist(p) => &p.name,
        }
    }
}

/// An album with its tracks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlbumDetail {
    pub album: Album,
    pub tracks: Vec<Audio>,
}

/// An artist with its albums
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistDetail {
    pub artist: Artist,
    pub albums: Vec<Album>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreDetail {
    pub genre: Genre,
    pub tracks: Vec<Audio>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistDetail {
    pub playlist: Playlist,
    pub tracks: Vec<Audio>,
}

/// Whether a given playlist contains a given track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistMembership {
    pub playlist: Playlist,
    pub contains: bool,
}

/// Listening activity summary of a backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub recently_played: Vec<Audio>,
    pub most_played: Vec<Audio>,
    pub recently_added: Vec<Album>,
}

/// One human-readable line of backend health information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticField {
    pub label: String,
    pub value: String,
}

impl DiagnosticField {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Sort strategies a backend may honour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortStrategy {
    #[default]
    Title,
    Artist,
    Year,
    Added,
    PlayCount,
}

/// Best-effort ordering hint
///
/// Backends may ignore it or honour it partially (a remote API may only
/// know how to sort by title).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortingRule {
    pub strategy: SortStrategy,
    pub reverse: bool,
}

impl SortingRule {
    pub fn new(strategy: SortStrategy, reverse: bool) -> Self {
        Self { strategy, reverse }
    }

    /// Sorts items in place using the keys they expose
    ///
    /// Strategies an item has no key for fall back to the title.
    pub fn apply<T: Sortable>(&self, items: &mut [T]) {
        items.sort_by(|a, b| {
            let ordering = match self.strategy {
                SortStrategy::Artist => cmp_opt(a.sort_artist(), b.sort_artist()),
                SortStrategy::Year => a.sort_year().cmp(&b.sort_year()),
                _ => Ordering::Equal,
            };
            ordering.then_with(|| cmp_text(a.sort_title(), b.sort_title()))
        });
        if self.reverse {
            items.reverse();
        }
    }
}

fn cmp_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

fn cmp_opt(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => cmp_text(a, b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Keys used by [`SortingRule::apply`]
pub trait Sortable {
    fn sort_title(&self) -> &str;

    fn sort_artist(&self) -> Option<&str> {
        None
    }

    fn sort_year(&self) -> Option<i32> {
        None
    }
}

impl Sortable for Audio {
    fn sort_title(&self) -> &str {
        &self.title
    }
    fn sort_artist(&self) -> Option<&str> {
        self.artist.as_deref()
    }
    fn sort_year(&self) -> Option<i32> {
        self.year
    }
}

impl Sortable for Album {
    fn sort_title(&self) -> &str {
        &self.title
    }
    fn sort_artist(&self) -> Option<&str> {
        self.artist.as_deref()
    }
    fn sort_year(&self) -> Option<i32> {
        self.year
    }
}

impl Sortable for Artist {
    fn sort_title(&self) -> &str {
        &self.name
    }
}

impl Sortable for Genre {
    fn sort_title(&self) -> &str {
        &self.name
    }
}

impl Sortable for Playlist {
    fn sort_title(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn album(title: &str, artist: Option<&str>, year: Option<i32>) -> Album {
        Album {
            id: Identifier::new(format!("test://0/album/{}", title)),
            title: title.to_string(),
            artist: artist.map(str::to_string),
            artist_id: None,
            year,
            track_count: 1,
            thumbnail: None,
        }
    }

    #[test]
    fn test_sort_by_title_is_case_insensitive() {
        let mut albums = vec![album("beta", None, None), album("Alpha", None, None)];
        SortingRule::default().apply(&mut albums);
        assert_eq!(albums[0].title, "Alpha");
    }

    #[test]
    fn test_sort_by_year_reversed() {
        let mut albums = vec![
            album("a", None, Some(1999)),
            album("b", None, Some(2010)),
            album("c", None, None),
        ];
        SortingRule::new(SortStrategy::Year, true).apply(&mut albums);
        let titles: Vec<_> = albums.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_sort_by_artist_puts_unknown_last() {
        let mut albums = vec![album("x", None, None), album("y", Some("Zed"), None)];
        SortingRule::new(SortStrategy::Artist, false).apply(&mut albums);
        assert_eq!(albums[0].title, "y");
    }

    #[test]
    fn test_media_item_accessors() {
        let audio = Audio::new(Identifier::new("test://0/audio/1"), "Song");
        let item = MediaItem::Audio(audio);
        assert_eq!(item.kind(), MediaKind::Audio);
        assert_eq!(item.title(), "Song");
        assert_eq!(item.id().as_str(), "test://0/audio/1");
    }
}
