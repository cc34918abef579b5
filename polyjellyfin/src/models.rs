//! Structures de l'API Jellyfin (DTO en PascalCase)
//!
//! Seuls les champs utiles au backend sont décrits ; tous sont optionnels
//! ou ont une valeur par défaut, les serveurs omettant les champs nuls.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Nombre de ticks (100 ns) par milliseconde
pub const TICKS_PER_MS: u64 = 10_000;

/// Réponse de `POST /Users/AuthenticateByName`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthenticationResult {
    pub user: UserDto,
    pub access_token: String,
    #[serde(default)]
    pub server_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserDto {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Corps de `POST /Users/AuthenticateByName`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct AuthenticateByName<'a> {
    pub username: &'a str,
    pub pw: &'a str,
}

/// Paire nom/identifiant (artistes d'un morceau, genres)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NameIdPair {
    #[serde(default)]
    pub name: Option<String>,
    pub id: String,
}

/// Données propres à l'utilisateur (favori, écoutes)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserItemData {
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub play_count: u32,
    #[serde(default)]
    pub last_played_date: Option<String>,
}

/// Élément du graphe (morceau, album, artiste, genre, playlist)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BaseItem {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// `Audio`, `MusicAlbum`, `MusicArtist`, `MusicGenre`, `Playlist`
    #[serde(default, rename = "Type")]
    pub item_type: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub album_id: Option<String>,
    #[serde(default)]
    pub album_artist: Option<String>,
    #[serde(default)]
    pub album_artists: Vec<NameIdPair>,
    #[serde(default)]
    pub artist_items: Vec<NameIdPair>,
    #[serde(default)]
    pub index_number: Option<u32>,
    #[serde(default)]
    pub parent_index_number: Option<u32>,
    #[serde(default)]
    pub run_time_ticks: Option<u64>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub production_year: Option<i32>,
    #[serde(default)]
    pub user_data: Option<UserItemData>,
    #[serde(default)]
    pub image_tags: HashMap<String, String>,
    #[serde(default)]
    pub child_count: Option<u32>,
    #[serde(default)]
    pub song_count: Option<u32>,
    #[serde(default)]
    pub album_count: Option<u32>,
    #[serde(default)]
    pub date_created: Option<String>,
    /// Identifiant de l'entrée dans une playlist (`/Playlists/{id}/Items`)
    #[serde(default)]
    pub playlist_item_id: Option<String>,
}

impl BaseItem {
    pub fn is_favorite(&self) -> bool {
        self.user_data.as_ref().is_some_and(|d| d.is_favorite)
    }

    pub fn play_count(&self) -> u32 {
        self.user_data.as_ref().map_or(0, |d| d.play_count)
    }

    /// Tag de l'image principale, s'il y en a une
    pub fn primary_image_tag(&self) -> Option<&str> {
        self.image_tags.get("Primary").map(String::as_str)
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.run_time_ticks.map(|ticks| ticks / TICKS_PER_MS)
    }
}

/// Résultat paginé des requêtes d'éléments
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemsResult {
    #[serde(default)]
    pub items: Vec<BaseItem>,
    #[serde(default)]
    pub total_record_count: u32,
    #[serde(default)]
    pub start_index: u32,
}

/// Réponse de `GET /System/Info/Public`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublicSystemInfo {
    #[serde(default)]
    pub server_name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

/// Ligne de paroles
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LyricLine {
    #[serde(default)]
    pub text: String,
    /// Début de la ligne en ticks, absent pour des paroles non synchronisées
    #[serde(default)]
    pub start: Option<u64>,
}

/// Réponse de `GET /Audio/{id}/Lyrics`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LyricDto {
    #[serde(default)]
    pub lyrics: Vec<LyricLine>,
}

impl LyricDto {
    /// Texte brut, une ligne par entrée ; `None` si vide
    pub fn text(&self) -> Option<String> {
        let text = self
            .lyrics
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        (!text.trim().is_empty()).then_some(text)
    }
}

/// Corps de `POST /Playlists`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct CreatePlaylist<'a> {
    pub name: &'a str,
    pub user_id: &'a str,
    pub media_type: &'static str,
    pub ids: Vec<String>,
}

/// Réponse de `POST /Playlists`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlaylistCreationResult {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_base_item_defaults() {
        let item: BaseItem = serde_json::from_value(json!({
            "Id": "abc",
            "Name": "Blue in Green",
            "Type": "Audio",
            "RunTimeTicks": 3_370_000_000u64,
            "UserData": {"IsFavorite": true, "PlayCount": 4},
            "ImageTags": {"Primary": "tag1"}
        }))
        .unwrap();
        assert_eq!(item.item_type.as_deref(), Some("Audio"));
        assert_eq!(item.duration_ms(), Some(337_000));
        assert!(item.is_favorite());
        assert_eq!(item.play_count(), 4);
        assert_eq!(item.primary_image_tag(), Some("tag1"));
        assert!(item.genres.is_empty());
    }

    #[test]
    fn test_lyrics_text() {
        let lyrics: LyricDto = serde_json::from_value(json!({
            "Lyrics": [{"Text": "first"}, {"Text": "second", "Start": 10}]
        }))
        .unwrap();
        assert_eq!(lyrics.text().as_deref(), Some("first\nsecond"));
        assert!(LyricDto::default().text().is_none());
    }
}
