//! Structures de l'API Subsonic (réponses JSON, schéma ID3)
//!
//! Les serveurs omettent les tableaux vides et certains renvoient les
//! identifiants sous forme numérique : tous les champs de liste ont une
//! valeur par défaut et les identifiants passent par [`deserialize_id`].

use serde::{Deserialize, Deserializer};

/// Désérialise un ID qui peut être soit un string soit un nombre
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    use serde_json::Value;

    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(Error::custom("ID must be a string or number")),
    }
}

/// Variante optionnelle de [`deserialize_id`]
pub(crate) fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_json::Value;

    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Morceau (`child` dans le schéma Subsonic)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub album_id: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub artist_id: Option<String>,
    #[serde(default)]
    pub track: Option<u32>,
    #[serde(default)]
    pub disc_number: Option<u32>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub cover_art: Option<String>,
    /// Durée en secondes
    #[serde(default)]
    pub duration: Option<u64>,
    /// Date de mise en favori, absente si non favori
    #[serde(default)]
    pub starred: Option<String>,
    #[serde(default)]
    pub play_count: Option<u64>,
    /// Date d'ajout (ISO 8601)
    #[serde(default)]
    pub created: Option<String>,
}

/// Album (schéma ID3)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumId3 {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub artist_id: Option<String>,
    #[serde(default)]
    pub cover_art: Option<String>,
    #[serde(default)]
    pub song_count: Option<u32>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub starred: Option<String>,
    #[serde(default)]
    pub song: Vec<Song>,
}

/// Artiste (schéma ID3)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistId3 {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub album_count: Option<u32>,
    #[serde(default)]
    pub cover_art: Option<String>,
    #[serde(default)]
    pub starred: Option<String>,
    #[serde(default)]
    pub album: Vec<AlbumId3>,
}

/// Entrée d'index alphabétique de `getArtists`
#[derive(Debug, Clone, Deserialize)]
pub struct ArtistIndex {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artist: Vec<ArtistId3>,
}

/// Corps de `getArtists`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Artists {
    #[serde(default)]
    pub index: Vec<ArtistIndex>,
}

/// Genre; `value` est le nom, qui sert aussi d'identifiant
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenreEntry {
    pub value: String,
    #[serde(default)]
    pub song_count: Option<u32>,
    #[serde(default)]
    pub album_count: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Genres {
    #[serde(default)]
    pub genre: Vec<GenreEntry>,
}

/// Playlist, avec ses entrées pour `getPlaylist`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistEntry {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub song_count: Option<u32>,
    #[serde(default)]
    pub cover_art: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub entry: Vec<Song>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Playlists {
    #[serde(default)]
    pub playlist: Vec<PlaylistEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumList2 {
    #[serde(default)]
    pub album: Vec<AlbumId3>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SongsByGenre {
    #[serde(default)]
    pub song: Vec<Song>,
}

/// Corps de `search3` et de `getStarred2`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub artist: Vec<ArtistId3>,
    #[serde(default)]
    pub album: Vec<AlbumId3>,
    #[serde(default)]
    pub song: Vec<Song>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Lyrics {
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

/// Champs d'en-tête de toute réponse (`ping`)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    #[serde(default)]
    pub version: Option<String>,
    /// Extension OpenSubsonic (`navidrome`, `gonic`, ...)
    #[serde(default, rename = "type")]
    pub server_type: Option<String>,
    #[serde(default)]
    pub server_version: Option<String>,
}
