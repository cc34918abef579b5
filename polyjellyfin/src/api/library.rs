//! Module d'accès à la bibliothèque musicale (graphe d'éléments)

use super::JellyfinApi;
use crate::error::{JellyfinError, Result};
use crate::models::{BaseItem, ItemsResult, LyricDto};
use reqwest::Url;
use tracing::debug;

/// Champs supplémentaires demandés pour chaque élément
const ITEM_FIELDS: &str = "Genres,DateCreated,ChildCount,ItemCounts,PrimaryImageAspectRatio";

/// Types d'éléments musicaux
pub mod item_type {
    pub const AUDIO: &str = "Audio";
    pub const ALBUM: &str = "MusicAlbum";
    pub const ARTIST: &str = "MusicArtist";
    pub const GENRE: &str = "MusicGenre";
    pub const PLAYLIST: &str = "Playlist";
}

/// Requête sur `/Users/{uid}/Items`
#[derive(Debug, Clone, Default)]
pub struct ItemQuery {
    include_item_types: Option<&'static str>,
    parent_id: Option<String>,
    artist_id: Option<String>,
    genre_id: Option<String>,
    search_term: Option<String>,
    sort_by: Option<&'static str>,
    descending: bool,
    favorites_only: bool,
    filters: Option<&'static str>,
    limit: Option<usize>,
    start_index: usize,
}

impl ItemQuery {
    /// Éléments d'un type donné, récursivement dans toute la bibliothèque
    pub fn of_type(item_type: &'static str) -> Self {
        Self {
            include_item_types: Some(item_type),
            ..Default::default()
        }
    }

    pub fn parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn artist(mut self, artist_id: impl Into<String>) -> Self {
        self.artist_id = Some(artist_id.into());
        self
    }

    pub fn genre(mut self, genre_id: impl Into<String>) -> Self {
        self.genre_id = Some(genre_id.into());
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search_term = Some(term.into());
        self
    }

    /// Tri côté serveur (`SortName`, `DateCreated`, `PlayCount`, ...)
    pub fn sort(mut self, sort_by: &'static str, descending: bool) -> Self {
        self.sort_by = Some(sort_by);
        self.descending = descending;
        self
    }

    pub fn favorites(mut self) -> Self {
        self.favorites_only = true;
        self
    }

    pub fn filter(mut self, filters: &'static str) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn page(&self, start_index: usize, limit: usize) -> Self {
        Self {
            start_index,
            limit: Some(limit),
            ..self.clone()
        }
    }

    pub(crate) fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("Recursive", "true".to_string()),
            ("Fields", ITEM_FIELDS.to_string()),
            ("EnableUserData", "true".to_string()),
            ("StartIndex", self.start_index.to_string()),
        ];
        if let Some(types) = self.include_item_types {
            params.push(("IncludeItemTypes", types.to_string()));
        }
        if let Some(parent) = &self.parent_id {
            params.push(("ParentId", parent.clone()));
        }
        if let Some(artist) = &self.artist_id {
            params.push(("ArtistIds", artist.clone()));
        }
        if let Some(genre) = &self.genre_id {
            params.push(("GenreIds", genre.clone()));
        }
        if let Some(term) = &self.search_term {
            params.push(("SearchTerm", term.clone()));
        }
        if let Some(sort_by) = self.sort_by {
            params.push(("SortBy", sort_by.to_string()));
            let order = if self.descending { "Descending" } else { "Ascending" };
            params.push(("SortOrder", order.to_string()));
        }
        if self.favorites_only {
            params.push(("IsFavorite", "true".to_string()));
        }
        if let Some(filters) = self.filters {
            params.push(("Filters", filters.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("Limit", limit.to_string()));
        }
        params
    }
}

impl JellyfinApi {
    /// Une page d'éléments
    pub async fn get_items(&self, query: &ItemQuery) -> Result<ItemsResult> {
        let user_id = self.user_id().await?;
        self.get(&format!("/Users/{}/Items", user_id), &query.params())
            .await
    }

    /// Tous les éléments d'une requête, en enchaînant les pages
    pub async fn get_all_items(&self, query: &ItemQuery, page_size: usize) -> Result<Vec<BaseItem>> {
        let page_size = page_size.max(1);
        let mut items = Vec::new();
        loop {
            let page = self.get_items(&query.page(items.len(), page_size)).await?;
            let fetched = page.items.len();
            items.extend(page.items);
            if fetched < page_size || items.len() >= page.total_record_count as usize {
                break;
            }
        }
        debug!("Fetched {} items", items.len());
        Ok(items)
    }

    /// Un élément par son identifiant
    pub async fn get_item(&self, item_id: &str) -> Result<BaseItem> {
        let user_id = self.user_id().await?;
        self.get(&format!("/Users/{}/Items/{}", user_id, item_id), &[])
            .await
    }

    /// Artistes ayant au moins un album
    pub async fn get_album_artists(&self) -> Result<Vec<BaseItem>> {
        let user_id = self.user_id().await?;
        let params = [
            ("userId", user_id),
            ("Fields", ITEM_FIELDS.to_string()),
            ("EnableUserData", "true".to_string()),
        ];
        let result: ItemsResult = self.get("/Artists/AlbumArtists", &params).await?;
        Ok(result.items)
    }

    /// Genres musicaux, avec leurs compteurs
    pub async fn get_music_genres(&self) -> Result<Vec<BaseItem>> {
        let user_id = self.user_id().await?;
        let params = [("userId", user_id), ("Fields", "ItemCounts".to_string())];
        let result: ItemsResult = self.get("/MusicGenres", &params).await?;
        Ok(result.items)
    }

    /// Entrées d'une playlist, dans l'ordre
    pub async fn get_playlist_items(&self, playlist_id: &str) -> Result<Vec<BaseItem>> {
        let user_id = self.user_id().await?;
        let params = [
            ("userId", user_id),
            ("Fields", ITEM_FIELDS.to_string()),
            ("EnableUserData", "true".to_string()),
        ];
        let result: ItemsResult = self
            .get(&format!("/Playlists/{}/Items", playlist_id), &params)
            .await?;
        Ok(result.items)
    }

    pub async fn get_lyrics(&self, item_id: &str) -> Result<LyricDto> {
        self.get(&format!("/Audio/{}/Lyrics", item_id), &[]).await
    }

    /// URL de streaming direct, authentifiée par `api_key`
    pub async fn stream_url(&self, item_id: &str) -> Result<String> {
        let session = self.session().await?;
        let mut url = Url::parse(&self.url(&format!("/Audio/{}/stream", item_id)))
            .map_err(|e| JellyfinError::Configuration(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("static", "true")
            .append_pair("UserId", &session.user_id)
            .append_pair("DeviceId", &self.settings.device_id)
            .append_pair("api_key", &session.token);
        Ok(url.to_string())
    }

    /// URL de l'image principale d'un élément
    pub fn image_url(&self, item_id: &str, tag: &str) -> String {
        format!("{}/Items/{}/Images/Primary?tag={}", self.base_url(), item_id, tag)
    }
}
