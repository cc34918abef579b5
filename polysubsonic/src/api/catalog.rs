//! Module d'accès au catalogue (schéma ID3 : artistes, albums, morceaux)

use super::SubsonicApi;
use crate::error::Result;
use crate::models::*;
use tracing::debug;

/// Ordres acceptés par `getAlbumList2`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlbumListType {
    AlphabeticalByName,
    AlphabeticalByArtist,
    Newest,
    Recent,
    Frequent,
    Starred,
    Random,
}

impl AlbumListType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlbumListType::AlphabeticalByName => "alphabeticalByName",
            AlbumListType::AlphabeticalByArtist => "alphabeticalByArtist",
            AlbumListType::Newest => "newest",
            AlbumListType::Recent => "recent",
            AlbumListType::Frequent => "frequent",
            AlbumListType::Starred => "starred",
            AlbumListType::Random => "random",
        }
    }
}

impl SubsonicApi {
    /// Récupère tous les artistes (index alphabétique aplati)
    pub async fn get_artists(&self) -> Result<Vec<ArtistId3>> {
        let artists: Artists = self.get("getArtists", &[], "artists").await?;
        let artists: Vec<ArtistId3> = artists
            .index
            .into_iter()
            .flat_map(|index| index.artist)
            .collect();
        debug!("Fetched {} artists", artists.len());
        Ok(artists)
    }

    /// Récupère un artiste avec ses albums
    pub async fn get_artist(&self, artist_id: &str) -> Result<ArtistId3> {
        self.get("getArtist", &[("id", artist_id.to_string())], "artist")
            .await
    }

    /// Récupère un album avec ses morceaux
    pub async fn get_album(&self, album_id: &str) -> Result<AlbumId3> {
        self.get("getAlbum", &[("id", album_id.to_string())], "album")
            .await
    }

    /// Récupère une page d'albums
    pub async fn get_album_list2(
        &self,
        list_type: AlbumListType,
        size: usize,
        offset: usize,
    ) -> Result<Vec<AlbumId3>> {
        let params = [
            ("type", list_type.as_str().to_string()),
            ("size", size.to_string()),
            ("offset", offset.to_string()),
        ];
        let list: AlbumList2 = self.get("getAlbumList2", &params, "albumList2").await?;
        Ok(list.album)
    }

    /// Récupère tous les albums en enchaînant les pages
    pub async fn get_all_albums(
        &self,
        list_type: AlbumListType,
        page_size: usize,
    ) -> Result<Vec<AlbumId3>> {
        let page_size = page_size.clamp(1, 500);
        let mut albums = Vec::new();
        loop {
            let page = self
                .get_album_list2(list_type, page_size, albums.len())
                .await?;
            let done = page.len() < page_size;
            albums.extend(page);
            if done {
                break;
            }
        }
        debug!("Fetched {} albums ({})", albums.len(), list_type.as_str());
        Ok(albums)
    }

    /// Récupère un morceau
    pub async fn get_song(&self, song_id: &str) -> Result<Song> {
        self.get("getSong", &[("id", song_id.to_string())], "song")
            .await
    }

    /// Récupère tous les morceaux
    ///
    /// L'API n'a pas de liste complète des morceaux : on parcourt `search3`
    /// avec une requête vide, que Navidrome et Gonic interprètent comme
    /// « tout ».
    pub async fn get_all_songs(&self, page_size: usize) -> Result<Vec<Song>> {
        let page_size = page_size.clamp(1, 500);
        let mut songs = Vec::new();
        loop {
            let page = self.search3("", 0, 0, page_size, songs.len()).await?.song;
            let done = page.len() < page_size;
            songs.extend(page);
            if done {
                break;
            }
        }
        debug!("Fetched {} songs", songs.len());
        Ok(songs)
    }

    pub async fn get_genres(&self) -> Result<Vec<GenreEntry>> {
        let genres: Genres = self.get("getGenres", &[], "genres").await?;
        Ok(genres.genre)
    }

    /// Récupère les morceaux d'un genre
    pub async fn get_songs_by_genre(&self, genre: &str, count: usize) -> Result<Vec<Song>> {
        let params = [
            ("genre", genre.to_string()),
            ("count", count.clamp(1, 500).to_string()),
        ];
        let songs: SongsByGenre = self.get("getSongsByGenre", &params, "songsByGenre").await?;
        Ok(songs.song)
    }

    /// Recherche plein texte
    pub async fn search3(
        &self,
        query: &str,
        artist_count: usize,
        album_count: usize,
        song_count: usize,
        song_offset: usize,
    ) -> Result<SearchResult> {
        let params = [
            ("query", query.to_string()),
            ("artistCount", artist_count.to_string()),
            ("albumCount", album_count.to_string()),
            ("songCount", song_count.to_string()),
            ("songOffset", song_offset.to_string()),
        ];
        self.get("search3", &params, "searchResult3").await
    }

    /// Paroles d'un morceau, recherchées par artiste et titre
    pub async fn get_lyrics(&self, artist: &str, title: &str) -> Result<Lyrics> {
        let params = [("artist", artist.to_string()), ("title", title.to_string())];
        self.get("getLyrics", &params, "lyrics").await
    }

    /// URL de streaming d'un morceau
    pub fn stream_url(&self, song_id: &str) -> Result<String> {
        self.signed_url("stream", &[("id", song_id.to_string())])
    }

    /// URL de la pochette identifiée par `cover_art`
    pub fn cover_art_url(&self, cover_art: &str) -> Result<String> {
        self.signed_url("getCoverArt", &[("id", cover_art.to_string())])
    }
}
