//! Gestion des playlists du serveur

use super::SubsonicApi;
use crate::error::{Result, SubsonicError};
use crate::models::{PlaylistEntry, Playlists};
use tracing::info;

impl SubsonicApi {
    /// Liste les playlists de l'utilisateur (sans leurs entrées)
    pub async fn get_playlists(&self) -> Result<Vec<PlaylistEntry>> {
        let playlists: Playlists = self.get("getPlaylists", &[], "playlists").await?;
        Ok(playlists.playlist)
    }

    /// Récupère une playlist avec ses entrées
    pub async fn get_playlist(&self, playlist_id: &str) -> Result<PlaylistEntry> {
        self.get("getPlaylist", &[("id", playlist_id.to_string())], "playlist")
            .await
    }

    /// Crée une playlist vide
    ///
    /// Les serveurs antérieurs à l'API 1.14.0 ne renvoient pas la playlist
    /// créée : on la retrouve alors par son nom.
    pub async fn create_playlist(&self, name: &str) -> Result<PlaylistEntry> {
        let body = self
            .request("createPlaylist", &[("name", name.to_string())])
            .await?;
        info!("Created Subsonic playlist {}", name);

        if let Some(playlist) = body.get("playlist") {
            return Ok(serde_json::from_value(playlist.clone())?);
        }

        self.get_playlists()
            .await?
            .into_iter()
            .rev()
            .find(|p| p.name == name)
            .ok_or_else(|| SubsonicError::NotFound(format!("created playlist {}", name)))
    }

    /// Met à jour une playlist
    ///
    /// # Arguments
    ///
    /// * `name` - nouveau nom, inchangé si `None`
    /// * `songs_to_add` - morceaux ajoutés en fin de playlist
    /// * `indexes_to_remove` - positions (avant modification) à retirer
    pub async fn update_playlist(
        &self,
        playlist_id: &str,
        name: Option<&str>,
        songs_to_add: &[&str],
        indexes_to_remove: &[usize],
    ) -> Result<()> {
        let mut params = vec![("playlistId", playlist_id.to_string())];
        if let Some(name) = name {
            params.push(("name", name.to_string()));
        }
        params.extend(songs_to_add.iter().map(|id| ("songIdToAdd", id.to_string())));
        params.extend(
            indexes_to_remove
                .iter()
                .map(|index| ("songIndexToRemove", index.to_string())),
        );
        self.call("updatePlaylist", &params).await
    }

    pub async fn delete_playlist(&self, playlist_id: &str) -> Result<()> {
        self.call("deletePlaylist", &[("id", playlist_id.to_string())])
            .await
    }
}
