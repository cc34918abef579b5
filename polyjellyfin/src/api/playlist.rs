//! Gestion des playlists du serveur

use super::JellyfinApi;
use crate::error::{JellyfinError, Result};
use crate::models::{CreatePlaylist, PlaylistCreationResult};
use serde_json::Value;
use tracing::info;

impl JellyfinApi {
    /// Crée une playlist audio vide et retourne son identifiant
    pub async fn create_playlist(&self, name: &str) -> Result<String> {
        let user_id = self.user_id().await?;
        let body = serde_json::to_value(CreatePlaylist {
            name,
            user_id: &user_id,
            media_type: "Audio",
            ids: Vec::new(),
        })?;
        let response = self
            .post("/Playlists", &[], Some(&body))
            .await?
            .ok_or_else(|| JellyfinError::NotFound(format!("created playlist {}", name)))?;
        let created: PlaylistCreationResult = serde_json::from_value(response)?;
        info!("Created Jellyfin playlist {} ({})", name, created.id);
        Ok(created.id)
    }

    /// Renomme un élément
    ///
    /// `POST /Items/{id}` attend l'élément complet : on relit sa forme
    /// brute pour ne modifier que `Name`.
    pub async fn rename_item(&self, item_id: &str, name: &str) -> Result<()> {
        let user_id = self.user_id().await?;
        let mut item: Value = self
            .get(&format!("/Users/{}/Items/{}", user_id, item_id), &[])
            .await?;
        match item.as_object_mut() {
            Some(fields) => {
                fields.insert("Name".to_string(), Value::String(name.to_string()));
            }
            None => return Err(JellyfinError::NotFound(item_id.to_string())),
        }
        self.post(&format!("/Items/{}", item_id), &[], Some(&item))
            .await?;
        Ok(())
    }

    pub async fn delete_item(&self, item_id: &str) -> Result<()> {
        self.delete(&format!("/Items/{}", item_id), &[]).await
    }

    /// Ajoute des éléments en fin de playlist
    pub async fn add_to_playlist(&self, playlist_id: &str, item_ids: &[&str]) -> Result<()> {
        let user_id = self.user_id().await?;
        let params = [("ids", item_ids.join(",")), ("userId", user_id)];
        self.post(&format!("/Playlists/{}/Items", playlist_id), &params, None)
            .await?;
        Ok(())
    }

    /// Retire des entrées de playlist (identifiants d'entrée, pas d'élément)
    pub async fn remove_from_playlist(&self, playlist_id: &str, entry_ids: &[String]) -> Result<()> {
        let params = [("entryIds", entry_ids.join(","))];
        self.delete(&format!("/Playlists/{}/Items", playlist_id), &params)
            .await
    }
}
