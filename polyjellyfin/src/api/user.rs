//! Données de l'utilisateur : favoris et écoutes

use super::JellyfinApi;
use crate::error::Result;

impl JellyfinApi {
    /// Marque ou démarque un élément comme favori
    pub async fn set_favorite(&self, item_id: &str, favorite: bool) -> Result<()> {
        let user_id = self.user_id().await?;
        let path = format!("/Users/{}/FavoriteItems/{}", user_id, item_id);
        if favorite {
            self.post(&path, &[], None).await?;
            Ok(())
        } else {
            self.delete(&path, &[]).await
        }
    }

    /// Enregistre une écoute (incrémente le compteur côté serveur)
    pub async fn mark_played(&self, item_id: &str) -> Result<()> {
        let user_id = self.user_id().await?;
        self.post(
            &format!("/Users/{}/PlayedItems/{}", user_id, item_id),
            &[],
            None,
        )
        .await?;
        Ok(())
    }
}
