//! Annotations de l'utilisateur : favoris (étoiles) et écoutes

use super::SubsonicApi;
use crate::error::Result;
use crate::models::SearchResult;

/// Élément à (dé)marquer comme favori
///
/// `star`/`unstar` prennent un paramètre différent par type d'élément.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StarTarget<'a> {
    Song(&'a str),
    Album(&'a str),
    Artist(&'a str),
}

impl StarTarget<'_> {
    fn param(&self) -> (&'static str, String) {
        match self {
            StarTarget::Song(id) => ("id", id.to_string()),
            StarTarget::Album(id) => ("albumId", id.to_string()),
            StarTarget::Artist(id) => ("artistId", id.to_string()),
        }
    }
}

impl SubsonicApi {
    /// Favoris de l'utilisateur (artistes, albums, morceaux)
    pub async fn get_starred2(&self) -> Result<SearchResult> {
        self.get("getStarred2", &[], "starred2").await
    }

    pub async fn star(&self, target: StarTarget<'_>) -> Result<()> {
        self.call("star", &[target.param()]).await
    }

    pub async fn unstar(&self, target: StarTarget<'_>) -> Result<()> {
        self.call("unstar", &[target.param()]).await
    }

    /// Enregistre une écoute complète (`submission=true`)
    pub async fn scrobble(&self, song_id: &str) -> Result<()> {
        let params = [
            ("id", song_id.to_string()),
            ("submission", "true".to_string()),
        ];
        self.call("scrobble", &params).await
    }
}
