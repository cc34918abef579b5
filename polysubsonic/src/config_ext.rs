//! Extension pour intégrer les réglages Subsonic dans polyconfig
//!
//! Les serveurs eux-mêmes sont des enregistrements de la base (`polydb`) ;
//! la configuration ne porte que les réglages communs à tous les serveurs
//! Subsonic.

use anyhow::{Result, anyhow};
use polyconfig::Config;
use serde_yaml::Value;

/// Taille de page par défaut des listes (`getAlbumList2`, `search3`)
pub const DEFAULT_PAGE_SIZE: usize = 500;

/// Trait d'extension pour gérer la configuration Subsonic dans polyconfig
///
/// # Exemple
///
/// ```rust,ignore
/// use polyconfig::get_config;
/// use polysubsonic::SubsonicConfigExt;
///
/// let config = get_config();
/// let page_size = config.get_subsonic_page_size()?;
/// ```
pub trait SubsonicConfigExt {
    /// Taille de page des requêtes paginées (1 à 500)
    fn get_subsonic_page_size(&self) -> Result<usize>;

    fn set_subsonic_page_size(&self, size: usize) -> Result<()>;
}

impl SubsonicConfigExt for Config {
    fn get_subsonic_page_size(&self) -> Result<usize> {
        match self.get_value(&["sources", "subsonic", "page_size"]) {
            Ok(Value::Number(n)) => n
                .as_u64()
                .map(|n| (n as usize).clamp(1, DEFAULT_PAGE_SIZE))
                .ok_or_else(|| anyhow!("sources.subsonic.page_size must be a positive integer")),
            Ok(_) => Err(anyhow!("sources.subsonic.page_size must be a number")),
            Err(_) => Ok(DEFAULT_PAGE_SIZE),
        }
    }

    fn set_subsonic_page_size(&self, size: usize) -> Result<()> {
        if size == 0 || size > DEFAULT_PAGE_SIZE {
            return Err(anyhow!("page size must be between 1 and {}", DEFAULT_PAGE_SIZE));
        }
        self.set_value(
            &["sources", "subsonic", "page_size"],
            Value::Number(serde_yaml::Number::from(size as u64)),
        )
    }
}
