//! Extension pour intégrer les réglages Jellyfin dans polyconfig
//!
//! Les serveurs sont des enregistrements de la base (`polydb`) ; la
//! configuration ne porte que les réglages communs à tous les serveurs
//! Jellyfin.

use anyhow::{Result, anyhow};
use polyconfig::Config;
use serde_yaml::Value;

/// Taille de page par défaut des requêtes `/Users/{uid}/Items`
pub const DEFAULT_PAGE_SIZE: usize = 200;

/// Limite haute acceptée pour la taille de page
const MAX_PAGE_SIZE: usize = 1000;

/// Nom d'appareil annoncé par défaut
pub const DEFAULT_DEVICE_NAME: &str = "Polyphon";

/// Trait d'extension pour gérer la configuration Jellyfin dans polyconfig
///
/// # Exemple
///
/// ```rust,ignore
/// use polyconfig::get_config;
/// use polyjellyfin::JellyfinConfigExt;
///
/// let config = get_config();
/// let device = config.get_jellyfin_device_name()?;
/// ```
pub trait JellyfinConfigExt {
    /// Taille de page des requêtes paginées
    fn get_jellyfin_page_size(&self) -> Result<usize>;

    fn set_jellyfin_page_size(&self, size: usize) -> Result<()>;

    /// Nom d'appareil affiché dans le tableau de bord du serveur
    fn get_jellyfin_device_name(&self) -> Result<String>;

    fn set_jellyfin_device_name(&self, name: &str) -> Result<()>;
}

impl JellyfinConfigExt for Config {
    fn get_jellyfin_page_size(&self) -> Result<usize> {
        match self.get_value(&["sources", "jellyfin", "page_size"]) {
            Ok(Value::Number(n)) => n
                .as_u64()
                .map(|n| (n as usize).clamp(1, MAX_PAGE_SIZE))
                .ok_or_else(|| anyhow!("sources.jellyfin.page_size must be a positive integer")),
            Ok(_) => Err(anyhow!("sources.jellyfin.page_size must be a number")),
            Err(_) => Ok(DEFAULT_PAGE_SIZE),
        }
    }

    fn set_jellyfin_page_size(&self, size: usize) -> Result<()> {
        if size == 0 || size > MAX_PAGE_SIZE {
            return Err(anyhow!("page size must be between 1 and {}", MAX_PAGE_SIZE));
        }
        self.set_value(
            &["sources", "jellyfin", "page_size"],
            Value::Number(serde_yaml::Number::from(size as u64)),
        )
    }

    fn get_jellyfin_device_name(&self) -> Result<String> {
        match self.get_value(&["sources", "jellyfin", "device_name"]) {
            Ok(Value::String(name)) if !name.trim().is_empty() => Ok(name.trim().to_string()),
            _ => Ok(DEFAULT_DEVICE_NAME.to_string()),
        }
    }

    fn set_jellyfin_device_name(&self, name: &str) -> Result<()> {
        self.set_value(
            &["sources", "jellyfin", "device_name"],
            Value::String(name.to_string()),
        )
    }
}
