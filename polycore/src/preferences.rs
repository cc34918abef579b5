//! User preferences the core reacts to
//!
//! Two values drive the core: whether local volumes are exposed as separate
//! providers, and which provider the user picked for navigation. Both live
//! in the configuration file (`library.split_local_devices`,
//! `library.navigation_provider`) and are republished on `watch` channels
//! so the catalog and the aggregator follow them.

use anyhow::{Result, anyhow};
use polyconfig::Config;
use polysource::{BackendKind, ProviderIdentifier};
use serde_yaml::{Mapping, Number, Value};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

const SPLIT_PATH: &[&str] = &["library", "split_local_devices"];
const NAVIGATION_PATH: &[&str] = &["library", "navigation_provider"];

/// Extension trait storing navigation preferences in polyconfig
///
/// ```rust,ignore
/// use polycore::NavigationConfigExt;
/// use polyconfig::get_config;
///
/// let split = get_config().get_split_local_devices()?;
/// ```
pub trait NavigationConfigExt {
    fn get_split_local_devices(&self) -> Result<bool>;

    fn set_split_local_devices(&self, split: bool) -> Result<()>;

    /// Preferred navigation provider, `None` when the user never picked one
    fn get_navigation_provider(&self) -> Result<Option<ProviderIdentifier>>;

    fn set_navigation_provider(&self, provider: Option<ProviderIdentifier>) -> Result<()>;
}

impl NavigationConfigExt for Config {
    fn get_split_local_devices(&self) -> Result<bool> {
        match self.get_value(SPLIT_PATH) {
            Ok(Value::Bool(split)) => Ok(split),
            Ok(_) => Err(anyhow!("library.split_local_devices must be a boolean")),
            Err(_) => Ok(false),
        }
    }

    fn set_split_local_devices(&self, split: bool) -> Result<()> {
        self.set_value(SPLIT_PATH, Value::Bool(split))
    }

    fn get_navigation_provider(&self) -> Result<Option<ProviderIdentifier>> {
        let value = match self.get_value(NAVIGATION_PATH) {
            Ok(Value::Mapping(map)) => map,
            Ok(Value::Null) | Err(_) => return Ok(None),
            Ok(_) => return Err(anyhow!("library.navigation_provider must be a mapping")),
        };

        let kind = value
            .get("kind")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("library.navigation_provider.kind is missing"))?
            .parse::<BackendKind>()
            .map_err(|e| anyhow!(e))?;
        let instance_id = value
            .get("instance_id")
            .and_then(Value::as_i64)
            .ok_or_else(|| anyhow!("library.navigation_provider.instance_id is missing"))?;

        Ok(Some(ProviderIdentifier::new(kind, instance_id)))
    }

    fn set_navigation_provider(&self, provider: Option<ProviderIdentifier>) -> Result<()> {
        match provider {
            Some(id) => {
                let mut map = Mapping::new();
                map.insert("kind".into(), Value::String(id.kind.as_str().to_string()));
                map.insert("instance_id".into(), Value::Number(Number::from(id.instance_id)));
                self.set_value(NAVIGATION_PATH, Value::Mapping(map))
            }
            None => self.remove_value(NAVIGATION_PATH),
        }
    }
}

/// Preference service with change notification
///
/// Reads are served from the channels; writes persist to the configuration
/// first and only then notify subscribers.
#[derive(Debug)]
pub struct Preferences {
    config: Arc<Config>,
    split: watch::Sender<bool>,
    navigation: watch::Sender<Option<ProviderIdentifier>>,
}

impl Preferences {
    pub fn new(config: Arc<Config>) -> Self {
        let split = config.get_split_local_devices().unwrap_or_else(|e| {
            warn!("Invalid split preference, using default: {}", e);
            false
        });
        let navigation = config.get_navigation_provider().unwrap_or_else(|e| {
            warn!("Invalid navigation preference, ignoring it: {}", e);
            None
        });

        Self {
            config,
            split: watch::Sender::new(split),
            navigation: watch::Sender::new(navigation),
        }
    }

    pub fn split_local_devices(&self) -> bool {
        *self.split.borrow()
    }

    pub fn set_split_local_devices(&self, split: bool) -> Result<()> {
        self.config.set_split_local_devices(split)?;
        if self.split.send_if_modified(|current| std::mem::replace(current, split) != split) {
            info!(split, "Local devices split preference changed");
        }
        Ok(())
    }

    pub fn watch_split_local_devices(&self) -> watch::Receiver<bool> {
        self.split.subscribe()
    }

    pub fn navigation_provider(&self) -> Option<ProviderIdentifier> {
        *self.navigation.borrow()
    }

    /// Stores the preferred navigation provider
    ///
    /// The provider does not have to be in the catalog.
    pub fn set_navigation_provider(&self, provider: Option<ProviderIdentifier>) -> Result<()> {
        self.config.set_navigation_provider(provider)?;
        let changed = self
            .navigation
            .send_if_modified(|current| std::mem::replace(current, provider) != provider);
        if changed {
            match provider {
                Some(id) => info!(provider = %id, "Navigation provider preference set"),
                None => info!("Navigation provider preference cleared"),
            }
        }
        Ok(())
    }

    pub fn watch_navigation_provider(&self) -> watch::Receiver<Option<ProviderIdentifier>> {
        self.navigation.subscribe()
    }
}
