//! # polycore - Provider catalog and media aggregator
//!
//! Ties the backends together:
//!
//! - [`Preferences`]: split local devices, preferred navigation provider
//! - [`ProviderCatalog`]: live list of providers with their backends
//! - [`MediaAggregator`]: routing of queries to the navigation provider or
//!   to the owner of an identifier, statistics cleanup
//! - [`ResumptionQueueStore`]: persisted playback queue and its healing
//! - [`PlaybackCoordinator`]: entry points used by the player
//!
//! ```text
//! volumes ─┐
//! split ───┼─> ProviderCatalog ──> MediaAggregator ──> PlaybackCoordinator
//! servers ─┘                            │                     │
//!                  navigation pref ─────┘     ResumptionQueueStore
//! ```
//!
//! # Example
//!
//! ```no_run
//! use polycore::{DefaultBackendFactory, MediaAggregator, Preferences, ProviderCatalog};
//! use polydb::{Database, ServerStore, StatsStore};
//! use polylocal::{LocalLibrary, MemoryIndex};
//! use polysource::{SortingRule, first};
//! use std::sync::Arc;
//! use tokio::sync::watch;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = polyconfig::get_config();
//! let db = Database::from_config(&config)?;
//! let stats = StatsStore::new(db.clone());
//! let (_volumes_tx, volumes) = watch::channel(vec![]);
//! let library = Arc::new(LocalLibrary::new(Arc::new(MemoryIndex::new()), stats.clone(), volumes.clone()));
//!
//! let preferences = Arc::new(Preferences::new(config.clone()));
//! let servers = ServerStore::new(db)?;
//! let catalog = Arc::new(ProviderCatalog::spawn(
//!     volumes,
//!     preferences.watch_split_local_devices(),
//!     servers.subscribe(),
//!     Arc::new(DefaultBackendFactory::new(library, config)),
//! ));
//!
//! let aggregator = MediaAggregator::new(catalog, preferences, stats);
//! let albums = first(aggregator.albums(SortingRule::default())).await?;
//! println!("{} albums", albums.len());
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod catalog;
pub mod playback;
pub mod preferences;
pub mod resumption;

pub use aggregator::MediaAggregator;
pub use catalog::{
    BackendArgs, BackendFactory, Catalog, CatalogEntry, DefaultBackendFactory, ProviderCatalog,
};
pub use playback::{PlayableItem, PlaybackCoordinator};
pub use preferences::{NavigationConfigExt, Preferences};
pub use resumption::{RestoredQueue, ResumptionPlaylist, ResumptionQueueStore};
