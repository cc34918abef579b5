use anyhow::Result;
use futures::StreamExt;
use polyconfig::{Config, get_config};
use polycore::{
    DefaultBackendFactory, MediaAggregator, PlaybackCoordinator, Preferences, ProviderCatalog,
    ResumptionQueueStore,
};
use polydb::{Database, QueueStore, ServerStore, StatsStore};
use polylocal::{LocalLibrary, MemoryIndex, StorageVolume, VolumeState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(config: &Config) {
    if !config.get_log_enable_console().unwrap_or(true) {
        return;
    }
    let level = config
        .get_log_min_level()
        .unwrap_or_else(|_| "INFO".to_string())
        .to_lowercase();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Volumes known at startup: the configured primary volume
fn startup_volumes(config: &Config) -> Vec<StorageVolume> {
    match config.get_primary_volume_dir() {
        Ok(dir) => vec![StorageVolume::new(
            None,
            "Internal storage",
            dir,
            VolumeState::Mounted,
            true,
        )],
        Err(e) => {
            warn!("⚠️ Primary volume unavailable: {}", e);
            vec![]
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = get_config();
    init_logging(&config);

    // ========== PHASE 1 : Persistence ==========
    info!("💾 Opening database...");
    let db = Database::from_config(&config)?;
    let stats = StatsStore::new(db.clone());
    let servers = ServerStore::new(db.clone())?;
    info!("✅ {} remote server(s) configured", servers.list().len());

    // ========== PHASE 2 : Catalog ==========
    let (_volumes_tx, volumes) = watch::channel(startup_volumes(&config));
    let index = Arc::new(MemoryIndex::new());
    let library = Arc::new(LocalLibrary::new(index, stats.clone(), volumes.clone()));

    let preferences = Arc::new(Preferences::new(config.clone()));
    let catalog = Arc::new(ProviderCatalog::spawn(
        volumes,
        preferences.watch_split_local_devices(),
        servers.subscribe(),
        Arc::new(DefaultBackendFactory::new(library, config.clone())),
    ));

    let aggregator = MediaAggregator::new(catalog, preferences, stats);
    for provider in aggregator.providers() {
        info!("  - {} ({})", provider.name, provider.id);
    }

    let mut navigation = aggregator.navigation_provider_stream();
    tokio::spawn(async move {
        while let Some(provider) = navigation.next().await {
            match provider {
                Some(p) => info!("🧭 Browsing {} ({})", p.name, p.id),
                None => info!("🧭 No provider to browse"),
            }
        }
    });

    // ========== PHASE 3 : Playback state ==========
    let resumption = ResumptionQueueStore::new(QueueStore::new(db));
    let coordinator = PlaybackCoordinator::new(aggregator.clone(), resumption);
    match coordinator.restore_queue().await {
        Ok(queue) if queue.is_empty() => info!("No queue to resume"),
        Ok(queue) => info!(
            "▶️ Resumable queue: {} track(s), track {} at {} ms",
            queue.items.len(),
            queue.start_index + 1,
            queue.start_position_ms
        ),
        Err(e) => warn!("⚠️ Failed to restore queue: {}", e),
    }

    let gc_interval = config.get_gc_interval_secs().unwrap_or(3600) as u64;
    let gc = aggregator.spawn_periodic_gc(Duration::from_secs(gc_interval));

    info!("✅ Polyphon is ready!");
    info!("Press Ctrl+C to stop...");
    tokio::signal::ctrl_c().await?;

    gc.abort();
    info!("👋 Polyphon stopped");
    Ok(())
}
