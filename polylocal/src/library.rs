//! State shared by every local backend instance

use crate::index::LocalIndex;
use crate::volume::StorageVolume;
use polydb::StatsStore;
use polysource::{ChangeSignal, ChangeTracker, LiveStream, Result, live_from};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Local index, statistics and change notification
///
/// The undivided provider and every per-volume provider wrap the same
/// library, so a favorite toggled through one of them re-emits the streams
/// of all of them.
#[derive(Debug)]
pub struct LocalLibrary {
    index: Arc<dyn LocalIndex>,
    stats: StatsStore,
    volumes: watch::Receiver<Vec<StorageVolume>>,
    tracker: ChangeTracker,
}

impl LocalLibrary {
    pub fn new(
        index: Arc<dyn LocalIndex>,
        stats: StatsStore,
        volumes: watch::Receiver<Vec<StorageVolume>>,
    ) -> Self {
        Self {
            index,
            stats,
            volumes,
            tracker: ChangeTracker::new(),
        }
    }

    pub fn index(&self) -> &Arc<dyn LocalIndex> {
        &self.index
    }

    pub fn stats(&self) -> &StatsStore {
        &self.stats
    }

    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    /// Volume currently known under `backend_name`
    pub fn volume(&self, backend_name: &str) -> Option<StorageVolume> {
        self.volumes
            .borrow()
            .iter()
            .find(|v| v.backend_name() == Some(backend_name))
            .cloned()
    }

    /// Backend names of the volumes whose content can be read now
    pub fn readable_volumes(&self) -> HashSet<String> {
        self.volumes
            .borrow()
            .iter()
            .filter(|v| v.is_eligible())
            .filter_map(|v| v.backend_name().map(str::to_string))
            .collect()
    }

    /// Marks library data (statistics, favorites) as changed
    pub fn notify_changed(&self) {
        self.tracker.bump();
    }

    /// Runs `query` now and after every library, index or volume change
    pub fn live<T, F, Fut>(&self, query: F) -> LiveStream<T>
    where
        T: Send + 'static,
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let signals: Vec<Box<dyn ChangeSignal>> = vec![
            Box::new(self.tracker.subscribe()),
            Box::new(self.index.changes()),
            Box::new(self.volumes.clone()),
        ];
        live_from(signals, query)
    }
}
