//! Calls the player makes into the core
//!
//! The player itself (audio output, media session) lives outside this
//! crate. [`PlaybackCoordinator`] turns its events into aggregator and
//! resumption queue operations.

use crate::aggregator::MediaAggregator;
use crate::resumption::{RestoredQueue, ResumptionQueueStore};
use polysource::{Audio, Identifier, MediaError, ProviderIdentifier, Result, first};
use tracing::{debug, warn};

/// Track ready to be handed to the player
#[derive(Debug, Clone, PartialEq)]
pub struct PlayableItem {
    pub audio: Audio,
    /// URI the player opens (`file://` or an authenticated stream URL)
    pub stream_uri: String,
    pub provider: ProviderIdentifier,
}

#[derive(Debug, Clone)]
pub struct PlaybackCoordinator {
    aggregator: MediaAggregator,
    resumption: ResumptionQueueStore,
}

impl PlaybackCoordinator {
    pub fn new(aggregator: MediaAggregator, resumption: ResumptionQueueStore) -> Self {
        Self {
            aggregator,
            resumption,
        }
    }

    pub fn aggregator(&self) -> &MediaAggregator {
        &self.aggregator
    }

    pub fn resumption(&self) -> &ResumptionQueueStore {
        &self.resumption
    }

    async fn resolve(&self, id: &Identifier) -> Result<PlayableItem> {
        let (provider, _) = self
            .aggregator
            .identify(id)
            .await
            .ok_or_else(|| MediaError::not_found(id))?;
        let audio = first(self.aggregator.audio(id)).await?;
        let stream_uri = self.aggregator.stream_uri(id).await?;
        Ok(PlayableItem {
            audio,
            stream_uri,
            provider,
        })
    }

    /// Resolves tracks for the player, skipping those that fail
    pub async fn resolve_queue_items(&self, ids: &[Identifier]) -> Vec<PlayableItem> {
        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            match self.resolve(id).await {
                Ok(item) => items.push(item),
                Err(e) => warn!(id = %id, "Skipping unplayable track: {}", e),
            }
        }
        items
    }

    /// Rebuilds the queue saved by the previous run
    pub async fn restore_queue(&self) -> Result<RestoredQueue<PlayableItem>> {
        self.resumption
            .reconstruct_with(|id| async move {
                match self.resolve(&id).await {
                    Ok(item) => Some((id, item)),
                    Err(e) => {
                        debug!(id = %id, "Dropping queue entry: {}", e);
                        None
                    }
                }
            })
            .await
    }

    /// The player moved to another track
    ///
    /// Also reports the new track as played to its provider; providers
    /// that keep no play history are ignored.
    pub async fn on_track_transition(&self, index: usize, position_ms: u64) -> Result<()> {
        self.resumption.update_position(index, position_ms)?;

        let queue = self.resumption.load()?;
        if let Some(id) = queue.identifiers().get(index) {
            match self.aggregator.notify_played(id).await {
                Ok(()) | Err(MediaError::NotImplemented(_)) => {}
                Err(e) => warn!(id = %id, "Cannot report track as played: {}", e),
            }
        }
        Ok(())
    }

    /// The player got a new queue
    pub fn on_queue_replaced(
        &self,
        ids: &[Identifier],
        start_index: usize,
        start_position_ms: u64,
    ) -> Result<()> {
        self.resumption.save(ids, start_index, start_position_ms)
    }

    pub async fn toggle_favorite(&self, audio: &Identifier, favorite: bool) -> Result<()> {
        self.aggregator.set_favorite(audio, favorite).await
    }

    pub fn set_navigation_provider(&self, provider: ProviderIdentifier) -> Result<()> {
        self.aggregator.set_navigation_provider(provider)
    }
}
