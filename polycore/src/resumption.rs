//! Resumption queue
//!
//! Persists the playback queue (track identifiers plus a cursor) and
//! rebuilds it after a restart, dropping the tracks that can no longer be
//! resolved while keeping the cursor on the right track.

use crate::aggregator::MediaAggregator;
use polydb::QueueStore;
use polysource::{Audio, Identifier, Result, first};
use std::future::Future;
use tracing::{debug, info};

/// Ordered track identifiers with the position to resume from
///
/// `start_index` is always a valid index of `identifiers`, or 0 when the
/// list is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumptionPlaylist {
    identifiers: Vec<Identifier>,
    start_index: usize,
    start_position_ms: u64,
}

impl ResumptionPlaylist {
    /// Builds a playlist, clamping `start_index` into the list
    pub fn new(identifiers: Vec<Identifier>, start_index: usize, start_position_ms: u64) -> Self {
        let start_index = start_index.min(identifiers.len().saturating_sub(1));
        Self {
            identifiers,
            start_index,
            start_position_ms,
        }
    }

    pub fn identifiers(&self) -> &[Identifier] {
        &self.identifiers
    }

    pub fn start_index(&self) -> usize {
        self.start_index
    }

    pub fn start_position_ms(&self) -> u64 {
        self.start_position_ms
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    /// Identifier under the cursor
    pub fn current(&self) -> Option<&Identifier> {
        self.identifiers.get(self.start_index)
    }
}

/// Queue rebuilt from stored identifiers
#[derive(Debug, Clone, PartialEq)]
pub struct RestoredQueue<T> {
    pub items: Vec<T>,
    pub start_index: usize,
    pub start_position_ms: u64,
}

impl<T> RestoredQueue<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            start_index: 0,
            start_position_ms: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Removes the unresolved (`None`) entries of a queue
///
/// - an entry dropped before the cursor moves the cursor one step back;
/// - dropping the entry under the cursor keeps the cursor on the slot it
///   pointed to, now holding the next surviving entry, and restarts it
///   from the beginning;
/// - entries dropped after the cursor leave it alone.
///
/// When the cursor entry and everything after it are gone, the cursor
/// lands on the last surviving entry.
pub fn heal<T>(
    resolved: Vec<Option<T>>,
    start_index: usize,
    start_position_ms: u64,
) -> RestoredQueue<T> {
    let mut index = start_index;
    let mut position = start_position_ms;
    let mut items = Vec::with_capacity(resolved.len());

    for (i, entry) in resolved.into_iter().enumerate() {
        match entry {
            Some(item) => items.push(item),
            None if i < start_index => index -= 1,
            None if i == start_index => position = 0,
            None => {}
        }
    }

    if items.is_empty() {
        return RestoredQueue::empty();
    }
    if index >= items.len() {
        index = items.len() - 1;
        position = 0;
    }

    RestoredQueue {
        items,
        start_index: index,
        start_position_ms: position,
    }
}

/// Persistent resumption queue
#[derive(Debug, Clone)]
pub struct ResumptionQueueStore {
    queue: QueueStore,
}

impl ResumptionQueueStore {
    pub fn new(queue: QueueStore) -> Self {
        Self { queue }
    }

    /// Replaces the stored queue
    ///
    /// Readers see either the previous queue or this one, never a mix.
    pub fn save(
        &self,
        identifiers: &[Identifier],
        start_index: usize,
        start_position_ms: u64,
    ) -> Result<()> {
        let start_index = start_index.min(identifiers.len().saturating_sub(1));
        self.queue
            .replace(identifiers, start_index, start_position_ms)?;
        debug!(
            tracks = identifiers.len(),
            start_index, start_position_ms, "Resumption queue saved"
        );
        Ok(())
    }

    /// Moves the cursor; the identifiers are untouched
    pub fn update_position(&self, start_index: usize, start_position_ms: u64) -> Result<()> {
        self.queue.update_position(start_index, start_position_ms)?;
        Ok(())
    }

    /// Stored queue, empty when nothing was saved
    pub fn load(&self) -> Result<ResumptionPlaylist> {
        let stored = self.queue.load()?;
        Ok(ResumptionPlaylist::new(
            stored.identifiers,
            stored.start_index,
            stored.start_position_ms,
        ))
    }

    pub fn clear(&self) -> Result<()> {
        self.queue.clear()?;
        Ok(())
    }

    /// Rebuilds the stored queue with `resolve`
    ///
    /// Identifiers are resolved one by one, in order; `None` drops one.
    /// When tracks were dropped the healed queue replaces the stored one,
    /// so later cursor updates refer to the healed list. An empty result
    /// clears the store.
    pub async fn reconstruct_with<T, F, Fut>(&self, mut resolve: F) -> Result<RestoredQueue<T>>
    where
        F: FnMut(Identifier) -> Fut,
        Fut: Future<Output = Option<(Identifier, T)>>,
    {
        let stored = self.load()?;
        if stored.is_empty() {
            return Ok(RestoredQueue::empty());
        }

        let mut resolved = Vec::with_capacity(stored.len());
        for id in stored.identifiers() {
            resolved.push(resolve(id.clone()).await);
        }
        let dropped = resolved.iter().filter(|r| r.is_none()).count();
        let healed = heal(resolved, stored.start_index(), stored.start_position_ms());

        if healed.is_empty() {
            info!("No track of the resumption queue could be resolved, clearing it");
            self.clear()?;
            return Ok(RestoredQueue::empty());
        }

        let (identifiers, items): (Vec<Identifier>, Vec<T>) = healed.items.into_iter().unzip();
        if dropped > 0 {
            info!("Dropped {} unavailable track(s) from the resumption queue", dropped);
            self.save(&identifiers, healed.start_index, healed.start_position_ms)?;
        }

        Ok(RestoredQueue {
            items,
            start_index: healed.start_index,
            start_position_ms: healed.start_position_ms,
        })
    }

    /// Rebuilds the stored queue as tracks resolved through `aggregator`
    pub async fn reconstruct(&self, aggregator: &MediaAggregator) -> Result<RestoredQueue<Audio>> {
        self.reconstruct_with(|id| async move {
            match first(aggregator.audio(&id)).await {
                Ok(audio) => Some((id, audio)),
                Err(e) => {
                    debug!(id = %id, "Dropping queue entry: {}", e);
                    None
                }
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polydb::Database;

    fn ids(names: &[&str]) -> Vec<Identifier> {
        names
            .iter()
            .map(|n| Identifier::new(format!("local://primary/audio/{}.flac", n)))
            .collect()
    }

    fn store() -> ResumptionQueueStore {
        ResumptionQueueStore::new(QueueStore::new(Database::open_in_memory().unwrap()))
    }

    #[test]
    fn test_playlist_clamps_cursor() {
        let playlist = ResumptionPlaylist::new(ids(&["a", "b"]), 7, 100);
        assert_eq!(playlist.start_index(), 1);
        assert_eq!(playlist.current(), Some(&ids(&["b"])[0]));

        let empty = ResumptionPlaylist::new(vec![], 3, 0);
        assert_eq!(empty.start_index(), 0);
        assert_eq!(empty.current(), None);
    }

    #[test]
    fn test_heal_drop_before_cursor() {
        let healed = heal(vec![Some('a'), None, Some('c'), Some('d')], 2, 5_000);
        assert_eq!(healed.items, vec!['a', 'c', 'd']);
        assert_eq!(healed.start_index, 1);
        assert_eq!(healed.start_position_ms, 5_000);
    }

    #[test]
    fn test_heal_drop_at_cursor() {
        let healed = heal(vec![Some('a'), None, Some('c')], 1, 5_000);
        assert_eq!(healed.items, vec!['a', 'c']);
        assert_eq!(healed.start_index, 1);
        assert_eq!(healed.start_position_ms, 0);
    }

    #[test]
    fn test_heal_drop_after_cursor() {
        let healed = heal(vec![Some('a'), Some('b'), None, Some('d')], 1, 5_000);
        assert_eq!(healed.items, vec!['a', 'b', 'd']);
        assert_eq!(healed.start_index, 1);
        assert_eq!(healed.start_position_ms, 5_000);
    }

    #[test]
    fn test_heal_mixed_gaps() {
        // Drops before, at and after the cursor together
        let healed = heal(vec![None, Some('b'), None, None, Some('e'), None], 3, 9_000);
        assert_eq!(healed.items, vec!['b', 'e']);
        assert_eq!(healed.start_index, 1);
        assert_eq!(healed.start_position_ms, 0);
    }

    #[test]
    fn test_heal_cursor_tail_vanished() {
        let healed = heal(vec![Some('a'), Some('b'), None, None], 2, 9_000);
        assert_eq!(healed.items, vec!['a', 'b']);
        assert_eq!(healed.start_index, 1);
        assert_eq!(healed.start_position_ms, 0);
    }

    #[test]
    fn test_heal_everything_dropped() {
        let healed: RestoredQueue<char> = heal(vec![None, None], 1, 9_000);
        assert!(healed.is_empty());
        assert_eq!(healed.start_index, 0);
        assert_eq!(healed.start_position_ms, 0);
    }

    #[test]
    fn test_save_load_round_trip() {
        let store = store();
        assert!(store.load().unwrap().is_empty());

        store.save(&ids(&["a", "b", "c"]), 2, 42_000).unwrap();
        assert_eq!(store.load().unwrap(), ResumptionPlaylist::new(ids(&["a", "b", "c"]), 2, 42_000));

        store.update_position(0, 1_000).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.identifiers(), ids(&["a", "b", "c"]).as_slice());
        assert_eq!((loaded.start_index(), loaded.start_position_ms()), (0, 1_000));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reconstruct_persists_healed_queue() {
        let store = store();
        store.save(&ids(&["a", "b", "c", "d"]), 2, 3_000).unwrap();

        let missing = ids(&["b"]).remove(0);
        let restored = store
            .reconstruct_with(|id| {
                let keep = id != missing;
                async move { keep.then(|| (id.clone(), id.to_string())) }
            })
            .await
            .unwrap();

        assert_eq!(restored.items.len(), 3);
        assert_eq!(restored.start_index, 1);
        assert_eq!(restored.start_position_ms, 3_000);
        assert_eq!(store.load().unwrap(), ResumptionPlaylist::new(ids(&["a", "c", "d"]), 1, 3_000));
    }

    #[tokio::test]
    async fn test_reconstruct_nothing_resolves_clears_store() {
        let store = store();
        store.save(&ids(&["a", "b"]), 1, 3_000).unwrap();

        let restored: RestoredQueue<()> = store
            .reconstruct_with(|_| async { None })
            .await
            .unwrap();
        assert!(restored.is_empty());
        assert!(store.load().unwrap().is_empty());
    }
}
