//! Media aggregator
//!
//! Single query surface over every provider of the catalog:
//!
//! - collection queries (`albums`, `search`, ...) go to the *navigation
//!   provider*: the preferred provider when it is visible in the catalog,
//!   else the first visible provider, else a [`DummyBackend`];
//! - identifier queries and mutations go to the provider owning the
//!   identifier, found by asking each visible provider in catalog order.
//!
//! All streams follow the catalog. When the navigation provider or the
//! owner of an identifier changes, the running backend stream is dropped
//! and replaced (see [`switch_latest`]).

use crate::catalog::{Catalog, CatalogEntry, ProviderCatalog};
use crate::preferences::Preferences;
use futures::StreamExt;
use futures::stream::BoxStream;
use polydb::StatsStore;
use polylocal::LOCAL_SCHEME;
use polysource::{
    Activity, Album, AlbumDetail, Artist, ArtistDetail, Audio, BackendKind, DiagnosticField,
    DummyBackend, Genre, GenreDetail, Identifier, LiveStream, MediaBackend, MediaError, MediaItem,
    MediaKind, Playlist, PlaylistDetail, PlaylistMembership, Provider, ProviderIdentifier, Result,
    SortingRule, first, once, switch_latest,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Entry answering for an identifier, with the kind it reported
async fn route_in(catalog: &Catalog, id: &Identifier) -> Option<(CatalogEntry, MediaKind)> {
    for entry in catalog.visible() {
        if let Some(kind) = entry.backend.identify(id).await {
            debug!(id = %id, provider = %entry.provider.id, "Routed identifier");
            return Some((entry.clone(), kind));
        }
    }
    debug!(id = %id, "No provider owns identifier");
    None
}

fn backend_of(entry: Option<CatalogEntry>) -> Arc<dyn MediaBackend> {
    match entry {
        Some(entry) => entry.backend,
        None => Arc::new(DummyBackend),
    }
}

/// Whether `next` differs from the last yielded entry
fn is_new(last: &Option<Option<CatalogEntry>>, next: &Option<CatalogEntry>) -> bool {
    match (last, next) {
        (Some(Some(a)), Some(b)) => !a.same_as(b),
        (Some(None), None) => false,
        _ => true,
    }
}

/// Backend path of a local track identifier
fn local_path(id: &Identifier) -> Option<&str> {
    id.parts_for(LOCAL_SCHEME)
        .filter(|p| p.kind == MediaKind::Audio)
        .map(|p| p.key)
}

/// Routes queries to the providers of a [`ProviderCatalog`]
#[derive(Debug, Clone)]
pub struct MediaAggregator {
    catalog: Arc<ProviderCatalog>,
    preferences: Arc<Preferences>,
    stats: StatsStore,
}

impl MediaAggregator {
    pub fn new(catalog: Arc<ProviderCatalog>, preferences: Arc<Preferences>, stats: StatsStore) -> Self {
        Self {
            catalog,
            preferences,
            stats,
        }
    }

    pub fn catalog(&self) -> &Arc<ProviderCatalog> {
        &self.catalog
    }

    pub fn preferences(&self) -> &Arc<Preferences> {
        &self.preferences
    }

    // ============= Providers =============

    /// Visible providers in catalog order
    pub fn providers(&self) -> Vec<Provider> {
        self.catalog
            .current()
            .visible()
            .map(|e| e.provider.clone())
            .collect()
    }

    /// Visible providers, re-emitted on every catalog change
    pub fn providers_stream(&self) -> BoxStream<'static, Vec<Provider>> {
        let mut catalog = self.catalog.subscribe();
        Box::pin(async_stream::stream! {
            loop {
                let providers: Vec<Provider> = catalog
                    .borrow_and_update()
                    .visible()
                    .map(|e| e.provider.clone())
                    .collect();
                yield providers;
                if catalog.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    /// Current navigation provider, `None` when the catalog has no visible
    /// provider
    pub fn navigation_provider(&self) -> Option<Provider> {
        let preferred = self.preferences.navigation_provider();
        self.catalog
            .current()
            .navigation_entry(preferred.as_ref())
            .map(|e| e.provider.clone())
    }

    pub fn navigation_provider_stream(&self) -> BoxStream<'static, Option<Provider>> {
        self.navigation_entries()
            .map(|entry| entry.map(|e| e.provider))
            .boxed()
    }

    /// Records the preferred navigation provider
    ///
    /// The provider does not need to be in the catalog: it is selected as
    /// soon as it shows up.
    pub fn set_navigation_provider(&self, provider: ProviderIdentifier) -> Result<()> {
        self.preferences
            .set_navigation_provider(Some(provider))
            .map_err(|e| MediaError::Io(format!("cannot store navigation provider: {}", e)))
    }

    /// Navigation entry each time it changes
    fn navigation_entries(&self) -> BoxStream<'static, Option<CatalogEntry>> {
        let mut catalog = self.catalog.subscribe();
        let mut preferred = self.preferences.watch_navigation_provider();

        Box::pin(async_stream::stream! {
            let mut last: Option<Option<CatalogEntry>> = None;
            loop {
                let next = {
                    let snapshot = catalog.borrow_and_update().clone();
                    let preferred = *preferred.borrow_and_update();
                    snapshot.navigation_entry(preferred.as_ref()).cloned()
                };
                if is_new(&last, &next) {
                    match &next {
                        Some(entry) => info!(provider = %entry.provider.id, "Navigation provider selected"),
                        None => info!("No navigation provider available"),
                    }
                    last = Some(next.clone());
                    yield next;
                }

                tokio::select! {
                    r = catalog.changed() => {
                        if r.is_err() {
                            break;
                        }
                    }
                    r = preferred.changed() => {
                        if r.is_err() {
                            break;
                        }
                    }
                }
            }
        })
    }

    /// Runs `query` on the navigation backend, re-subscribing when it changes
    fn on_navigation<T, F>(&self, query: F) -> LiveStream<T>
    where
        T: Send + 'static,
        F: Fn(&dyn MediaBackend) -> LiveStream<T> + Send + 'static,
    {
        switch_latest(
            self.navigation_entries()
                .map(move |entry| query(backend_of(entry).as_ref())),
        )
    }

    /// Runs `query` on the owner of `id`, re-routing on catalog changes
    ///
    /// Emits `NotFound` while no provider owns `id`.
    fn on_owner<T, F>(&self, id: &Identifier, query: F) -> LiveStream<T>
    where
        T: Send + 'static,
        F: Fn(&dyn MediaBackend, &Identifier) -> LiveStream<T> + Send + 'static,
    {
        let mut catalog = self.catalog.subscribe();
        let probed = id.clone();
        let owners = async_stream::stream! {
            let mut last: Option<Option<CatalogEntry>> = None;
            loop {
                let snapshot = catalog.borrow_and_update().clone();
                let owner = route_in(&snapshot, &probed).await.map(|(entry, _)| entry);
                if is_new(&last, &owner) {
                    last = Some(owner.clone());
                    yield owner;
                }
                if catalog.changed().await.is_err() {
                    break;
                }
            }
        };

        let id = id.clone();
        switch_latest(owners.map(move |owner| match owner {
            Some(entry) => query(entry.backend.as_ref(), &id),
            None => once(Err(MediaError::not_found(&id))),
        }))
    }

    /// Provider owning `id` and the kind of item it names
    pub async fn identify(&self, id: &Identifier) -> Option<(ProviderIdentifier, MediaKind)> {
        route_in(&self.catalog.current(), id)
            .await
            .map(|(entry, kind)| (entry.provider.id, kind))
    }

    async fn owner(&self, id: &Identifier) -> Result<CatalogEntry> {
        route_in(&self.catalog.current(), id)
            .await
            .map(|(entry, _)| entry)
            .ok_or_else(|| MediaError::not_found(id))
    }

    /// Provider owning every identifier of `ids`
    ///
    /// Fails with `NotFound` when one of them is unowned or when they are
    /// owned by different providers.
    async fn common_owner(&self, ids: &[&Identifier]) -> Result<CatalogEntry> {
        let catalog = self.catalog.current();
        let mut owner: Option<CatalogEntry> = None;
        for id in ids {
            let (entry, _) = route_in(&catalog, id)
                .await
                .ok_or_else(|| MediaError::not_found(id))?;
            match &owner {
                Some(first) if first.provider.id != entry.provider.id => {
                    debug!(
                        first = %first.provider.id,
                        other = %entry.provider.id,
                        "Identifiers span several providers"
                    );
                    return Err(MediaError::NotFound(format!(
                        "{} is not served by {}",
                        id, first.provider.id
                    )));
                }
                Some(_) => {}
                None => owner = Some(entry),
            }
        }
        owner.ok_or_else(|| MediaError::NotFound("no identifier given".to_string()))
    }

    // ============= Navigation provider queries =============

    pub fn status(&self) -> LiveStream<Vec<DiagnosticField>> {
        self.on_navigation(|b| b.status())
    }

    pub fn audios(&self, rule: SortingRule) -> LiveStream<Vec<Audio>> {
        self.on_navigation(move |b| b.audios(rule))
    }

    pub fn albums(&self, rule: SortingRule) -> LiveStream<Vec<Album>> {
        self.on_navigation(move |b| b.albums(rule))
    }

    pub fn artists(&self, rule: SortingRule) -> LiveStream<Vec<Artist>> {
        self.on_navigation(move |b| b.artists(rule))
    }

    pub fn genres(&self, rule: SortingRule) -> LiveStream<Vec<Genre>> {
        self.on_navigation(move |b| b.genres(rule))
    }

    pub fn playlists(&self, rule: SortingRule) -> LiveStream<Vec<Playlist>> {
        self.on_navigation(move |b| b.playlists(rule))
    }

    pub fn collection(&self, kind: MediaKind, rule: SortingRule) -> LiveStream<Vec<MediaItem>> {
        self.on_navigation(move |b| b.collection(kind, rule))
    }

    pub fn search(&self, query: &str) -> LiveStream<Vec<MediaItem>> {
        let query = query.to_string();
        self.on_navigation(move |b| b.search(&query))
    }

    pub fn activity(&self) -> LiveStream<Activity> {
        self.on_navigation(|b| b.activity())
    }

    /// Creates a playlist on the navigation provider
    pub async fn create_playlist(&self, name: &str) -> Result<Identifier> {
        let preferred = self.preferences.navigation_provider();
        let entry = self.catalog.current().navigation_entry(preferred.as_ref()).cloned();
        backend_of(entry).create_playlist(name).await
    }

    // ============= Identifier queries =============

    pub fn audio(&self, id: &Identifier) -> LiveStream<Audio> {
        self.on_owner(id, |b, id| b.audio(id))
    }

    pub fn album(&self, id: &Identifier) -> LiveStream<AlbumDetail> {
        self.on_owner(id, |b, id| b.album(id))
    }

    pub fn artist(&self, id: &Identifier) -> LiveStream<ArtistDetail> {
        self.on_owner(id, |b, id| b.artist(id))
    }

    pub fn genre(&self, id: &Identifier) -> LiveStream<GenreDetail> {
        self.on_owner(id, |b, id| b.genre(id))
    }

    pub fn playlist(&self, id: &Identifier) -> LiveStream<PlaylistDetail> {
        self.on_owner(id, |b, id| b.playlist(id))
    }

    pub fn item(&self, kind: MediaKind, id: &Identifier) -> LiveStream<MediaItem> {
        self.on_owner(id, move |b, id| b.item(kind, id))
    }

    pub fn lyrics(&self, id: &Identifier) -> LiveStream<Option<String>> {
        self.on_owner(id, |b, id| b.lyrics(id))
    }

    pub fn audio_playlists_status(&self, id: &Identifier) -> LiveStream<Vec<PlaylistMembership>> {
        self.on_owner(id, |b, id| b.audio_playlists_status(id))
    }

    pub async fn stream_uri(&self, id: &Identifier) -> Result<String> {
        self.owner(id).await?.backend.stream_uri(id).await
    }

    // ============= Mutations =============

    pub async fn rename_playlist(&self, playlist: &Identifier, name: &str) -> Result<()> {
        self.owner(playlist).await?.backend.rename_playlist(playlist, name).await
    }

    pub async fn delete_playlist(&self, playlist: &Identifier) -> Result<()> {
        self.owner(playlist).await?.backend.delete_playlist(playlist).await
    }

    pub async fn add_audio_to_playlist(&self, playlist: &Identifier, audio: &Identifier) -> Result<()> {
        self.common_owner(&[playlist, audio])
            .await?
            .backend
            .add_audio_to_playlist(playlist, audio)
            .await
    }

    pub async fn remove_audio_from_playlist(
        &self,
        playlist: &Identifier,
        audio: &Identifier,
    ) -> Result<()> {
        self.common_owner(&[playlist, audio])
            .await?
            .backend
            .remove_audio_from_playlist(playlist, audio)
            .await
    }

    pub async fn set_favorite(&self, id: &Identifier, favorite: bool) -> Result<()> {
        self.owner(id).await?.backend.set_favorite(id, favorite).await
    }

    pub async fn notify_played(&self, id: &Identifier) -> Result<()> {
        self.owner(id).await?.backend.notify_played(id).await
    }

    // ============= Garbage collection =============

    /// Removes local statistics of tracks that left the local library
    ///
    /// Tracks are compared by their path on the volume, so statistics
    /// survive a change of the volume part of the identifier. Nothing is
    /// removed when no local provider is visible, when the local library is
    /// empty, or when a listing fails. Returns the number of removed rows.
    pub async fn collect_garbage(&self) -> Result<usize> {
        let catalog = self.catalog.current();
        let locals: Vec<&CatalogEntry> = catalog
            .visible()
            .filter(|e| e.provider.id.kind == BackendKind::Local)
            .collect();
        if locals.is_empty() {
            debug!("No local provider, skipping statistics cleanup");
            return Ok(0);
        }

        let mut present: HashSet<String> = HashSet::new();
        for entry in locals {
            let audios = first(entry.backend.audios(SortingRule::default())).await?;
            present.extend(audios.iter().filter_map(|a| local_path(&a.id)).map(str::to_string));
        }
        if present.is_empty() {
            debug!("Local library is empty, skipping statistics cleanup");
            return Ok(0);
        }

        let stale: Vec<Identifier> = self
            .stats
            .all()?
            .into_iter()
            .map(|s| s.identifier)
            .filter(|id| local_path(id).is_some_and(|path| !present.contains(path)))
            .collect();
        if stale.is_empty() {
            return Ok(0);
        }

        let removed = self.stats.delete(&stale)?;
        info!("Removed statistics of {} vanished track(s)", removed);
        Ok(removed)
    }

    /// Runs [`collect_garbage`](Self::collect_garbage) every `period`
    ///
    /// The first pass happens one period after the call.
    pub fn spawn_periodic_gc(&self, period: Duration) -> JoinHandle<()> {
        let period = period.max(Duration::from_secs(1));
        let this = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = this.collect_garbage().await {
                    warn!("Statistics cleanup skipped: {}", e);
                }
            }
        })
    }
}
