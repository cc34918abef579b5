//! Scriptable backends for the aggregator tests

#![allow(dead_code)]

use polyconfig::Config;
use polycore::{
    BackendArgs, BackendFactory, MediaAggregator, Preferences, ProviderCatalog,
};
use polydb::{Database, ServerRecord, StatsStore};
use polysource::{
    Activity, Album, AlbumDetail, Artist, ArtistDetail, Audio, BackendKind, ChangeTracker,
    DiagnosticField, DummyBackend, Genre, GenreDetail, Identifier, LiveStream, MediaBackend,
    MediaError, MediaItem, MediaKind, Playlist, PlaylistDetail, PlaylistMembership,
    ProviderIdentifier, Result, SortingRule, async_trait, once,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

pub const SCHEME: &str = "mock";

#[derive(Debug, Default)]
pub struct MockState {
    pub audios: Vec<Audio>,
    pub albums: Vec<Album>,
    pub favorites: HashSet<Identifier>,
    pub mutations: Vec<String>,
}

/// Backend owning `mock://<name>/...`
#[derive(Debug)]
pub struct MockBackend {
    pub name: String,
    kind: BackendKind,
    delay: Duration,
    tracker: Arc<ChangeTracker>,
    pub state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub fn new(name: &str, kind: BackendKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            delay: Duration::ZERO,
            tracker: Arc::new(ChangeTracker::new()),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Delays every collection answer
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn id(&self, kind: MediaKind, key: &str) -> Identifier {
        Identifier::build(SCHEME, &self.name, kind, key)
    }

    pub fn with_audio(self, key: &str) -> Self {
        let audio = Audio::new(self.id(MediaKind::Audio, key), format!("{} {}", self.name, key));
        self.state.lock().unwrap().audios.push(audio);
        self
    }

    pub fn with_album(self, key: &str) -> Self {
        let album = Album {
            id: self.id(MediaKind::Album, key),
            title: format!("{} {}", self.name, key),
            artist: None,
            artist_id: None,
            year: None,
            track_count: 1,
            thumbnail: None,
        };
        self.state.lock().unwrap().albums.push(album);
        self
    }

    pub fn mutations(&self) -> Vec<String> {
        self.state.lock().unwrap().mutations.clone()
    }

    fn owns(&self, id: &Identifier) -> bool {
        id.parts_for(SCHEME).is_some_and(|p| p.authority == self.name)
    }

    fn require(&self, id: &Identifier) -> Result<()> {
        if self.owns(id) {
            Ok(())
        } else {
            Err(MediaError::not_found(id))
        }
    }

    fn record(&self, mutation: String) {
        self.state.lock().unwrap().mutations.push(mutation);
        self.tracker.bump();
    }

    fn live<T, F>(&self, read: F) -> LiveStream<T>
    where
        T: Send + 'static,
        F: Fn(&MockState) -> Result<T> + Send + Sync + 'static,
    {
        let state = self.state.clone();
        let delay = self.delay;
        let read = Arc::new(read);
        self.tracker.live(move || {
            let state = state.clone();
            let read = read.clone();
            async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let state = state.lock().unwrap();
                read(&state)
            }
        })
    }
}

#[async_trait]
impl MediaBackend for MockBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn identify(&self, id: &Identifier) -> Option<MediaKind> {
        id.parts_for(SCHEME)
            .filter(|p| p.authority == self.name)
            .map(|p| p.kind)
    }

    fn status(&self) -> LiveStream<Vec<DiagnosticField>> {
        once(Ok(vec![DiagnosticField::new("Backend", self.name.clone())]))
    }

    fn audios(&self, _rule: SortingRule) -> LiveStream<Vec<Audio>> {
        self.live(|s| Ok(s.audios.clone()))
    }

    fn albums(&self, _rule: SortingRule) -> LiveStream<Vec<Album>> {
        self.live(|s| Ok(s.albums.clone()))
    }

    fn artists(&self, _rule: SortingRule) -> LiveStream<Vec<Artist>> {
        once(Ok(vec![]))
    }

    fn genres(&self, _rule: SortingRule) -> LiveStream<Vec<Genre>> {
        once(Ok(vec![]))
    }

    fn playlists(&self, _rule: SortingRule) -> LiveStream<Vec<Playlist>> {
        once(Ok(vec![]))
    }

    fn audio(&self, id: &Identifier) -> LiveStream<Audio> {
        let id = id.clone();
        self.live(move |s| {
            let mut audio = s
                .audios
                .iter()
                .find(|a| a.id == id)
                .cloned()
                .ok_or_else(|| MediaError::not_found(&id))?;
            audio.favorite = s.favorites.contains(&id);
            Ok(audio)
        })
    }

    fn album(&self, id: &Identifier) -> LiveStream<AlbumDetail> {
        once(Err(MediaError::not_found(id)))
    }

    fn artist(&self, id: &Identifier) -> LiveStream<ArtistDetail> {
        once(Err(MediaError::not_found(id)))
    }

    fn genre(&self, id: &Identifier) -> LiveStream<GenreDetail> {
        once(Err(MediaError::not_found(id)))
    }

    fn playlist(&self, id: &Identifier) -> LiveStream<PlaylistDetail> {
        once(Err(MediaError::not_found(id)))
    }

    fn lyrics(&self, _id: &Identifier) -> LiveStream<Option<String>> {
        once(Ok(None))
    }

    fn audio_playlists_status(&self, _id: &Identifier) -> LiveStream<Vec<PlaylistMembership>> {
        once(Ok(vec![]))
    }

    async fn stream_uri(&self, id: &Identifier) -> Result<String> {
        self.require(id)?;
        let key = id.parts().map(|p| p.key).unwrap_or_default();
        Ok(format!("http://{}.lan/stream/{}", self.name, key))
    }

    fn search(&self, _query: &str) -> LiveStream<Vec<MediaItem>> {
        once(Ok(vec![]))
    }

    fn activity(&self) -> LiveStream<Activity> {
        once(Ok(Activity::default()))
    }

    async fn add_audio_to_playlist(&self, playlist: &Identifier, audio: &Identifier) -> Result<()> {
        self.require(playlist)?;
        self.require(audio)?;
        self.record(format!("add {} {}", playlist, audio));
        Ok(())
    }

    async fn set_favorite(&self, id: &Identifier, favorite: bool) -> Result<()> {
        self.require(id)?;
        {
            let mut state = self.state.lock().unwrap();
            if favorite {
                state.favorites.insert(id.clone());
            } else {
                state.favorites.remove(id);
            }
        }
        self.record(format!("favorite {} {}", id, favorite));
        Ok(())
    }

    async fn notify_played(&self, id: &Identifier) -> Result<()> {
        self.require(id)?;
        self.record(format!("played {}", id));
        Ok(())
    }
}

/// Hands out prepared mock backends; local providers get a dummy
#[derive(Default)]
pub struct MockFactory {
    backends: HashMap<ProviderIdentifier, Arc<MockBackend>>,
}

impl MockFactory {
    pub fn with(mut self, id: ProviderIdentifier, backend: Arc<MockBackend>) -> Self {
        self.backends.insert(id, backend);
        self
    }
}

impl BackendFactory for MockFactory {
    fn create(
        &self,
        provider: &ProviderIdentifier,
        _args: &BackendArgs,
    ) -> Result<Arc<dyn MediaBackend>> {
        match self.backends.get(provider) {
            Some(backend) => Ok(backend.clone()),
            None => Ok(Arc::new(DummyBackend)),
        }
    }
}

pub fn server(kind: BackendKind, id: i64) -> ServerRecord {
    ServerRecord {
        id,
        kind,
        name: format!("{} {}", kind, id),
        url: format!("http://server{}.lan", id),
        username: "bob".to_string(),
        password: "pw".to_string(),
        extra: serde_json::json!({}),
    }
}

pub fn provider(kind: BackendKind, id: i64) -> ProviderIdentifier {
    ProviderIdentifier::new(kind, id)
}

pub struct Harness {
    _dir: tempfile::TempDir,
    pub config: Arc<Config>,
    pub db: Database,
    pub preferences: Arc<Preferences>,
    pub servers: watch::Sender<Vec<ServerRecord>>,
    pub volumes: watch::Sender<Vec<polylocal::StorageVolume>>,
    pub aggregator: MediaAggregator,
}

impl Harness {
    /// Catalog over `servers`, with the local library hidden when `split`
    /// is set and no volume is mounted
    pub fn new(factory: impl BackendFactory + 'static, servers: Vec<ServerRecord>, split: bool) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = Arc::new(Config::load_config(dir.path().to_str().unwrap()).unwrap());
        let preferences = Arc::new(Preferences::new(config.clone()));
        preferences.set_split_local_devices(split).unwrap();

        let db = Database::open_in_memory().unwrap();
        let (servers_tx, servers_rx) = watch::channel(servers);
        let (volumes_tx, volumes_rx) = watch::channel(vec![]);
        let catalog = Arc::new(ProviderCatalog::spawn(
            volumes_rx,
            preferences.watch_split_local_devices(),
            servers_rx,
            Arc::new(factory),
        ));
        let aggregator = MediaAggregator::new(catalog, preferences.clone(), StatsStore::new(db.clone()));

        Self {
            _dir: dir,
            config,
            db,
            preferences,
            servers: servers_tx,
            volumes: volumes_tx,
            aggregator,
        }
    }

    /// Replaces the server list and waits for the new catalog
    pub async fn set_servers(&self, servers: Vec<ServerRecord>) {
        let mut updates = self.aggregator.catalog().subscribe();
        updates.borrow_and_update();
        self.servers.send_replace(servers);
        tokio::time::timeout(Duration::from_secs(1), updates.changed())
            .await
            .expect("catalog was not rebuilt")
            .unwrap();
    }
}
