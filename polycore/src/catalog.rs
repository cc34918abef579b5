//! Provider catalog
//!
//! The catalog is the list of every backend instance the user can reach:
//! the local library (undivided, plus one provider per eligible storage
//! volume) and each configured remote server. It is rebuilt as a whole
//! whenever one of its inputs changes, and published as an immutable
//! [`Catalog`] snapshot.

use polyconfig::Config;
use polydb::ServerRecord;
use polyjellyfin::{JellyfinBackend, JellyfinConfigExt, JellyfinSettings};
use polylocal::{LocalBackend, LocalLibrary, StorageVolume, UNDIVIDED_INSTANCE_ID, volume_instance_id};
use polysource::{BackendKind, MediaBackend, MediaError, Provider, ProviderIdentifier, Result};
use polysubsonic::{SubsonicBackend, SubsonicConfigExt, SubsonicSettings};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Display name of the undivided local provider
pub const LOCAL_PROVIDER_NAME: &str = "Local library";

/// What a backend instance is built from
///
/// Two entries with equal arguments share the same backend instance across
/// catalog rebuilds.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendArgs {
    /// Local library, restricted to one volume when `volume` is set
    Local { volume: Option<String> },
    Remote(ServerRecord),
}

impl BackendArgs {
    pub fn kind(&self) -> BackendKind {
        match self {
            BackendArgs::Local { .. } => BackendKind::Local,
            BackendArgs::Remote(record) => record.kind,
        }
    }
}

/// Builds backend instances for catalog entries
pub trait BackendFactory: Send + Sync {
    fn create(&self, provider: &ProviderIdentifier, args: &BackendArgs)
    -> Result<Arc<dyn MediaBackend>>;
}

/// Factory producing the real backends
pub struct DefaultBackendFactory {
    library: Arc<LocalLibrary>,
    config: Arc<Config>,
}

impl DefaultBackendFactory {
    pub fn new(library: Arc<LocalLibrary>, config: Arc<Config>) -> Self {
        Self { library, config }
    }

    fn timeout(&self) -> Duration {
        let secs = self.config.get_http_timeout_secs().unwrap_or(30);
        Duration::from_secs(secs as u64)
    }

    fn subsonic(&self, record: &ServerRecord) -> Result<Arc<dyn MediaBackend>> {
        let settings = SubsonicSettings::new(&record.url, &record.username, &record.password)
            .with_legacy_auth(record.flag("legacy_auth"))
            .with_client_name(self.config.get_client_name())
            .with_timeout(self.timeout());
        let mut backend = SubsonicBackend::from_settings(record.id, settings)?;
        if let Ok(page_size) = self.config.get_subsonic_page_size() {
            backend = backend.with_page_size(page_size);
        }
        Ok(Arc::new(backend))
    }

    fn jellyfin(&self, record: &ServerRecord) -> Result<Arc<dyn MediaBackend>> {
        let device_id = self
            .config
            .get_device_id()
            .map_err(|e| MediaError::Io(format!("device id unavailable: {}", e)))?;
        let device_name = self
            .config
            .get_jellyfin_device_name()
            .unwrap_or_else(|_| polyjellyfin::config_ext::DEFAULT_DEVICE_NAME.to_string());

        let settings = JellyfinSettings::new(&record.url, &record.username, &record.password)
            .with_client(self.config.get_client_name(), self.config.get_client_version())
            .with_device(device_name, device_id)
            .with_timeout(self.timeout());
        let mut backend = JellyfinBackend::from_settings(record.id, settings)?;
        if let Ok(page_size) = self.config.get_jellyfin_page_size() {
            backend = backend.with_page_size(page_size);
        }
        Ok(Arc::new(backend))
    }
}

impl BackendFactory for DefaultBackendFactory {
    fn create(
        &self,
        provider: &ProviderIdentifier,
        args: &BackendArgs,
    ) -> Result<Arc<dyn MediaBackend>> {
        debug!(provider = %provider, "Creating backend");
        match args {
            BackendArgs::Local { volume: None } => {
                Ok(Arc::new(LocalBackend::undivided(self.library.clone())))
            }
            BackendArgs::Local { volume: Some(volume) } => Ok(Arc::new(LocalBackend::for_volume(
                self.library.clone(),
                volume.clone(),
            ))),
            BackendArgs::Remote(record) => match record.kind {
                BackendKind::Subsonic => self.subsonic(record),
                BackendKind::Jellyfin => self.jellyfin(record),
                BackendKind::Local => Err(MediaError::Io(format!(
                    "server record {} has the local kind",
                    record.id
                ))),
            },
        }
    }
}

/// One provider of the catalog with its backend
#[derive(Clone)]
pub struct CatalogEntry {
    pub provider: Provider,
    pub args: BackendArgs,
    pub backend: Arc<dyn MediaBackend>,
}

impl fmt::Debug for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogEntry")
            .field("provider", &self.provider)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

impl CatalogEntry {
    /// Same provider, same backend instance
    pub fn same_as(&self, other: &CatalogEntry) -> bool {
        self.provider.id == other.provider.id
            && std::ptr::addr_eq(Arc::as_ptr(&self.backend), Arc::as_ptr(&other.backend))
    }
}

/// Complete catalog snapshot, sorted by provider identifier
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new(mut entries: Vec<CatalogEntry>) -> Self {
        entries.sort_by_key(|e| e.provider.id);
        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn visible(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter().filter(|e| e.provider.visible)
    }

    pub fn providers(&self) -> Vec<Provider> {
        self.entries.iter().map(|e| e.provider.clone()).collect()
    }

    pub fn get(&self, id: &ProviderIdentifier) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| &e.provider.id == id)
    }

    /// Visible entry of `preferred`, else the first visible entry
    pub fn navigation_entry(&self, preferred: Option<&ProviderIdentifier>) -> Option<&CatalogEntry> {
        preferred
            .and_then(|id| self.visible().find(|e| &e.provider.id == id))
            .or_else(|| self.visible().next())
    }

    /// Providers, names, visibility and backend instances all unchanged
    fn same_as(&self, other: &Catalog) -> bool {
        self.entries.len() == other.entries.len()
            && self.entries.iter().zip(&other.entries).all(|(a, b)| {
                a.same_as(b) && a.provider.name == b.provider.name && a.provider.visible == b.provider.visible
            })
    }
}

/// Providers derived from the current inputs, sorted by identifier
///
/// The undivided local provider is always listed. Each eligible volume
/// adds a provider whose instance id is derived from its backend name, so
/// a volume keeps its identity whatever the split setting. Only one of the
/// two local views is visible at a time.
pub fn plan_providers(
    volumes: &[StorageVolume],
    split: bool,
    servers: &[ServerRecord],
) -> Vec<(Provider, BackendArgs)> {
    let mut plan = vec![(
        Provider::new(
            ProviderIdentifier::new(BackendKind::Local, UNDIVIDED_INSTANCE_ID),
            LOCAL_PROVIDER_NAME,
            !split,
        ),
        BackendArgs::Local { volume: None },
    )];

    for volume in volumes.iter().filter(|v| v.is_eligible()) {
        let Some(name) = volume.backend_name() else {
            continue;
        };
        let id = ProviderIdentifier::new(BackendKind::Local, volume_instance_id(name));
        if plan.iter().any(|(p, _)| p.id == id) {
            warn!(volume = %name, "Duplicate volume name, ignoring");
            continue;
        }
        plan.push((
            Provider::new(id, volume.description.clone(), split),
            BackendArgs::Local {
                volume: Some(name.to_string()),
            },
        ));
    }

    for record in servers {
        if !record.kind.is_remote() {
            warn!(server = record.id, "Ignoring server record with local kind");
            continue;
        }
        plan.push((
            Provider::new(
                ProviderIdentifier::new(record.kind, record.id),
                record.name.clone(),
                true,
            ),
            BackendArgs::Remote(record.clone()),
        ));
    }

    plan.sort_by_key(|(p, _)| p.id);
    plan
}

/// Builds a snapshot, reusing backends of `previous` with unchanged arguments
///
/// Entries whose backend cannot be built are left out.
pub fn build_catalog(
    plan: Vec<(Provider, BackendArgs)>,
    previous: &Catalog,
    factory: &dyn BackendFactory,
) -> Catalog {
    let entries = plan
        .into_iter()
        .filter_map(|(provider, args)| {
            let reused = previous
                .get(&provider.id)
                .filter(|e| e.args == args)
                .map(|e| e.backend.clone());
            let backend = match reused {
                Some(backend) => backend,
                None => match factory.create(&provider.id, &args) {
                    Ok(backend) => backend,
                    Err(e) => {
                        warn!(provider = %provider.id, "Cannot create backend: {}", e);
                        return None;
                    }
                },
            };
            Some(CatalogEntry {
                provider,
                args,
                backend,
            })
        })
        .collect();
    Catalog::new(entries)
}

/// Live provider catalog
///
/// A background task follows the volume list, the split preference and the
/// server records, and publishes a new snapshot when the result differs.
/// The task stops when the catalog is dropped.
pub struct ProviderCatalog {
    snapshot: watch::Receiver<Arc<Catalog>>,
    task: JoinHandle<()>,
}

impl fmt::Debug for ProviderCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCatalog")
            .field("snapshot", &*self.snapshot.borrow())
            .finish_non_exhaustive()
    }
}

impl ProviderCatalog {
    /// Builds the first snapshot and starts following the inputs
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(
        mut volumes: watch::Receiver<Vec<StorageVolume>>,
        mut split: watch::Receiver<bool>,
        mut servers: watch::Receiver<Vec<ServerRecord>>,
        factory: Arc<dyn BackendFactory>,
    ) -> Self {
        let initial = build_catalog(
            plan_providers(
                &volumes.borrow_and_update(),
                *split.borrow_and_update(),
                &servers.borrow_and_update(),
            ),
            &Catalog::default(),
            factory.as_ref(),
        );
        log_catalog(&initial);
        let (tx, snapshot) = watch::channel(Arc::new(initial));

        let task = tokio::spawn(async move {
            let (mut volumes_open, mut split_open, mut servers_open) = (true, true, true);
            loop {
                tokio::select! {
                    r = volumes.changed(), if volumes_open => volumes_open = r.is_ok(),
                    r = split.changed(), if split_open => split_open = r.is_ok(),
                    r = servers.changed(), if servers_open => servers_open = r.is_ok(),
                    else => break,
                }

                let plan = plan_providers(
                    &volumes.borrow_and_update(),
                    *split.borrow_and_update(),
                    &servers.borrow_and_update(),
                );
                let previous = tx.borrow().clone();
                let next = build_catalog(plan, &previous, factory.as_ref());
                if !next.same_as(&previous) {
                    log_catalog(&next);
                    tx.send_replace(Arc::new(next));
                }
            }
            debug!("Catalog inputs closed, stopping");
        });

        Self { snapshot, task }
    }

    /// Current snapshot
    pub fn current(&self) -> Arc<Catalog> {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Catalog>> {
        self.snapshot.clone()
    }
}

impl Drop for ProviderCatalog {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn log_catalog(catalog: &Catalog) {
    info!("Provider catalog: {} provider(s)", catalog.entries().len());
    for entry in catalog.entries() {
        debug!(
            provider = %entry.provider.id,
            name = %entry.provider.name,
            visible = entry.provider.visible,
            "Catalog entry"
        );
    }
}
