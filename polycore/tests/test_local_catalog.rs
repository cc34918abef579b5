//! Catalog and statistics cleanup over the real local backend

use futures::StreamExt;
use polyconfig::Config;
use polycore::{
    DefaultBackendFactory, MediaAggregator, Preferences, ProviderCatalog, ResumptionQueueStore,
};
use polydb::{Database, QueueStore, StatsStore};
use polylocal::{
    IndexedTrack, LocalLibrary, MemoryIndex, PRIMARY_VOLUME, StorageVolume, UNDIVIDED_INSTANCE_ID,
    VolumeState, volume_instance_id,
};
use polysource::{
    BackendKind, Identifier, MediaError, ProviderIdentifier, SortingRule, first,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

struct Local {
    _dir: tempfile::TempDir,
    volumes: watch::Sender<Vec<StorageVolume>>,
    _servers: watch::Sender<Vec<polydb::ServerRecord>>,
    index: Arc<MemoryIndex>,
    db: Database,
    stats: StatsStore,
    preferences: Arc<Preferences>,
    aggregator: MediaAggregator,
}

fn volumes() -> Vec<StorageVolume> {
    vec![
        StorageVolume::new(None, "Internal storage", "/sdcard", VolumeState::Mounted, true),
        StorageVolume::new(Some("1A2B-3C4D"), "SD card", "/mnt/sd", VolumeState::Mounted, false),
    ]
}

fn local(tracks: Vec<IndexedTrack>) -> Local {
    let dir = tempfile::tempdir().unwrap();
    let config = Arc::new(Config::load_config(dir.path().to_str().unwrap()).unwrap());
    let db = Database::open_in_memory().unwrap();
    let stats = StatsStore::new(db.clone());

    let (volumes_tx, volumes_rx) = watch::channel(volumes());
    let (servers_tx, servers_rx) = watch::channel(vec![]);

    let index = Arc::new(MemoryIndex::with_tracks(tracks));
    let library = Arc::new(LocalLibrary::new(index.clone(), stats.clone(), volumes_rx.clone()));
    let preferences = Arc::new(Preferences::new(config.clone()));
    let catalog = Arc::new(ProviderCatalog::spawn(
        volumes_rx,
        preferences.watch_split_local_devices(),
        servers_rx,
        Arc::new(DefaultBackendFactory::new(library, config)),
    ));

    Local {
        _dir: dir,
        volumes: volumes_tx,
        _servers: servers_tx,
        index,
        db,
        stats: stats.clone(),
        preferences: preferences.clone(),
        aggregator: MediaAggregator::new(catalog, preferences, stats),
    }
}

async fn set_split(local: &Local, split: bool) {
    let mut updates = local.aggregator.catalog().subscribe();
    updates.borrow_and_update();
    local.preferences.set_split_local_devices(split).unwrap();
    tokio::time::timeout(Duration::from_secs(1), updates.changed())
        .await
        .unwrap()
        .unwrap();
}

fn unmount(local: &Local, name: &str) {
    local.volumes.send_modify(|volumes| {
        for volume in volumes.iter_mut().filter(|v| v.name.as_deref() == Some(name)) {
            volume.state = VolumeState::Unmounted;
        }
    });
}

fn visible_ids(local: &Local) -> Vec<ProviderIdentifier> {
    local.aggregator.providers().into_iter().map(|p| p.id).collect()
}

#[tokio::test]
async fn test_split_toggle_keeps_identity() {
    let local = local(vec![]);
    let undivided = ProviderIdentifier::new(BackendKind::Local, UNDIVIDED_INSTANCE_ID);
    let primary = ProviderIdentifier::new(BackendKind::Local, volume_instance_id(PRIMARY_VOLUME));
    let sd = ProviderIdentifier::new(BackendKind::Local, volume_instance_id("1A2B-3C4D"));

    assert_eq!(visible_ids(&local), vec![undivided]);

    set_split(&local, true).await;
    let mut split = visible_ids(&local);
    split.sort();
    let mut expected = vec![primary, sd];
    expected.sort();
    assert_eq!(split, expected);

    set_split(&local, false).await;
    set_split(&local, true).await;
    let mut again = visible_ids(&local);
    again.sort();
    assert_eq!(again, expected);
}

#[tokio::test]
async fn test_split_routes_tracks_to_their_volume() {
    let local = local(vec![
        IndexedTrack::new(PRIMARY_VOLUME, "Music/a.flac", "A"),
        IndexedTrack::new("1A2B-3C4D", "Music/b.flac", "B"),
    ]);
    let on_sd = Identifier::new("local://1A2B-3C4D/audio/Music/b.flac");

    let (owner, _) = local.aggregator.identify(&on_sd).await.unwrap();
    assert_eq!(owner.instance_id, UNDIVIDED_INSTANCE_ID);

    set_split(&local, true).await;
    let (owner, _) = local.aggregator.identify(&on_sd).await.unwrap();
    assert_eq!(owner.instance_id, volume_instance_id("1A2B-3C4D"));
    assert_eq!(first(local.aggregator.audio(&on_sd)).await.unwrap().title, "B");
}

#[tokio::test]
async fn test_garbage_collection_by_path() {
    let local = local(vec![
        IndexedTrack::new(PRIMARY_VOLUME, "Music/a.flac", "A"),
        IndexedTrack::new(PRIMARY_VOLUME, "Music/b.flac", "B"),
    ]);
    let stats = &local.stats;
    let present = Identifier::new("local://primary/audio/Music/a.flac");
    let renamed_volume = Identifier::new("local://OLD-NAME/audio/Music/b.flac");
    let vanished = Identifier::new("local://primary/audio/Music/gone.flac");
    let remote = Identifier::new("subsonic://1/audio/42");
    for id in [&present, &renamed_volume, &vanished, &remote] {
        stats.set_favorite(id, true).unwrap();
    }

    assert_eq!(local.aggregator.collect_garbage().await.unwrap(), 1);
    let mut left: Vec<_> = stats.all().unwrap().into_iter().map(|s| s.identifier).collect();
    left.sort();
    let mut expected = vec![present, renamed_volume, remote];
    expected.sort();
    assert_eq!(left, expected);

    // Second pass has nothing to do
    assert_eq!(local.aggregator.collect_garbage().await.unwrap(), 0);
}

#[tokio::test]
async fn test_garbage_collection_skips_empty_library() {
    let local = local(vec![]);
    local
        .stats
        .set_favorite(&"local://primary/audio/Music/a.flac".into(), true)
        .unwrap();

    assert_eq!(local.aggregator.collect_garbage().await.unwrap(), 0);
    assert_eq!(local.stats.all().unwrap().len(), 1);

    // Once the index is filled, the row is checked for real
    local.index.upsert_track(IndexedTrack::new(PRIMARY_VOLUME, "Music/z.flac", "Z"));
    let tracks = first(local.aggregator.audios(SortingRule::default())).await.unwrap();
    assert_eq!(tracks.len(), 1);
    assert_eq!(local.aggregator.collect_garbage().await.unwrap(), 1);
}

#[tokio::test]
async fn test_undivided_library_hides_unmounted_volume() {
    let local = local(vec![
        IndexedTrack::new(PRIMARY_VOLUME, "Music/a.flac", "A"),
        IndexedTrack::new("1A2B-3C4D", "Music/b.flac", "B"),
    ]);
    let on_primary = Identifier::new("local://primary/audio/Music/a.flac");
    let on_sd = Identifier::new("local://1A2B-3C4D/audio/Music/b.flac");

    let mut audios = local.aggregator.audios(SortingRule::default());
    let before = audios.next().await.unwrap().unwrap();
    assert_eq!(before.len(), 2);

    let queue = ResumptionQueueStore::new(QueueStore::new(local.db.clone()));
    queue.save(&[on_primary.clone(), on_sd.clone()], 1, 5_000).unwrap();

    unmount(&local, "1A2B-3C4D");

    // The running list follows the volume change
    let titles = tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            let tracks = audios.next().await.unwrap().unwrap();
            if tracks.len() < 2 {
                break tracks.into_iter().map(|t| t.title).collect::<Vec<_>>();
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(titles, vec!["A"]);

    assert!(matches!(
        first(local.aggregator.audio(&on_sd)).await,
        Err(MediaError::NotFound(_))
    ));

    let restored = queue.reconstruct(&local.aggregator).await.unwrap();
    assert_eq!(restored.items.len(), 1);
    assert_eq!(restored.items[0].title, "A");
    assert_eq!(restored.start_index, 0);
    assert_eq!(restored.start_position_ms, 0);

    let stored = queue.load().unwrap();
    assert_eq!(stored.identifiers(), &[on_primary][..]);
    assert_eq!(stored.start_index(), 0);
    assert_eq!(stored.start_position_ms(), 0);
}
