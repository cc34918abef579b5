use futures::StreamExt;
use polydb::{Database, StatsStore};
use polylocal::{
    IndexedPlaylist, IndexedTrack, LocalBackend, LocalLibrary, MemoryIndex, StorageVolume,
    VolumeState,
};
use polysource::{
    Identifier, MediaBackend, MediaError, MediaKind, SortStrategy, SortingRule, first,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

struct Fixture {
    index: Arc<MemoryIndex>,
    library: Arc<LocalLibrary>,
    volumes: watch::Sender<Vec<StorageVolume>>,
}

fn track(volume: &str, path: &str, title: &str, artist: &str, album: &str) -> IndexedTrack {
    IndexedTrack {
        artist: Some(artist.to_string()),
        album: Some(album.to_string()),
        genre: Some("Rock".to_string()),
        ..IndexedTrack::new(volume, path, title)
    }
}

fn fixture() -> Fixture {
    let index = Arc::new(MemoryIndex::with_tracks(vec![
        IndexedTrack {
            added: 10,
            ..track("primary", "Music/one.flac", "One", "Alpha", "First")
        },
        IndexedTrack {
            added: 20,
            lyrics: Some("la la".to_string()),
            ..track("primary", "Music/two.flac", "Two", "Alpha", "First")
        },
        IndexedTrack {
            added: 30,
            ..track("sd", "three.mp3", "Three", "Beta", "Second")
        },
    ]));
    let stats = StatsStore::new(Database::open_in_memory().unwrap());
    let (volumes_tx, volumes) = watch::channel(vec![
        StorageVolume::new(None, "Internal", "/storage/emulated/0", VolumeState::Mounted, true),
        StorageVolume::new(Some("sd"), "SD card", "/storage/sd", VolumeState::Mounted, false),
    ]);
    let library = Arc::new(LocalLibrary::new(index.clone(), stats, volumes));
    Fixture {
        index,
        library,
        volumes: volumes_tx,
    }
}

fn audio_id(volume: &str, path: &str) -> Identifier {
    Identifier::new(format!("local://{}/audio/{}", volume, path))
}

#[tokio::test]
async fn test_identify_by_authority() {
    let f = fixture();
    let undivided = LocalBackend::undivided(f.library.clone());
    let sd = LocalBackend::for_volume(f.library.clone(), "sd");

    let on_sd = audio_id("sd", "three.mp3");
    assert_eq!(undivided.identify(&on_sd).await, Some(MediaKind::Audio));
    assert_eq!(sd.identify(&on_sd).await, Some(MediaKind::Audio));

    let on_primary = audio_id("primary", "Music/one.flac");
    assert_eq!(sd.identify(&on_primary).await, None);

    let all_albums = Identifier::new("local://*/album/0011223344556677");
    assert_eq!(undivided.identify(&all_albums).await, Some(MediaKind::Album));
    assert_eq!(sd.identify(&all_albums).await, None);

    let remote = Identifier::new("subsonic://1/audio/42");
    assert_eq!(undivided.identify(&remote).await, None);
}

#[tokio::test]
async fn test_volume_backend_filters_tracks() {
    let f = fixture();
    let sd = LocalBackend::for_volume(f.library.clone(), "sd");

    let tracks = first(sd.audios(SortingRule::default())).await.unwrap();
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].id, audio_id("sd", "three.mp3"));

    let albums = first(sd.albums(SortingRule::default())).await.unwrap();
    assert_eq!(albums.len(), 1);
    assert!(albums[0].id.as_str().starts_with("local://sd/album/"));
}

#[tokio::test]
async fn test_album_round_trip() {
    let f = fixture();
    let backend = LocalBackend::undivided(f.library.clone());

    let albums = first(backend.albums(SortingRule::default())).await.unwrap();
    let first_album = albums.iter().find(|a| a.title == "First").unwrap();
    assert_eq!(first_album.track_count, 2);

    let detail = first(backend.album(&first_album.id)).await.unwrap();
    assert_eq!(detail.tracks.len(), 2);

    let artist_id = detail.tracks[0].artist_id.clone().unwrap();
    let artist = first(backend.artist(&artist_id)).await.unwrap();
    assert_eq!(artist.artist.name, "Alpha");
    assert_eq!(artist.albums.len(), 1);
}

#[tokio::test]
async fn test_sort_by_added() {
    let f = fixture();
    let backend = LocalBackend::undivided(f.library.clone());

    let rule = SortingRule::new(SortStrategy::Added, false);
    let titles: Vec<_> = first(backend.audios(rule))
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.title)
        .collect();
    assert_eq!(titles, vec!["Three", "Two", "One"]);
}

#[tokio::test]
async fn test_missing_audio_is_not_found() {
    let f = fixture();
    let backend = LocalBackend::undivided(f.library.clone());
    let result = first(backend.audio(&audio_id("primary", "gone.flac"))).await;
    assert!(matches!(result, Err(MediaError::NotFound(_))));
}

#[tokio::test]
async fn test_favorite_re_emits_on_every_backend() {
    let f = fixture();
    let undivided = LocalBackend::undivided(f.library.clone());
    let sd = LocalBackend::for_volume(f.library.clone(), "sd");
    let id = audio_id("sd", "three.mp3");

    let mut stream = undivided.audio(&id);
    assert!(!stream.next().await.unwrap().unwrap().favorite);

    sd.set_favorite(&id, true).await.unwrap();

    let updated = tokio::time::timeout(Duration::from_secs(1), stream.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(updated.favorite);
}

#[tokio::test]
async fn test_index_change_re_emits() {
    let f = fixture();
    let backend = LocalBackend::undivided(f.library.clone());
    let mut stream = backend.audios(SortingRule::default());
    assert_eq!(stream.next().await.unwrap().unwrap().len(), 3);

    f.index.remove_track("sd", "three.mp3");

    let tracks = tokio::time::timeout(Duration::from_secs(1), stream.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(tracks.len(), 2);
}

#[tokio::test]
async fn test_unmounted_volume_leaves_undivided_listing() {
    let f = fixture();
    let backend = LocalBackend::undivided(f.library.clone());
    let mut stream = backend.audios(SortingRule::default());
    assert_eq!(stream.next().await.unwrap().unwrap().len(), 3);

    f.volumes.send_modify(|volumes| volumes[1].state = VolumeState::Unmounted);

    let tracks = tokio::time::timeout(Duration::from_secs(1), stream.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let mut titles: Vec<_> = tracks.into_iter().map(|t| t.title).collect();
    titles.sort();
    assert_eq!(titles, vec!["One", "Two"]);

    let on_sd = audio_id("sd", "three.mp3");
    assert!(matches!(
        first(backend.audio(&on_sd)).await,
        Err(MediaError::NotFound(_))
    ));

    // Remounting brings the track back
    f.volumes.send_modify(|volumes| volumes[1].state = VolumeState::Mounted);
    let tracks = tokio::time::timeout(Duration::from_secs(1), stream.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(tracks.len(), 3);
}

#[tokio::test]
async fn test_favorites_playlist_membership() {
    let f = fixture();
    let backend = LocalBackend::undivided(f.library.clone());
    let id = audio_id("primary", "Music/one.flac");
    let favorites = Identifier::new("local://*/playlist/favorites");

    backend.add_audio_to_playlist(&favorites, &id).await.unwrap();

    let detail = first(backend.playlist(&favorites)).await.unwrap();
    assert_eq!(detail.tracks.len(), 1);
    assert_eq!(detail.tracks[0].id, id);

    let status = first(backend.audio_playlists_status(&id)).await.unwrap();
    assert!(status.iter().any(|m| m.playlist.id == favorites && m.contains));

    backend
        .remove_audio_from_playlist(&favorites, &id)
        .await
        .unwrap();
    let detail = first(backend.playlist(&favorites)).await.unwrap();
    assert!(detail.tracks.is_empty());
}

#[tokio::test]
async fn test_indexed_playlists_are_read_only() {
    let f = fixture();
    f.index.set_playlists(vec![IndexedPlaylist {
        volume: "primary".to_string(),
        key: "Playlists/road.m3u".to_string(),
        name: "Road".to_string(),
        entries: vec!["Music/two.flac".to_string(), "Music/missing.flac".to_string()],
    }]);
    let backend = LocalBackend::undivided(f.library.clone());

    let playlists = first(backend.playlists(SortingRule::default())).await.unwrap();
    let road = playlists.iter().find(|p| p.name == "Road").unwrap();
    assert_eq!(road.track_count, 1);
    assert!(!road.editable);

    let result = backend
        .add_audio_to_playlist(&road.id, &audio_id("primary", "Music/one.flac"))
        .await;
    assert!(matches!(result, Err(MediaError::NotImplemented(_))));
    assert!(matches!(
        backend.create_playlist("New").await,
        Err(MediaError::NotImplemented(_))
    ));
}

#[tokio::test]
async fn test_play_statistics_and_activity() {
    let f = fixture();
    let backend = LocalBackend::undivided(f.library.clone());
    let two = audio_id("primary", "Music/two.flac");

    backend.notify_played(&two).await.unwrap();
    backend.notify_played(&two).await.unwrap();

    let activity = first(backend.activity()).await.unwrap();
    assert_eq!(activity.most_played.len(), 1);
    assert_eq!(activity.most_played[0].id, two);
    assert_eq!(activity.recently_played[0].id, two);
    assert_eq!(activity.recently_added[0].title, "Second");

    let rule = SortingRule::new(SortStrategy::PlayCount, false);
    let tracks = first(backend.audios(rule)).await.unwrap();
    assert_eq!(tracks[0].id, two);
}

#[tokio::test]
async fn test_lyrics_and_stream_uri() {
    let f = fixture();
    let backend = LocalBackend::undivided(f.library.clone());

    let lyrics = first(backend.lyrics(&audio_id("primary", "Music/two.flac")))
        .await
        .unwrap();
    assert_eq!(lyrics.as_deref(), Some("la la"));

    let uri = backend
        .stream_uri(&audio_id("sd", "three.mp3"))
        .await
        .unwrap();
    assert_eq!(uri, "file:///storage/sd/three.mp3");

    let unknown_volume = backend.stream_uri(&audio_id("usb", "x.mp3")).await;
    assert!(matches!(unknown_volume, Err(MediaError::NotFound(_))));
}

#[tokio::test]
async fn test_search() {
    let f = fixture();
    let backend = LocalBackend::undivided(f.library.clone());
    let items = first(backend.search("beta")).await.unwrap();
    let kinds: Vec<_> = items.iter().map(|i| i.kind()).collect();
    assert_eq!(kinds, vec![MediaKind::Artist, MediaKind::Audio]);
}
