mod common;

use common::{Harness, MockBackend, MockFactory, provider, server};
use futures::StreamExt;
use polysource::{BackendKind, MediaError, MediaKind, SortingRule, first};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const SUBSONIC: BackendKind = BackendKind::Subsonic;
const JELLYFIN: BackendKind = BackendKind::Jellyfin;

/// Three remote providers; the local library is hidden (split, no volume)
fn three_providers() -> (Harness, Arc<MockBackend>, Arc<MockBackend>, Arc<MockBackend>) {
    let p1 = Arc::new(MockBackend::new("p1", SUBSONIC).with_album("a1").with_audio("t1"));
    let p2 = Arc::new(MockBackend::new("p2", SUBSONIC).with_album("a2").with_audio("t2"));
    let p3 = Arc::new(MockBackend::new("p3", JELLYFIN).with_album("a3").with_audio("t3"));
    let factory = MockFactory::default()
        .with(provider(SUBSONIC, 1), p1.clone())
        .with(provider(SUBSONIC, 2), p2.clone())
        .with(provider(JELLYFIN, 3), p3.clone());

    // Deliberately unsorted: the catalog orders providers itself
    let servers = vec![server(JELLYFIN, 3), server(SUBSONIC, 1), server(SUBSONIC, 2)];
    (Harness::new(factory, servers, true), p1, p2, p3)
}

fn album_titles(albums: &[polysource::Album]) -> Vec<String> {
    albums.iter().map(|a| a.title.clone()).collect()
}

#[tokio::test]
async fn test_routing_determinism() {
    let (h, p1, p2, p3) = three_providers();

    for (backend, expected) in [
        (&p1, provider(SUBSONIC, 1)),
        (&p2, provider(SUBSONIC, 2)),
        (&p3, provider(JELLYFIN, 3)),
    ] {
        let id = backend.id(MediaKind::Audio, "anything");
        assert_eq!(
            h.aggregator.identify(&id).await,
            Some((expected, MediaKind::Audio))
        );
    }

    assert_eq!(h.aggregator.identify(&"mock://p9/audio/x".into()).await, None);
    let unknown = first(h.aggregator.audio(&"mock://p9/audio/x".into())).await;
    assert!(matches!(unknown, Err(MediaError::NotFound(_))));
}

#[tokio::test]
async fn test_catalog_order() {
    let (h, ..) = three_providers();
    let ids: Vec<_> = h.aggregator.providers().into_iter().map(|p| p.id).collect();
    assert_eq!(
        ids,
        vec![provider(SUBSONIC, 1), provider(SUBSONIC, 2), provider(JELLYFIN, 3)]
    );
}

#[tokio::test]
async fn test_navigation_fallback() {
    let (h, ..) = three_providers();
    let p2 = provider(SUBSONIC, 2);
    h.aggregator.set_navigation_provider(p2).unwrap();
    assert_eq!(h.aggregator.navigation_provider().unwrap().id, p2);

    // Preferred provider removed: first remaining one
    h.set_servers(vec![server(SUBSONIC, 1), server(JELLYFIN, 3)]).await;
    assert_eq!(h.aggregator.navigation_provider().unwrap().id, provider(SUBSONIC, 1));

    h.set_servers(vec![server(JELLYFIN, 3)]).await;
    assert_eq!(h.aggregator.navigation_provider().unwrap().id, provider(JELLYFIN, 3));

    // Nothing left: the dummy backend answers
    h.set_servers(vec![]).await;
    assert!(h.aggregator.navigation_provider().is_none());
    let albums = first(h.aggregator.albums(SortingRule::default())).await.unwrap();
    assert!(albums.is_empty());

    // The preference survived and applies again once the provider is back
    assert_eq!(h.preferences.navigation_provider(), Some(p2));
    h.set_servers(vec![server(SUBSONIC, 1), server(SUBSONIC, 2)]).await;
    assert_eq!(h.aggregator.navigation_provider().unwrap().id, p2);
}

#[tokio::test]
async fn test_collection_stream_follows_navigation() {
    let (h, ..) = three_providers();
    h.aggregator.set_navigation_provider(provider(SUBSONIC, 2)).unwrap();

    let mut albums = h.aggregator.albums(SortingRule::default());
    let current = albums.next().await.unwrap().unwrap();
    assert_eq!(album_titles(&current), vec!["p2 a2"]);

    h.set_servers(vec![server(SUBSONIC, 1), server(JELLYFIN, 3)]).await;
    let current = timeout(Duration::from_secs(1), albums.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(album_titles(&current), vec!["p1 a1"]);
}

#[tokio::test]
async fn test_switch_latest_drops_late_results() {
    let slow = Arc::new(MockBackend::new("slow", SUBSONIC).with_album("late").with_delay(Duration::from_millis(300)));
    let fast = Arc::new(MockBackend::new("fast", JELLYFIN).with_album("fresh"));
    let factory = MockFactory::default()
        .with(provider(SUBSONIC, 1), slow)
        .with(provider(JELLYFIN, 2), fast);
    let h = Harness::new(factory, vec![server(SUBSONIC, 1), server(JELLYFIN, 2)], true);
    h.aggregator.set_navigation_provider(provider(SUBSONIC, 1)).unwrap();

    let mut albums = h.aggregator.albums(SortingRule::default());
    // The slow provider has not answered yet
    assert!(timeout(Duration::from_millis(50), albums.next()).await.is_err());

    h.aggregator.set_navigation_provider(provider(JELLYFIN, 2)).unwrap();
    let current = timeout(Duration::from_secs(1), albums.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(album_titles(&current), vec!["fast fresh"]);

    // Well past the slow answer: it never shows up
    assert!(timeout(Duration::from_millis(600), albums.next()).await.is_err());
}

#[tokio::test]
async fn test_multi_identifier_rejection() {
    let (h, p1, p2, _) = three_providers();
    let playlist = p1.id(MediaKind::Playlist, "pl");
    let foreign = p2.id(MediaKind::Audio, "t2");

    let result = h.aggregator.add_audio_to_playlist(&playlist, &foreign).await;
    assert!(matches!(result, Err(MediaError::NotFound(_))));
    let result = h.aggregator.remove_audio_from_playlist(&playlist, &foreign).await;
    assert!(matches!(result, Err(MediaError::NotFound(_))));
    assert!(p1.mutations().is_empty());
    assert!(p2.mutations().is_empty());

    let own = p1.id(MediaKind::Audio, "t1");
    h.aggregator.add_audio_to_playlist(&playlist, &own).await.unwrap();
    assert_eq!(p1.mutations(), vec![format!("add {} {}", playlist, own)]);
}

#[tokio::test]
async fn test_identifier_stream_re_emits_and_re_routes() {
    let (h, _, _, p3) = three_providers();
    let id = p3.id(MediaKind::Audio, "t3");

    let mut audio = h.aggregator.audio(&id);
    assert!(!audio.next().await.unwrap().unwrap().favorite);

    h.aggregator.set_favorite(&id, true).await.unwrap();
    let updated = timeout(Duration::from_secs(1), audio.next()).await.unwrap().unwrap();
    assert!(updated.unwrap().favorite);

    // Owner gone: the stream reports the identifier as not found
    h.set_servers(vec![server(SUBSONIC, 1)]).await;
    let gone = timeout(Duration::from_secs(1), audio.next()).await.unwrap().unwrap();
    assert!(matches!(gone, Err(MediaError::NotFound(_))));
}

#[tokio::test]
async fn test_create_playlist_goes_to_navigation_provider() {
    let (h, ..) = three_providers();
    // Mock backends keep the default: read-only playlists
    let result = h.aggregator.create_playlist("Road trip").await;
    assert!(matches!(result, Err(MediaError::NotImplemented(_))));

    h.set_servers(vec![]).await;
    let result = h.aggregator.create_playlist("Road trip").await;
    assert!(matches!(result, Err(MediaError::NotImplemented(_))));
}

#[tokio::test]
async fn test_navigation_provider_stream() {
    let (h, ..) = three_providers();
    let mut navigation = h.aggregator.navigation_provider_stream();
    assert_eq!(
        navigation.next().await.unwrap().map(|p| p.id),
        Some(provider(SUBSONIC, 1))
    );

    h.aggregator.set_navigation_provider(provider(JELLYFIN, 3)).unwrap();
    assert_eq!(
        navigation.next().await.unwrap().map(|p| p.id),
        Some(provider(JELLYFIN, 3))
    );

    // Unknown preference: falls back without a new selection
    h.aggregator.set_navigation_provider(provider(JELLYFIN, 42)).unwrap();
    assert_eq!(
        navigation.next().await.unwrap().map(|p| p.id),
        Some(provider(SUBSONIC, 1))
    );
}
