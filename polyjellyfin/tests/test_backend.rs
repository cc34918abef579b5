//! Tests du backend Jellyfin contre un serveur simulé

use mockito::{Matcher, Server, ServerGuard};
use polyjellyfin::{JellyfinBackend, JellyfinSettings};
use polysource::{MediaBackend, MediaError, MediaKind, SortingRule, first};
use serde_json::json;

async fn mock_login(server: &mut ServerGuard, hits: usize) -> mockito::Mock {
    server
        .mock("POST", "/Users/AuthenticateByName")
        .match_header(
            "authorization",
            Matcher::Regex(r#"^MediaBrowser Client="Polyphon".*DeviceId="dev-1""#.to_string()),
        )
        .match_body(Matcher::PartialJson(json!({"Username": "bob", "Pw": "secret"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "User": {"Id": "u1", "Name": "bob"},
                "AccessToken": "tok",
                "ServerId": "srv"
            })
            .to_string(),
        )
        .expect(hits)
        .create_async()
        .await
}

fn backend(server: &ServerGuard) -> JellyfinBackend {
    let settings = JellyfinSettings::new(server.url(), "bob", "secret")
        .with_client("Polyphon", "0.1.0")
        .with_device("Test", "dev-1");
    JellyfinBackend::from_settings(5, settings).unwrap()
}

fn items(items: serde_json::Value) -> String {
    let count = items.as_array().map_or(0, Vec::len);
    json!({"Items": items, "TotalRecordCount": count, "StartIndex": 0}).to_string()
}

#[tokio::test]
async fn test_album_detail() {
    let mut server = Server::new_async().await;
    let login = mock_login(&mut server, 1).await;
    server
        .mock("GET", "/Users/u1/Items/al1")
        .match_header("authorization", Matcher::Regex(r#"Token="tok""#.to_string()))
        .with_status(200)
        .with_body(
            json!({
                "Id": "al1", "Name": "Heavy Weather", "Type": "MusicAlbum",
                "AlbumArtist": "Weather Report",
                "AlbumArtists": [{"Name": "Weather Report", "Id": "ar1"}],
                "ChildCount": 2, "ProductionYear": 1977
            })
            .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("GET", "/Users/u1/Items")
        .match_query(Matcher::UrlEncoded("ParentId".into(), "al1".into()))
        .with_status(200)
        .with_body(items(json!([
            {"Id": "t1", "Name": "Birdland", "Type": "Audio", "IndexNumber": 1, "AlbumId": "al1"},
            {"Id": "t2", "Name": "A Remark You Made", "Type": "Audio", "IndexNumber": 2, "AlbumId": "al1"}
        ])))
        .create_async()
        .await;

    let backend = backend(&server);
    let detail = first(backend.album(&"jellyfin://5/album/al1".into()))
        .await
        .unwrap();
    assert_eq!(detail.album.title, "Heavy Weather");
    assert_eq!(detail.album.year, Some(1977));
    assert_eq!(detail.tracks.len(), 2);
    assert_eq!(detail.tracks[0].id.as_str(), "jellyfin://5/audio/t1");

    // Une seule connexion pour les deux requêtes
    login.assert_async().await;

    // Mauvais type d'élément pour l'identifiant
    let wrong = first(backend.artist(&"jellyfin://5/artist/al1".into())).await;
    assert!(matches!(wrong, Err(MediaError::NotFound(_))));
}

#[tokio::test]
async fn test_rejected_session_logs_in_again() {
    let mut server = Server::new_async().await;
    let login = mock_login(&mut server, 2).await;
    server
        .mock("GET", "/Users/u1/Items/t1")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    server
        .mock("GET", "/Users/u1/Items/t1")
        .with_status(200)
        .with_body(json!({"Id": "t1", "Name": "Birdland", "Type": "Audio"}).to_string())
        .create_async()
        .await;

    let audio = first(backend(&server).audio(&"jellyfin://5/audio/t1".into()))
        .await
        .unwrap();
    assert_eq!(audio.title, "Birdland");
    login.assert_async().await;
}

#[tokio::test]
async fn test_repeated_rejection_is_invalid_credentials() {
    let mut server = Server::new_async().await;
    mock_login(&mut server, 1).await;
    server
        .mock("GET", "/Users/u1/Items/t1")
        .with_status(401)
        .expect_at_least(2)
        .create_async()
        .await;

    let result = first(backend(&server).audio(&"jellyfin://5/audio/t1".into())).await;
    assert_eq!(result, Err(MediaError::InvalidCredentials));
}

#[tokio::test]
async fn test_wrong_password() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/Users/AuthenticateByName")
        .with_status(401)
        .create_async()
        .await;

    let result = first(backend(&server).albums(SortingRule::default())).await;
    assert_eq!(result, Err(MediaError::InvalidCredentials));
}

#[tokio::test]
async fn test_favorites_playlist() {
    let mut server = Server::new_async().await;
    mock_login(&mut server, 1).await;
    server
        .mock("GET", "/Users/u1/Items")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("IncludeItemTypes".into(), "Audio".into()),
            Matcher::UrlEncoded("IsFavorite".into(), "true".into()),
        ]))
        .with_status(200)
        .with_body(items(json!([
            {"Id": "t1", "Name": "Birdland", "Type": "Audio", "UserData": {"IsFavorite": true}}
        ])))
        .create_async()
        .await;
    server
        .mock("GET", "/Users/u1/Items")
        .match_query(Matcher::UrlEncoded("IncludeItemTypes".into(), "Playlist".into()))
        .with_status(200)
        .with_body(items(json!([
            {"Id": "p1", "Name": "Road trip", "Type": "Playlist", "ChildCount": 3}
        ])))
        .create_async()
        .await;
    let favorite = server
        .mock("POST", "/Users/u1/FavoriteItems/t2")
        .with_status(200)
        .with_body(json!({"IsFavorite": true}).to_string())
        .expect(1)
        .create_async()
        .await;

    let backend = backend(&server);
    let playlists = first(backend.playlists(SortingRule::default()))
        .await
        .unwrap();
    let names: Vec<&str> = playlists.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Favorites", "Road trip"]);
    assert_eq!(playlists[0].track_count, 1);
    assert!(!playlists[0].editable);
    assert!(playlists[1].editable);

    let favorites = first(backend.playlist(&"jellyfin://5/playlist/favorites".into()))
        .await
        .unwrap();
    assert_eq!(favorites.tracks.len(), 1);
    assert!(favorites.tracks[0].favorite);

    backend
        .add_audio_to_playlist(
            &"jellyfin://5/playlist/favorites".into(),
            &"jellyfin://5/audio/t2".into(),
        )
        .await
        .unwrap();
    favorite.assert_async().await;

    assert!(matches!(
        backend
            .rename_playlist(&"jellyfin://5/playlist/favorites".into(), "Mine")
            .await,
        Err(MediaError::NotImplemented(_))
    ));
}

#[tokio::test]
async fn test_stream_uri_and_identify() {
    let mut server = Server::new_async().await;
    mock_login(&mut server, 1).await;
    let backend = backend(&server);

    let uri = backend
        .stream_uri(&"jellyfin://5/audio/t1".into())
        .await
        .unwrap();
    assert!(uri.starts_with(&format!("{}/Audio/t1/stream?", server.url())));
    assert!(uri.contains("api_key=tok"));
    assert!(uri.contains("DeviceId=dev-1"));

    assert_eq!(
        backend.identify(&"jellyfin://5/genre/g1".into()).await,
        Some(MediaKind::Genre)
    );
    assert_eq!(backend.identify(&"jellyfin://6/genre/g1".into()).await, None);
    assert!(matches!(
        backend.stream_uri(&"subsonic://5/audio/t1".into()).await,
        Err(MediaError::NotFound(_))
    ));
}
