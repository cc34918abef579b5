use chrono::{Duration, TimeZone, Utc};
use polydb::{Database, StatsStore};
use polysource::Identifier;
use tempfile::TempDir;

fn create_test_store() -> (TempDir, StatsStore) {
    let temp_dir = tempfile::tempdir().unwrap();
    let db = Database::open(&temp_dir.path().join("test.db")).unwrap();
    (temp_dir, StatsStore::new(db))
}

fn audio(key: &str) -> Identifier {
    Identifier::new(format!("local://primary/audio/{}", key))
}

#[test]
fn test_record_played() {
    let (_temp_dir, stats) = create_test_store();
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

    stats.record_played(&audio("a.flac"), at).unwrap();
    stats.record_played(&audio("a.flac"), at).unwrap();

    let row = stats.get(&audio("a.flac")).unwrap().unwrap();
    assert_eq!(row.play_count, 2);
    assert_eq!(row.last_played, Some(at));
    assert!(!row.favorite);
}

#[test]
fn test_most_and_recently_played() {
    let (_temp_dir, stats) = create_test_store();
    let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

    stats.record_played(&audio("a"), base).unwrap();
    stats.record_played(&audio("b"), base + Duration::minutes(1)).unwrap();
    stats.record_played(&audio("b"), base + Duration::minutes(2)).unwrap();
    stats.record_played(&audio("c"), base + Duration::minutes(3)).unwrap();

    let most: Vec<_> = stats
        .most_played(2)
        .unwrap()
        .into_iter()
        .map(|s| s.identifier)
        .collect();
    assert_eq!(most, vec![audio("b"), audio("c")]);

    let recent: Vec<_> = stats
        .recently_played(10)
        .unwrap()
        .into_iter()
        .map(|s| s.identifier)
        .collect();
    assert_eq!(recent, vec![audio("c"), audio("b"), audio("a")]);
}

#[test]
fn test_favorites() {
    let (_temp_dir, stats) = create_test_store();
    stats.set_favorite(&audio("a"), true).unwrap();
    stats.set_favorite(&audio("b"), true).unwrap();
    stats.set_favorite(&audio("a"), false).unwrap();

    let favorites = stats.favorites().unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].identifier, audio("b"));
    assert_eq!(stats.all().unwrap().len(), 2);
}

#[test]
fn test_delete() {
    let (_temp_dir, stats) = create_test_store();
    stats.set_favorite(&audio("a"), true).unwrap();
    stats.record_played(&audio("b"), Utc::now()).unwrap();

    let removed = stats
        .delete(&[audio("a"), audio("missing")])
        .unwrap();
    assert_eq!(removed, 1);
    assert!(stats.get(&audio("a")).unwrap().is_none());
    assert!(stats.get(&audio("b")).unwrap().is_some());
}
