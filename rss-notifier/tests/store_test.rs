mod common;

use common::init_tracing;
use rss_notifier::store::DedupSnapshot;
use rss_notifier::{DedupMode, DedupStore, FileDedupStore, MemoryBacking, MemoryDedupStore, RelayError, Seen, SqliteDedupStore};
use tempfile::TempDir;

fn ids(range: std::ops::RangeInclusive<usize>) -> Vec<String> {
    range.map(|n| format!("https://news.example.com/{}", n)).collect()
}

#[tokio::test]
async fn test_missing_file_opens_empty() {
    init_tracing();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache").join("posted.txt");
    let mut store = FileDedupStore::open(&path, DedupMode::Bounded { capacity: 10 }).await.unwrap();

    assert!(store.is_empty());
    // Nothing staged: flushing must not create the file.
    assert_eq!(store.flush().await.unwrap(), 0);
    assert!(!path.exists());
}

#[tokio::test]
async fn test_unreadable_cache_is_fatal() {
    init_tracing();

    let dir = TempDir::new().unwrap();
    // A directory where the file should be cannot be read as a cache.
    let result = FileDedupStore::open(dir.path(), DedupMode::Bounded { capacity: 10 }).await;

    assert!(matches!(result, Err(RelayError::Store(_))));
}

#[tokio::test]
async fn test_file_store_round_trips_and_evicts_oldest() {
    init_tracing();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("posted.txt");
    let mode = DedupMode::Bounded { capacity: 3 };

    let mut store = FileDedupStore::open(&path, mode).await.unwrap();
    for id in ids(1..=2) {
        store.stage_commit(id);
    }
    assert_eq!(store.flush().await.unwrap(), 2);

    let mut store = FileDedupStore::open(&path, mode).await.unwrap();
    assert!(store.contains("https://news.example.com/1"));
    for id in ids(3..=4) {
        store.stage_commit(id);
    }
    store.flush().await.unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().collect::<Vec<_>>(), ids(2..=4));

    let store = FileDedupStore::open(&path, mode).await.unwrap();
    assert_eq!(store.len(), 3);
    assert!(!store.contains("https://news.example.com/1"));
    assert!(store.contains("https://news.example.com/4"));

    // Only the final file remains; the temp file was renamed over it.
    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn test_bounded_store_never_exceeds_capacity() {
    init_tracing();

    let backing = MemoryBacking::new();
    let mode = DedupMode::Bounded { capacity: 5 };

    for batch in 0..4 {
        let mut store = MemoryDedupStore::open(backing.clone(), mode);
        for id in ids(batch * 3 + 1..=batch * 3 + 3) {
            store.stage_commit(id);
        }
        store.flush().await.unwrap();
        assert!(store.len() <= 5);
        assert!(backing.ids().len() <= 5);
    }

    assert_eq!(backing.ids(), ids(8..=12));
}

#[tokio::test]
async fn test_cursor_file_holds_a_single_id() {
    init_tracing();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("last_posted.txt");
    std::fs::write(&path, "https://news.example.com/1").unwrap();

    let mut store = FileDedupStore::open(&path, DedupMode::Cursor).await.unwrap();
    assert_eq!(store.lookup("https://news.example.com/1"), Seen::Watermark);
    assert_eq!(store.lookup("https://news.example.com/2"), Seen::New);

    store.stage_commit("https://news.example.com/3".to_string());
    store.stage_commit("https://news.example.com/2".to_string());
    store.flush().await.unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "https://news.example.com/3");
    // Until the run ends the old cursor still bounds the scan.
    assert_eq!(store.lookup("https://news.example.com/2"), Seen::Delivered);
    assert_eq!(store.lookup("https://news.example.com/1"), Seen::Watermark);

    store.begin_run();
    assert_eq!(store.lookup("https://news.example.com/3"), Seen::Watermark);
    assert_eq!(store.lookup("https://news.example.com/2"), Seen::New);
    assert_eq!(store.lookup("https://news.example.com/1"), Seen::New);
}

#[tokio::test]
async fn test_staged_ids_count_as_delivered() {
    let mut store = MemoryDedupStore::open(MemoryBacking::new(), DedupMode::Bounded { capacity: 10 });
    store.stage_commit("a".to_string());
    store.stage_commit("a".to_string());

    assert_eq!(store.lookup("a"), Seen::Delivered);
    assert_eq!(store.staged().len(), 1);
}

#[tokio::test]
async fn test_failed_write_keeps_staged_ids() {
    init_tracing();

    let backing = MemoryBacking::with_ids(["a"]);
    backing.reject_writes(true);
    let mut store = MemoryDedupStore::open(backing.clone(), DedupMode::Bounded { capacity: 10 });
    store.stage_commit("b".to_string());

    assert!(store.flush().await.is_err());
    assert_eq!(backing.ids(), vec!["a".to_string()]);
    assert_eq!(store.staged(), ["b".to_string()]);

    backing.reject_writes(false);
    assert_eq!(store.flush().await.unwrap(), 1);
    assert_eq!(backing.ids(), vec!["a".to_string(), "b".to_string()]);
}

#[tokio::test]
async fn test_sqlite_store_persists_across_opens() {
    init_tracing();

    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}", dir.path().join("state.db").display());
    let mode = DedupMode::Bounded { capacity: 2 };

    let mut store = SqliteDedupStore::open(&url, mode).await.unwrap();
    assert!(store.is_empty());
    for id in ids(1..=3) {
        store.stage_commit(id);
    }
    assert_eq!(store.flush().await.unwrap(), 3);
    drop(store);

    let store = SqliteDedupStore::open(&url, mode).await.unwrap();
    assert_eq!(store.snapshot().ids().collect::<Vec<_>>(), vec![
        "https://news.example.com/2",
        "https://news.example.com/3"
    ]);
}

#[tokio::test]
async fn test_sqlite_in_memory_store() {
    init_tracing();

    let mut store = SqliteDedupStore::open("sqlite::memory:", DedupMode::Cursor).await.unwrap();
    store.stage_commit("newest".to_string());
    store.flush().await.unwrap();
    store.begin_run();

    assert_eq!(store.lookup("newest"), Seen::Watermark);
    assert_eq!(store.len(), 1);
}

#[test]
fn test_snapshot_ignores_blank_lines_and_repeats() {
    let snapshot = DedupSnapshot::new(
        DedupMode::Bounded { capacity: 10 },
        vec!["a".into(), "".into(), " b ".into(), "a".into()],
    );

    assert_eq!(snapshot.ids().collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(snapshot.lookup("b"), Seen::Delivered);
}
