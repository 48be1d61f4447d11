//! Concrete multi-component scenarios: renames, and watcher event
//! coalescing for a path that's added and unlinked within one debounce
//! window. Single-component scenarios are covered by each module's own
//! unit tests.

use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;

use crate::format::FormatRegistry;
use crate::store::{DocStore, DocStoreConfig};
use crate::watcher::{coalesce, EventKind, RawEventKind};

fn registry() -> FormatRegistry {
    FormatRegistry::with_defaults()
}

/// A file with a stable id is renamed within the same batch. The node
/// keeps its id and `sourceRef.path` updates; `vector.delete` is not
/// called (there is no vector provider here, so a call would panic the
/// test via an unconfigured mock — asserting its absence by construction).
#[tokio::test]
async fn rename_keeps_id_and_updates_path() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("old.md"), "---\nid: abc123def456\ntitle: Stable\n---\nbody").unwrap();

    let cache_dir = dir.path().join(".roux");
    let config = DocStoreConfig::new(dir.path(), &cache_dir);
    let store = DocStore::new(config, registry(), None).unwrap();
    store.sync().await.unwrap();

    // simulate the rename as the watcher would coalesce it: unlink(old),
    // add(new), both inside the debounce window.
    std::fs::remove_file(dir.path().join("old.md")).unwrap();
    std::fs::write(dir.path().join("new.md"), "---\nid: abc123def456\ntitle: Stable\n---\nbody").unwrap();

    let mut events = std::collections::HashMap::new();
    events.insert("old.md".to_string(), EventKind::Unlink);
    let touched = store.handle_watcher_batch(events).await.unwrap();
    assert!(touched.contains(&"abc123def456".to_string()));

    let mut events2 = std::collections::HashMap::new();
    events2.insert("new.md".to_string(), EventKind::Add);
    store.handle_watcher_batch(events2).await.unwrap();

    let node = store.get_node("abc123def456").await.unwrap().unwrap();
    assert_eq!(node.id, "abc123def456");
    assert_eq!(node.source_ref.unwrap().path, "new.md");
}

/// End-to-end: a real `notify` watcher, started through
/// `DocStore::start_watching`, picks up a file dropped on disk and indexes
/// it after its debounce window elapses — no hand-built `HashMap` batch.
#[tokio::test]
async fn start_watching_indexes_a_file_dropped_on_disk() {
    let dir = tempdir().unwrap();
    let cache_dir = dir.path().join(".roux");
    let mut config = DocStoreConfig::new(dir.path(), &cache_dir);
    config.watcher_config.debounce = Duration::from_millis(100);

    let store = Arc::new(DocStore::new(config, registry(), None).unwrap());
    store.sync().await.unwrap();
    store.start_watching().await.unwrap();

    std::fs::write(dir.path().join("dropped.md"), "---\ntitle: Dropped\n---\nbody").unwrap();

    // real debounce window (100ms) plus slack for the OS to deliver the
    // notify event and the callback's spawned task to run.
    tokio::time::sleep(Duration::from_millis(750)).await;

    let filter = crate::database::ListFilter {
        path: Some("dropped.md".to_string()),
        ..Default::default()
    };
    let found = store
        .list_nodes(&filter, &crate::database::ListOptions::default())
        .await
        .unwrap();
    assert_eq!(found.total, 1i64, "watcher must index the file after the debounce window");

    store.close().await.unwrap();
}

/// Within one batch, an add immediately followed by an unlink for the
/// same path coalesces to nothing and the watcher's debounce timer clears
/// without a flush.
#[test]
fn add_then_unlink_same_path_cancels() {
    let mut state: Option<EventKind> = None;
    state = coalesce(state, RawEventKind::Add);
    state = coalesce(state, RawEventKind::Unlink);
    assert_eq!(state, None, "add;unlink must coalesce to nothing");
}
