//! Cross-cutting invariants that exercise more than one component: id
//! stability, link closure (no orphaned ghosts), and path safety on write.

use tempfile::tempdir;

use crate::format::FormatRegistry;
use crate::model::Node;
use crate::store::{DocStore, DocStoreConfig};

fn registry() -> FormatRegistry {
    FormatRegistry::with_defaults()
}

/// A node's id survives a content edit (re-sync with the same frontmatter
/// id) and a later restart (fresh `DocStore` against the same cache
/// directory).
#[tokio::test]
async fn id_survives_content_edit_and_restart() {
    let dir = tempdir().unwrap();
    let cache_dir = dir.path().join(".roux");
    std::fs::write(
        dir.path().join("note.md"),
        "---\nid: abc123def456\ntitle: Note\n---\noriginal body",
    )
    .unwrap();

    {
        let config = DocStoreConfig::new(dir.path(), &cache_dir);
        let store = DocStore::new(config, registry(), None).unwrap();
        store.sync().await.unwrap();
        store.close().await.unwrap();
    }

    std::fs::write(
        dir.path().join("note.md"),
        "---\nid: abc123def456\ntitle: Note\n---\nedited body",
    )
    .unwrap();

    let config = DocStoreConfig::new(dir.path(), &cache_dir);
    let store = DocStore::new(config, registry(), None).unwrap();
    store.sync().await.unwrap();

    let node = store.get_node("abc123def456").await.unwrap().unwrap();
    assert_eq!(node.id, "abc123def456");
    assert!(node.content.contains("edited body"));
}

/// Every outgoing link id is either a real node or a ghost that exists;
/// no orphaned ghosts remain after sync.
#[tokio::test]
async fn link_closure_has_no_orphan_ghosts() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("a.md"), "---\ntitle: A\n---\nSee [[Nonexistent Page]].").unwrap();

    let cache_dir = dir.path().join(".roux");
    let config = DocStoreConfig::new(dir.path(), &cache_dir);
    let store = DocStore::new(config, registry(), None).unwrap();
    store.sync().await.unwrap();

    let node = store
        .list_nodes(&Default::default(), &Default::default())
        .await
        .unwrap();
    let a = node.nodes.iter().find(|n| n.title == "A").unwrap();
    let a_full = store.get_node(&a.id).await.unwrap().unwrap();
    assert_eq!(a_full.outgoing_links.len(), 1);
    let ghost_id = &a_full.outgoing_links[0];
    assert!(crate::id::is_ghost_id(ghost_id));
    let ghost = store.get_node(ghost_id).await.unwrap();
    assert!(ghost.is_some(), "referenced ghost must exist");

    // remove the only reference and re-sync: the ghost must be GC'd.
    std::fs::write(dir.path().join("a.md"), "---\ntitle: A\n---\nno links now.").unwrap();
    store.sync().await.unwrap();
    let ghost_after = store.get_node(ghost_id).await.unwrap();
    assert!(ghost_after.is_none(), "orphaned ghost must be garbage-collected");
}

/// A create whose resolved path escapes the source root fails with no
/// bytes written.
#[tokio::test]
async fn create_node_rejects_path_traversal() {
    let dir = tempdir().unwrap();
    let cache_dir = dir.path().join(".roux");
    let config = DocStoreConfig::new(dir.path(), &cache_dir);
    let store = DocStore::new(config, registry(), None).unwrap();
    store.sync().await.unwrap();

    let node = Node {
        id: String::new(),
        title: "Escapee".to_string(),
        content: String::new(),
        tags: Vec::new(),
        properties: Default::default(),
        outgoing_links: Vec::new(),
        source_ref: None,
    };
    let result = store.create_node(node, "../outside.md").await;
    assert!(result.is_err());
}
