//! DocStore orchestrator (C8): full sync, incremental batch application,
//! id writeback, rename detection, pending-unlink TTL, and the
//! create/update/delete write surface.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{error, warn};
use walkdir::WalkDir;

use crate::database::{CacheStore, SourceType};
use crate::format::{FormatRegistry, ParseContext};
use crate::graph::Graph;
use crate::id::{generate_id, is_valid_id};
use crate::model::{Node, SourceRef};
use crate::resolver::{ghost_id_for_target, resolve_links, TitleIndex};
use crate::vector::VectorProvider;
use crate::watcher::{EventKind, FileWatcher, WatcherConfig};

const DEFAULT_PENDING_UNLINK_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct DocStoreConfig {
    pub root: PathBuf,
    pub cache_dir: PathBuf,
    pub watcher_config: WatcherConfig,
    pub pending_unlink_ttl: Duration,
}

impl DocStoreConfig {
    pub fn new(root: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        DocStoreConfig {
            root: root.into(),
            cache_dir: cache_dir.into(),
            watcher_config: WatcherConfig::default(),
            pending_unlink_ttl: DEFAULT_PENDING_UNLINK_TTL,
        }
    }
}

struct PendingUnlink {
    last_known_path: String,
    deadline: Instant,
}

/// The mutable state the orchestrator serializes access to: one logical
/// executor over cache, pending-unlink table, and in-memory graph.
struct State {
    cache: CacheStore,
    graph: Graph,
    pending_unlinks: HashMap<String, PendingUnlink>,
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub upserted: usize,
    pub removed: usize,
    pub duplicate_ids: Vec<String>,
}

pub struct DocStore {
    root: PathBuf,
    registry: FormatRegistry,
    vector: Option<Arc<dyn VectorProvider>>,
    owns_vector: bool,
    ttl: Duration,
    watcher_config: WatcherConfig,
    state: Mutex<State>,
    watcher: Mutex<Option<FileWatcher>>,
}

impl DocStore {
    pub fn new(
        config: DocStoreConfig,
        registry: FormatRegistry,
        vector: Option<Arc<dyn VectorProvider>>,
    ) -> Result<Self> {
        std::fs::create_dir_all(&config.cache_dir)
            .with_context(|| format!("creating cache dir {}", config.cache_dir.display()))?;
        let cache_path = config.cache_dir.join("cache.sqlite3");
        let cache = CacheStore::open(&cache_path)?;

        let owns_vector = vector.is_none();
        Ok(DocStore {
            root: config.root,
            registry,
            vector,
            owns_vector,
            ttl: config.pending_unlink_ttl,
            watcher_config: config.watcher_config,
            state: Mutex::new(State {
                cache,
                graph: Graph::empty(),
                pending_unlinks: HashMap::new(),
            }),
            watcher: Mutex::new(None),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Starts the background filesystem watcher, routing coalesced batches
    /// into [`DocStore::handle_watcher_batch`]. Holds only a weak reference
    /// to `self` so the watcher's callback can't keep the store alive past
    /// its last strong `Arc`. No-op if a watcher is already running.
    pub async fn start_watching(self: &Arc<Self>) -> Result<()> {
        let mut guard = self.watcher.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        let weak = Arc::downgrade(self);
        let callback: crate::watcher::BatchCallback = Arc::new(move |batch| {
            let Some(store) = weak.upgrade() else {
                return Ok(());
            };
            tokio::spawn(async move {
                if let Err(e) = store.handle_watcher_batch(batch).await {
                    error!(error = %e, "applying watcher batch failed");
                }
            });
            Ok(())
        });

        let mut watcher = FileWatcher::new(self.root.clone(), self.watcher_config.clone(), callback);
        watcher.start().await?;
        *guard = Some(watcher);
        Ok(())
    }

    /// Flushes the watcher (if running), checkpoints the cache, and disposes
    /// the vector provider only if it was defaulted rather than injected.
    pub async fn close(&self) -> Result<()> {
        if let Some(mut watcher) = self.watcher.lock().await.take() {
            watcher.stop().await?;
        }
        let guard = self.state.lock().await;
        guard.cache.checkpoint_wal()?;
        if self.owns_vector {
            // nothing owned internally today; hook kept for a future
            // default embedding backend.
        }
        Ok(())
    }

    // ---- 4.8.1 full sync -------------------------------------------------

    pub async fn sync(&self) -> Result<SyncReport> {
        let mut guard = self.state.lock().await;
        let mut report = SyncReport::default();

        let tracked_mtimes: HashMap<String, i64> = guard
            .cache
            .get_all_nodes()?
            .into_iter()
            .filter_map(|n| n.source_ref.map(|r| (r.path, r.last_modified)))
            .collect();

        let mut seen_paths: HashSet<String> = HashSet::new();
        let mut duplicate_ids = Vec::new();

        for entry in WalkDir::new(&self.root).into_iter() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    if e.io_error().map(|io| io.kind()) == Some(std::io::ErrorKind::NotFound) {
                        continue; // ENOENT race, silently skipped
                    }
                    warn!(error = %e, "sync: enumeration error");
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                if is_excluded_dir(entry.path()) {
                    continue;
                }
                continue;
            }
            if entry.path_is_symlink() {
                continue;
            }

            let relative = match relative_slash_path(&self.root, entry.path()) {
                Some(p) => p,
                None => continue,
            };
            if path_has_excluded_segment(&relative) {
                continue;
            }
            let Some(ext) = entry.path().extension().and_then(|e| e.to_str()) else {
                continue;
            };
            if self.registry.reader_for(ext).is_none() {
                continue;
            }

            seen_paths.insert(relative.clone());

            let mtime = match tokio::fs::metadata(entry.path()).await.and_then(|m| m.modified()) {
                Ok(t) => mtime_secs(t),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!(error = %e, path = %relative, "sync: stat failed");
                    continue;
                }
            };

            if tracked_mtimes.get(&relative) == Some(&mtime) {
                continue; // unchanged, skip reparse
            }

            let bytes = match tokio::fs::read(entry.path()).await {
                Ok(b) => b,
                Err(e) => {
                    warn!(error = %e, path = %relative, "sync: read failed");
                    continue;
                }
            };

            let absolute_path_string = entry.path().to_string_lossy().into_owned();
            let context = ParseContext {
                absolute_path: &absolute_path_string,
                relative_path: &relative,
                extension: ext,
                mtime,
            };
            let Some(outcome) = self.registry.parse(&bytes, &context) else {
                continue;
            };

            let final_id = if outcome.needs_id_write {
                let fresh = generate_id();
                if let Err(e) = write_id_into_frontmatter(entry.path(), &fresh).await {
                    warn!(error = %e, path = %relative, "sync: id writeback failed");
                }
                fresh
            } else {
                outcome.draft.id.clone().expect("valid id checked above")
            };

            if let Some(existing) = guard.cache.get_node(&final_id)? {
                if let Some(existing_path) = existing.source_ref.as_ref().map(|r| &r.path) {
                    if existing_path != &relative {
                        duplicate_ids.push(final_id.clone());
                        continue;
                    }
                }
            }

            let node = Node {
                id: final_id.clone(),
                title: outcome.draft.title,
                content: outcome.draft.content,
                tags: outcome.draft.tags,
                properties: outcome.draft.properties,
                outgoing_links: outcome.draft.raw_links,
                source_ref: Some(SourceRef {
                    path: relative.clone(),
                    last_modified: mtime,
                }),
            };
            guard
                .cache
                .upsert_node(&node, Some(SourceType::File), Some(&relative), Some(mtime))?;
            report.upserted += 1;
        }

        for path in guard.cache.get_all_tracked_paths()? {
            if !seen_paths.contains(&path) {
                if let Some(node) = guard.cache.get_node_by_path(&path)? {
                    guard.cache.delete_node(&node.id)?;
                    report.removed += 1;
                }
            }
        }

        resolve_and_rebuild(&mut guard)?;
        report.duplicate_ids = duplicate_ids;
        Ok(report)
    }

    // ---- 4.8.2 incremental batch ------------------------------------------

    pub async fn handle_watcher_batch(&self, events: HashMap<String, EventKind>) -> Result<Vec<String>> {
        let mut guard = self.state.lock().await;
        let mut touched = Vec::new();

        for (relative, kind) in events {
            if self
                .registry
                .reader_for(extension_of(&relative).unwrap_or(""))
                .is_none()
            {
                continue;
            }

            match kind {
                EventKind::Add | EventKind::Change => {
                    let absolute = self.root.join(&relative);
                    let bytes = match tokio::fs::read(&absolute).await {
                        Ok(b) => b,
                        Err(e) => {
                            warn!(error = %e, path = %relative, "batch: read failed");
                            continue;
                        }
                    };
                    let mtime = tokio::fs::metadata(&absolute)
                        .await
                        .and_then(|m| m.modified())
                        .map(mtime_secs)
                        .unwrap_or(0);
                    let ext = extension_of(&relative).unwrap_or("");
                    let absolute_path_string = absolute.to_string_lossy().into_owned();
                    let context = ParseContext {
                        absolute_path: &absolute_path_string,
                        relative_path: &relative,
                        extension: ext,
                        mtime,
                    };
                    let Some(outcome) = self.registry.parse(&bytes, &context) else {
                        continue;
                    };

                    let final_id = if outcome.needs_id_write {
                        let fresh = generate_id();
                        if let Err(e) = write_id_into_frontmatter(&absolute, &fresh).await {
                            warn!(error = %e, path = %relative, "batch: id writeback failed");
                        }
                        fresh
                    } else {
                        outcome.draft.id.clone().expect("valid id checked above")
                    };

                    let rename_match = guard
                        .pending_unlinks
                        .get(&final_id)
                        .map(|p| p.deadline > Instant::now())
                        .unwrap_or(false);

                    if rename_match {
                        guard.pending_unlinks.remove(&final_id);
                        // reuse node, update sourceRef.path, never call vector.delete.
                    } else if let Some(displaced) = guard.cache.get_node_by_path(&relative)? {
                        if displaced.id != final_id {
                            guard.cache.delete_node(&displaced.id)?;
                            if let Some(vector) = &self.vector {
                                let vector = vector.clone();
                                let displaced_id = displaced.id.clone();
                                tokio::spawn(async move {
                                    if let Err(e) = vector.delete(&displaced_id).await {
                                        error!(error = %e, id = %displaced_id, "best-effort vector delete failed");
                                    }
                                });
                            }
                        }
                    }

                    let node = Node {
                        id: final_id.clone(),
                        title: outcome.draft.title,
                        content: outcome.draft.content,
                        tags: outcome.draft.tags,
                        properties: outcome.draft.properties,
                        outgoing_links: outcome.draft.raw_links,
                        source_ref: Some(SourceRef {
                            path: relative.clone(),
                            last_modified: mtime,
                        }),
                    };
                    guard
                        .cache
                        .upsert_node(&node, Some(SourceType::File), Some(&relative), Some(mtime))?;
                    touched.push(final_id);
                }
                EventKind::Unlink => {
                    if let Some(node) = guard.cache.get_node_by_path(&relative)? {
                        guard.cache.delete_node(&node.id)?;
                        guard.pending_unlinks.insert(
                            node.id.clone(),
                            PendingUnlink {
                                last_known_path: relative.clone(),
                                deadline: Instant::now() + self.ttl,
                            },
                        );
                        touched.push(node.id);
                    }
                }
            }
        }

        self.sweep_pending_unlinks(&mut guard).await;
        resolve_and_rebuild(&mut guard)?;
        Ok(touched)
    }

    // ---- read-only query surface, consumed by the dispatcher (C9) --------
    //
    // Each of these takes a short-lived lock, clones what it needs, and
    // releases it before returning — queries never suspend while holding
    // the graph's write guard.

    pub async fn get_node(&self, id: &str) -> Result<Option<Node>> {
        self.state.lock().await.cache.get_node(id)
    }

    pub async fn resolve_titles(&self, ids: &[String]) -> Result<HashMap<String, String>> {
        self.state.lock().await.cache.resolve_titles(ids)
    }

    pub async fn list_nodes(
        &self,
        filter: &crate::database::ListFilter,
        options: &crate::database::ListOptions,
    ) -> Result<crate::database::ListResult> {
        self.state.lock().await.cache.list_nodes(filter, options)
    }

    pub async fn resolve_nodes(
        &self,
        names: &[String],
        options: &crate::database::ResolveOptions,
    ) -> Result<Vec<crate::database::ResolveMatch>> {
        self.state.lock().await.cache.resolve_nodes(names, options)
    }

    pub async fn graph_neighbors(&self, id: &str, direction: crate::graph::Direction, limit: usize) -> Vec<String> {
        self.state.lock().await.graph.get_neighbor_ids(id, direction, limit)
    }

    pub async fn graph_degree(&self, id: &str, direction: crate::graph::Direction) -> usize {
        let guard = self.state.lock().await;
        match direction {
            crate::graph::Direction::In => guard.graph.in_degree(id),
            crate::graph::Direction::Out => guard.graph.out_degree(id),
            crate::graph::Direction::Both => guard.graph.in_degree(id) + guard.graph.out_degree(id),
        }
    }

    pub async fn graph_find_path(&self, source: &str, target: &str) -> Option<Vec<String>> {
        self.state.lock().await.graph.find_path(source, target)
    }

    pub async fn graph_hubs(&self, metric: crate::graph::HubMetric, limit: usize) -> Vec<(String, f64)> {
        // Pagerank is persisted to the centrality table but 0-stubbed in
        // this phase; hub ranking by pagerank currently ties everything
        // at 0 and falls back to id order.
        self.state
            .lock()
            .await
            .graph
            .get_hubs(metric, limit, &HashMap::new())
    }

    pub async fn vector_search(&self, query_vector: &[f32], k: usize) -> Result<Vec<crate::vector::VectorMatch>> {
        match &self.vector {
            Some(provider) => provider.search(query_vector, k).await,
            None => bail!("no vector provider configured"),
        }
    }

    async fn sweep_pending_unlinks(&self, guard: &mut State) {
        let now = Instant::now();
        let expired: Vec<String> = guard
            .pending_unlinks
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();

        for id in expired {
            guard.pending_unlinks.remove(&id);
            if let Some(vector) = &self.vector {
                let vector = vector.clone();
                let id = id.clone();
                tokio::spawn(async move {
                    if let Err(e) = vector.delete(&id).await {
                        error!(error = %e, id = %id, "best-effort vector delete failed");
                    }
                });
            }
        }
    }

    // ---- 4.8.3 writes from the API ----------------------------------------

    pub async fn create_node(&self, mut node: Node, relative_path: &str) -> Result<Node> {
        let absolute = self.root.join(relative_path);
        if !path_within_root(&self.root, &absolute) {
            bail!("path traversal: {relative_path} escapes the source root");
        }

        node.tags = crate::model::normalize_tags(node.tags);
        let mut guard = self.state.lock().await;
        if node.id.is_empty() || !is_valid_id(&node.id) {
            node.id = generate_id();
        } else if guard.cache.get_node(&node.id)?.is_some() {
            bail!("NODE_EXISTS: {}", node.id);
        }

        node.source_ref = Some(SourceRef {
            path: relative_path.to_string(),
            last_modified: now_unix(),
        });
        guard
            .cache
            .upsert_node(&node, Some(SourceType::File), Some(relative_path), Some(now_unix()))?;
        resolve_and_rebuild(&mut guard)?;
        let stored = guard
            .cache
            .get_node(&node.id)?
            .ok_or_else(|| anyhow!("node vanished immediately after upsert"))?;
        Ok(stored)
    }

    pub async fn update_node(&self, id: &str, patch: NodePatch) -> Result<Node> {
        let mut guard = self.state.lock().await;
        let mut node = guard
            .cache
            .get_node(id)?
            .ok_or_else(|| anyhow!("NODE_NOT_FOUND: {id}"))?;

        if let Some(title) = patch.title {
            node.title = title;
        }
        if let Some(content) = patch.content {
            node.content = content;
        }
        if let Some(tags) = patch.tags {
            node.tags = crate::model::normalize_tags(tags);
        }
        if let Some(properties) = patch.properties {
            node.properties = properties;
        }

        let path = node.source_ref.as_ref().map(|r| r.path.clone());
        guard
            .cache
            .upsert_node(&node, Some(SourceType::File), path.as_deref(), node.source_ref.as_ref().map(|r| r.last_modified))?;
        resolve_and_rebuild(&mut guard)?;
        guard
            .cache
            .get_node(id)?
            .ok_or_else(|| anyhow!("node vanished immediately after update"))
    }

    pub async fn delete_node(&self, id: &str) -> Result<()> {
        let mut guard = self.state.lock().await;
        let node = guard
            .cache
            .get_node(id)?
            .ok_or_else(|| anyhow!("NODE_NOT_FOUND: {id}"))?;

        if let Some(source_ref) = &node.source_ref {
            let absolute = self.root.join(&source_ref.path);
            if let Err(e) = tokio::fs::remove_file(&absolute).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(error = %e, path = %source_ref.path, "delete: removing file failed");
                }
            }
        }

        guard.cache.delete_node(id)?;
        if let Some(vector) = &self.vector {
            let vector = vector.clone();
            let id = id.to_string();
            tokio::spawn(async move {
                if let Err(e) = vector.delete(&id).await {
                    error!(error = %e, id = %id, "vector.delete failed on node delete");
                }
            });
        }
        resolve_and_rebuild(&mut guard)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct NodePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub properties: Option<HashMap<String, crate::model::PropertyValue>>,
}

/// Re-resolve links for the whole node set, mint/GC ghosts, and rebuild the
/// graph + centrality. Called at the end of every sync and batch.
fn resolve_and_rebuild(guard: &mut State) -> Result<()> {
    let nodes = guard.cache.get_all_nodes()?;
    let real_ids: HashSet<String> = nodes
        .iter()
        .filter(|n| !crate::id::is_ghost_id(&n.id))
        .map(|n| n.id.clone())
        .collect();

    let index = TitleIndex::build(&nodes);
    let mut referenced_ghosts: HashSet<String> = HashSet::new();
    let mut ghost_titles: HashMap<String, String> = HashMap::new();

    for mut node in nodes {
        if crate::id::is_ghost_id(&node.id) {
            continue; // ghosts carry no outgoing links of their own
        }
        let resolved = resolve_links(&node.outgoing_links, &index, &real_ids);
        let finalized: Vec<String> = resolved
            .into_iter()
            .map(|target| {
                if real_ids.contains(&target) || crate::id::is_ghost_id(&target) {
                    referenced_ghosts.insert(target.clone());
                    target
                } else {
                    let ghost = ghost_id_for_target(&target);
                    referenced_ghosts.insert(ghost.clone());
                    ghost_titles.entry(ghost.clone()).or_insert(target);
                    ghost
                }
            })
            .collect();
        node.outgoing_links = finalized;
        let path = node.source_ref.as_ref().map(|r| r.path.clone());
        let mtime = node.source_ref.as_ref().map(|r| r.last_modified);
        guard
            .cache
            .upsert_node(&node, Some(SourceType::File), path.as_deref(), mtime)?;
    }

    // mint newly-referenced ghosts that don't exist yet
    for ghost_id in &referenced_ghosts {
        if !crate::id::is_ghost_id(ghost_id) {
            continue;
        }
        if guard.cache.get_node(ghost_id)?.is_none() {
            let title = ghost_titles
                .get(ghost_id)
                .cloned()
                .unwrap_or_else(|| ghost_id.clone());
            let ghost = Node::new_ghost(ghost_id.clone(), title);
            guard.cache.upsert_node(&ghost, None, None, None)?;
        }
    }

    // GC orphaned ghosts: any existing ghost no longer referenced.
    for node in guard.cache.get_all_nodes()? {
        if crate::id::is_ghost_id(&node.id) && !referenced_ghosts.contains(&node.id) {
            guard.cache.delete_node(&node.id)?;
        }
    }

    let final_nodes = guard.cache.get_all_nodes()?;
    guard.graph = Graph::build(&final_nodes);
    let computed_at = now_unix();
    for (id, record) in guard.graph.centrality_snapshot(computed_at) {
        guard.cache.store_centrality(&id, &record)?;
    }

    Ok(())
}

/// Rewrite `path`'s YAML frontmatter so `id:` is the first field,
/// preserving all other content byte-for-byte where possible. Any
/// pre-existing `id:` line is dropped first — `needsIdWrite` also fires for
/// a present-but-invalid id, and leaving the stale line behind would leave
/// two `id:` keys in the frontmatter map (YAML's last-key-wins rule could
/// then read the old invalid id back on the next sync and rewrite forever).
async fn write_id_into_frontmatter(path: &Path, id: &str) -> Result<()> {
    let text = tokio::fs::read_to_string(path).await?;
    let rewritten = if let Some(rest) = text.strip_prefix("---\n") {
        if let Some(end) = rest.find("\n---") {
            let body_start = end + 4;
            let after = rest[body_start..].strip_prefix('\n').unwrap_or(&rest[body_start..]);
            let other_fields = strip_id_lines(&rest[..end]);
            format!("---\nid: {id}\n{other_fields}\n---\n{after}")
        } else {
            format!("---\nid: {id}\n---\n{text}")
        }
    } else {
        format!("---\nid: {id}\n---\n{text}")
    };
    tokio::fs::write(path, rewritten).await?;
    Ok(())
}

/// Drop any line starting with `id:` from an existing frontmatter body.
fn strip_id_lines(frontmatter_body: &str) -> String {
    frontmatter_body
        .lines()
        .filter(|line| !line.trim_start().starts_with("id:"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    Some(relative.to_string_lossy().replace('\\', "/"))
}

fn is_excluded_dir(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|name| crate::watcher::types::EXCLUDED_DIRS.contains(&name))
        .unwrap_or(false)
}

fn path_has_excluded_segment(relative: &str) -> bool {
    relative
        .split('/')
        .any(|segment| crate::watcher::types::EXCLUDED_DIRS.contains(&segment))
}

fn extension_of(relative_path: &str) -> Option<&str> {
    let file_name = relative_path.rsplit('/').next().unwrap_or(relative_path);
    file_name.rsplit_once('.').map(|(_, ext)| ext)
}

fn path_within_root(root: &Path, candidate: &Path) -> bool {
    let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    match candidate.parent().and_then(|p| p.canonicalize().ok()) {
        Some(parent) => parent.starts_with(&root),
        None => false,
    }
}

fn mtime_secs(t: std::time::SystemTime) -> i64 {
    t.duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn now_unix() -> i64 {
    mtime_secs(std::time::SystemTime::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormatRegistry;
    use tempfile::tempdir;

    fn registry() -> FormatRegistry {
        FormatRegistry::with_defaults()
    }

    #[tokio::test]
    async fn sync_indexes_frontmatter_title_tags_and_links() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("test-note.md"),
            "---\ntitle: Test Note\ntags: [test, example]\n---\nBody with [[Other Note]].\n",
        )
        .unwrap();

        let cache_dir = dir.path().join(".roux");
        let config = DocStoreConfig::new(dir.path(), &cache_dir);
        let store = DocStore::new(config, registry(), None).unwrap();
        store.sync().await.unwrap();

        let guard = store.state.lock().await;
        let nodes = guard.cache.get_all_nodes().unwrap();
        let note = nodes.iter().find(|n| n.title == "Test Note").unwrap();
        assert_eq!(note.tags, vec!["test", "example"]);
        assert!(note.content.contains("Body with"));
        assert!(!note.outgoing_links.is_empty());
    }

    #[tokio::test]
    async fn sync_derives_title_from_filename_when_frontmatter_has_none() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("my-derived-title.md"), "no frontmatter here").unwrap();

        let cache_dir = dir.path().join(".roux");
        let config = DocStoreConfig::new(dir.path(), &cache_dir);
        let store = DocStore::new(config, registry(), None).unwrap();
        store.sync().await.unwrap();

        let guard = store.state.lock().await;
        let nodes = guard.cache.get_all_nodes().unwrap();
        assert!(nodes.iter().any(|n| n.title == "My Derived Title"));
    }

    #[tokio::test]
    async fn repeated_sync_with_no_changes_upserts_nothing() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "---\ntitle: A\n---\nbody").unwrap();

        let cache_dir = dir.path().join(".roux");
        let config = DocStoreConfig::new(dir.path(), &cache_dir);
        let store = DocStore::new(config, registry(), None).unwrap();
        let first = store.sync().await.unwrap();
        let second = store.sync().await.unwrap();
        assert_eq!(first.upserted, 1);
        assert_eq!(second.upserted, 0);
    }

    #[tokio::test]
    async fn link_normalization_keeps_dotted_targets_intact() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.md"),
            "---\ntitle: A\n---\nLinks: [[archive.2024]] and [[meeting.notes.draft]]",
        )
        .unwrap();

        let cache_dir = dir.path().join(".roux");
        let config = DocStoreConfig::new(dir.path(), &cache_dir);
        let store = DocStore::new(config, registry(), None).unwrap();
        store.sync().await.unwrap();

        let guard = store.state.lock().await;
        let node = guard
            .cache
            .get_all_nodes()
            .unwrap()
            .into_iter()
            .find(|n| n.title == "A")
            .unwrap();
        let ghosts: Vec<String> = node
            .outgoing_links
            .iter()
            .map(|id| {
                guard
                    .cache
                    .get_node(id)
                    .unwrap()
                    .map(|n| n.title)
                    .unwrap_or_default()
            })
            .collect();
        assert!(ghosts.contains(&"archive.2024".to_string()) || ghosts.contains(&"archive.2024.md".to_string()));
        assert!(!ghosts.is_empty());
    }
}
