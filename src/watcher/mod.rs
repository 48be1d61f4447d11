//! File Watcher (C7): OS watch events → extension filter → coalescing
//! queue → debounced batch callback.

mod coalesce;
pub mod types;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use notify::{Event, EventKind as NotifyEventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, Mutex};
use tokio::time::{sleep_until, Instant};
use tracing::{error, warn};

pub use types::{EventKind, RawEventKind, WatcherConfig, WatcherState};

pub(crate) use coalesce::coalesce;

/// Invoked with the coalesced batch once the debounce window elapses.
/// Exceptions (panics are caught at the call site, `Err` returns are
/// logged) never stop the watcher.
pub type BatchCallback = Arc<dyn Fn(HashMap<String, EventKind>) -> Result<()> + Send + Sync>;

struct Shared {
    queue: HashMap<String, EventKind>,
    deadline: Option<Instant>,
}

/// Wraps an OS recursive watcher (`notify`) with coalescing and debouncing
/// on top.
pub struct FileWatcher {
    root: PathBuf,
    config: WatcherConfig,
    callback: BatchCallback,
    state: WatcherState,
    paused: Arc<AtomicBool>,
    shared: Arc<Mutex<Shared>>,
    inner: Option<RecommendedWatcher>,
    flush_tx: Option<mpsc::UnboundedSender<()>>,
}

impl FileWatcher {
    pub fn new(root: impl Into<PathBuf>, config: WatcherConfig, callback: BatchCallback) -> Self {
        FileWatcher {
            root: root.into(),
            config,
            callback,
            state: WatcherState::Idle,
            paused: Arc::new(AtomicBool::new(false)),
            shared: Arc::new(Mutex::new(Shared {
                queue: HashMap::new(),
                deadline: None,
            })),
            inner: None,
            flush_tx: None,
        }
    }

    pub fn state(&self) -> WatcherState {
        self.state
    }

    /// Resolves once the background coalescing loop is spawned and the
    /// watcher is actively watching. Fails with `ALREADY_WATCHING` if
    /// called while active.
    pub async fn start(&mut self) -> Result<()> {
        if matches!(self.state, WatcherState::Active | WatcherState::Paused) {
            return Err(anyhow!("ALREADY_WATCHING"));
        }
        self.state = WatcherState::Starting;

        let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let watcher_root = self.root.clone();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = raw_tx.send(res);
        })
        .map_err(|e| anyhow!("failed to start watcher: {e}"))?;
        watcher
            .watch(&watcher_root, RecursiveMode::Recursive)
            .map_err(|e| anyhow!("failed to watch {}: {e}", watcher_root.display()))?;
        self.inner = Some(watcher);

        let (flush_tx, mut flush_rx) = mpsc::unbounded_channel::<()>();
        self.flush_tx = Some(flush_tx);

        let shared = self.shared.clone();
        let paused = self.paused.clone();
        let config = self.config.clone();
        let root = self.root.clone();
        let callback = self.callback.clone();

        tokio::spawn(async move {
            loop {
                let wait_deadline = {
                    let guard = shared.lock().await;
                    guard.deadline
                };

                tokio::select! {
                    maybe_event = raw_rx.recv() => {
                        let Some(res) = maybe_event else { break };
                        match res {
                            Ok(event) => {
                                if paused.load(Ordering::SeqCst) {
                                    continue;
                                }
                                handle_raw_event(&shared, &config, &root, event).await;
                            }
                            Err(e) => {
                                log_watch_error(&e);
                            }
                        }
                    }
                    _ = async {
                        match wait_deadline {
                            Some(deadline) => sleep_until(deadline).await,
                            None => std::future::pending::<()>().await,
                        }
                    } => {
                        flush_now(&shared, &callback).await;
                    }
                    _ = flush_rx.recv() => {
                        flush_now(&shared, &callback).await;
                    }
                }
            }
        });

        self.state = WatcherState::Active;
        Ok(())
    }

    /// Idempotent. Clears pending state (timer, queue, pause flag).
    pub async fn stop(&mut self) -> Result<()> {
        self.state = WatcherState::Stopping;
        if let Some(mut watcher) = self.inner.take() {
            let _ = watcher.unwatch(&self.root);
        }
        self.flush_tx = None;
        self.paused.store(false, Ordering::SeqCst);
        let mut guard = self.shared.lock().await;
        guard.queue.clear();
        guard.deadline = None;
        drop(guard);
        self.state = WatcherState::Idle;
        Ok(())
    }

    /// Emits the current queue immediately and clears the timer. Safe
    /// before start and when the queue is empty.
    pub fn flush(&self) {
        if let Some(tx) = &self.flush_tx {
            let _ = tx.send(());
        }
    }

    pub fn pause(&mut self) {
        self.paused.store(true, Ordering::SeqCst);
        if self.state == WatcherState::Active {
            self.state = WatcherState::Paused;
        }
    }

    pub fn resume(&mut self) {
        self.paused.store(false, Ordering::SeqCst);
        if self.state == WatcherState::Paused {
            self.state = WatcherState::Active;
        }
    }
}

async fn handle_raw_event(shared: &Arc<Mutex<Shared>>, config: &WatcherConfig, root: &Path, event: Event) {
    let Some(kind) = classify(&event.kind) else {
        return;
    };

    for path in &event.paths {
        let Some(relative) = relativize(root, path) else {
            continue;
        };
        if is_excluded(&relative, config) {
            continue;
        }
        let Some(ext) = extension_of(&relative) else {
            continue; // dotfiles and extensionless files are always dropped
        };
        if !config.extensions.contains(&ext.to_lowercase()) {
            continue;
        }

        let mut guard = shared.lock().await;
        let existing = guard.queue.get(&relative).copied();
        match coalesce(existing, kind) {
            Some(merged) => {
                guard.queue.insert(relative, merged);
                guard.deadline = Some(Instant::now() + config.debounce);
            }
            None => {
                guard.queue.remove(&relative);
                if guard.queue.is_empty() {
                    guard.deadline = None;
                }
            }
        }
    }
}

async fn flush_now(shared: &Arc<Mutex<Shared>>, callback: &BatchCallback) {
    let batch = {
        let mut guard = shared.lock().await;
        guard.deadline = None;
        if guard.queue.is_empty() {
            return;
        }
        std::mem::take(&mut guard.queue)
    };

    if let Err(e) = callback(batch) {
        error!(error = %e, "onBatch callback failed; watcher remains operational");
    }
}

fn classify(kind: &NotifyEventKind) -> Option<RawEventKind> {
    match kind {
        NotifyEventKind::Create(_) => Some(RawEventKind::Add),
        NotifyEventKind::Modify(_) => Some(RawEventKind::Change),
        NotifyEventKind::Remove(_) => Some(RawEventKind::Unlink),
        _ => None,
    }
}

/// Relative path with forward slashes, regardless of host OS.
fn relativize(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    Some(relative.to_string_lossy().replace('\\', "/"))
}

fn is_excluded(relative_path: &str, config: &WatcherConfig) -> bool {
    relative_path
        .split('/')
        .any(|segment| config.excluded_dirs.contains(segment))
}

fn extension_of(relative_path: &str) -> Option<&str> {
    let file_name = relative_path.rsplit('/').next().unwrap_or(relative_path);
    if file_name.starts_with('.') {
        // dotfiles have no meaningful extension for our purposes
        let rest = &file_name[1..];
        if !rest.contains('.') {
            return None;
        }
    }
    let (_, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}

fn log_watch_error(error: &notify::Error) {
    let message = error.to_string();
    if message.contains("EMFILE") || message.contains("Too many open files") {
        warn!(
            error = %message,
            "watcher hit the file-descriptor limit (EMFILE); raise the process's open-file limit"
        );
    } else {
        error!(error = %message, "watcher error after ready; watching continues");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    /// Drives the real (non-synthetic) debounce path: `handle_raw_event`
    /// arms `Shared::deadline` exactly one debounce window out, and that
    /// deadline only elapses once the clock is actually advanced past it.
    #[tokio::test(start_paused = true)]
    async fn handle_raw_event_arms_deadline_one_debounce_window_out() {
        let config = WatcherConfig {
            debounce: Duration::from_millis(500),
            ..WatcherConfig::default()
        };
        let root = PathBuf::from("/vault");
        let shared = Arc::new(Mutex::new(Shared {
            queue: HashMap::new(),
            deadline: None,
        }));

        let event = Event::new(NotifyEventKind::Create(notify::event::CreateKind::Any))
            .add_path(root.join("note.md"));

        let before = Instant::now();
        handle_raw_event(&shared, &config, &root, event).await;

        let deadline = shared.lock().await.deadline.expect("debounce deadline must be armed");
        assert_eq!(deadline, before + config.debounce);
        assert!(Instant::now() < deadline, "window must not have elapsed yet");

        tokio::time::advance(config.debounce).await;
        assert!(Instant::now() >= deadline, "window must elapse once advanced past it");
    }

    /// A second event inside the same window pushes the deadline out again
    /// rather than flushing on the first event's original schedule.
    #[tokio::test(start_paused = true)]
    async fn second_event_within_window_extends_the_deadline() {
        let config = WatcherConfig {
            debounce: Duration::from_millis(500),
            ..WatcherConfig::default()
        };
        let root = PathBuf::from("/vault");
        let shared = Arc::new(Mutex::new(Shared {
            queue: HashMap::new(),
            deadline: None,
        }));

        let event = || Event::new(NotifyEventKind::Create(notify::event::CreateKind::Any)).add_path(root.join("note.md"));
        handle_raw_event(&shared, &config, &root, event()).await;
        let first_deadline = shared.lock().await.deadline.unwrap();

        tokio::time::advance(Duration::from_millis(200)).await;
        handle_raw_event(&shared, &config, &root, event()).await;
        let second_deadline = shared.lock().await.deadline.unwrap();

        assert!(second_deadline > first_deadline, "later event must push the deadline out");
    }

    #[test]
    fn extension_of_drops_dotfiles_and_extensionless() {
        assert_eq!(extension_of("notes/.hidden"), None);
        assert_eq!(extension_of("notes/readme"), None);
        assert_eq!(extension_of("notes/page.md"), Some("md"));
        assert_eq!(extension_of(".gitignore"), None);
    }

    #[test]
    fn is_excluded_matches_any_path_segment() {
        let config = WatcherConfig::default();
        assert!(is_excluded("notes/.git/hooks/pre-commit.md", &config));
        assert!(is_excluded(".obsidian/workspace.md", &config));
        assert!(!is_excluded("notes/page.md", &config));
    }
}
