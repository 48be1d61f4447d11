//! Watcher configuration, lifecycle states, and the coalesced event type.

use std::collections::HashSet;
use std::time::Duration;

/// Directory names unconditionally skipped by scan and watcher.
pub const EXCLUDED_DIRS: [&str; 4] = [".roux", "node_modules", ".git", ".obsidian"];

#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub extensions: HashSet<String>,
    pub debounce: Duration,
    pub excluded_dirs: HashSet<String>,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        WatcherConfig {
            extensions: ["md", "markdown"].iter().map(|s| s.to_string()).collect(),
            debounce: Duration::from_millis(1000),
            excluded_dirs: EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Idle,
    Starting,
    Active,
    Paused,
    Stopping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawEventKind {
    Add,
    Change,
    Unlink,
}

/// A coalesced event kind, the value side of the `onBatch` map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Add,
    Change,
    Unlink,
}
