//! Cache Store (C4): the single embedded SQLite database holding node
//! metadata, source-path tracking, and precomputed centrality.

mod centrality;
mod nodes;
mod resolve;
mod schema;
mod types;

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::debug;

pub use types::{CentralityRecord, ListFilter, ListOptions, ListResult, NodeSummary, ResolveMatch, ResolveOptions, ResolveStrategy, SourceType};

/// Owns the SQLite connection backing every node/centrality query. Not
/// `Sync` by itself — callers serialize access through a single logical
/// executor holding one mutex over cache and graph state.
pub struct CacheStore {
    conn: Connection,
}

impl CacheStore {
    /// Open (or create) the cache database at `path`. Enables WAL journaling
    /// and foreign-key enforcement before schema creation so both are in
    /// effect for every subsequent statement, including migrations.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("opening cache database at {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;

        let mut store = CacheStore { conn };
        store.initialize_schema()?;
        debug!(path = %path.display(), "cache store opened");
        Ok(store)
    }

    /// In-memory cache store, used by tests that don't need a file on disk.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        let mut store = CacheStore { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Force a WAL checkpoint, folding the write-ahead log back into the
    /// main database file. Called on graceful shutdown.
    pub fn checkpoint_wal(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA wal_checkpoint(TRUNCATE)")
            .context("checkpointing WAL")?;
        Ok(())
    }

    /// Drop every row from every table, leaving the schema intact.
    pub fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM centrality", [])?;
        self.conn.execute("DELETE FROM node_tags", [])?;
        self.conn.execute("DELETE FROM nodes", [])?;
        Ok(())
    }

    pub fn close(self) -> Result<()> {
        self.checkpoint_wal()?;
        Ok(())
    }
}
