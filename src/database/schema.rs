//! Table and index creation.

use anyhow::Result;
use tracing::debug;

use super::CacheStore;

impl CacheStore {
    pub(super) fn initialize_schema(&mut self) -> Result<()> {
        debug!("creating cache schema");

        self.create_nodes_table()?;
        self.create_node_tags_table()?;
        self.create_centrality_table()?;

        debug!("cache schema ready");
        Ok(())
    }

    fn create_nodes_table(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS nodes (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                tags_json TEXT NOT NULL,
                links_json TEXT NOT NULL,
                properties_json TEXT NOT NULL,
                source_type TEXT,
                source_path TEXT,
                source_mtime INTEGER
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_nodes_source_path ON nodes(source_path)",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_nodes_title ON nodes(title)",
            [],
        )?;

        debug!("created nodes table and indexes");
        Ok(())
    }

    /// Normalized `(node_id, tag)` rows kept alongside `nodes.tags_json` so
    /// tag lookups can use an index instead of scanning and deserializing
    /// every row's JSON blob.
    fn create_node_tags_table(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS node_tags (
                node_id TEXT NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
                tag TEXT NOT NULL,
                PRIMARY KEY (node_id, tag)
            )",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_node_tags_tag ON node_tags(tag)",
            [],
        )?;

        debug!("created node_tags table and index");
        Ok(())
    }

    fn create_centrality_table(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS centrality (
                node_id TEXT PRIMARY KEY REFERENCES nodes(id) ON DELETE CASCADE,
                in_degree INTEGER NOT NULL DEFAULT 0,
                out_degree INTEGER NOT NULL DEFAULT 0,
                pagerank REAL NOT NULL DEFAULT 0,
                computed_at INTEGER NOT NULL
            )",
            [],
        )?;

        debug!("created centrality table");
        Ok(())
    }
}
