//! Centrality table reads/writes (C4 side of C6's hub/degree pipeline).

use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension};

use super::types::CentralityRecord;
use super::CacheStore;

impl CacheStore {
    pub fn store_centrality(&self, node_id: &str, record: &CentralityRecord) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO centrality (node_id, in_degree, out_degree, pagerank, computed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(node_id) DO UPDATE SET
                    in_degree = excluded.in_degree,
                    out_degree = excluded.out_degree,
                    pagerank = excluded.pagerank,
                    computed_at = excluded.computed_at",
                params![
                    node_id,
                    record.in_degree,
                    record.out_degree,
                    record.pagerank,
                    record.computed_at,
                ],
            )
            .context("storing centrality")?;
        Ok(())
    }

    pub fn get_centrality(&self, node_id: &str) -> Result<Option<CentralityRecord>> {
        self.conn
            .query_row(
                "SELECT in_degree, out_degree, pagerank, computed_at FROM centrality WHERE node_id = ?1",
                params![node_id],
                |row| {
                    Ok(CentralityRecord {
                        in_degree: row.get(0)?,
                        out_degree: row.get(1)?,
                        pagerank: row.get(2)?,
                        computed_at: row.get(3)?,
                    })
                },
            )
            .optional()
            .context("reading centrality")
    }
}
