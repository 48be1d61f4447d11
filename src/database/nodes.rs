//! Node CRUD, path/tracking lookups, and tag/list queries.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension};

use crate::model::Node;

use super::types::{ListFilter, ListOptions, ListResult, NodeSummary, SourceType};
use super::CacheStore;

const NODE_COLUMNS: &str =
    "id, title, content, tags_json, links_json, properties_json, source_type, source_path, source_mtime";

impl CacheStore {
    /// Insert or fully replace the node at `node.id`.
    pub fn upsert_node(
        &self,
        node: &Node,
        source_type: Option<SourceType>,
        path: Option<&str>,
        mtime: Option<i64>,
    ) -> Result<()> {
        let tags_json = serde_json::to_string(&node.tags)?;
        let links_json = serde_json::to_string(&node.outgoing_links)?;
        let properties_json = serde_json::to_string(&node.properties)?;

        self.conn.execute(
            "INSERT INTO nodes (id, title, content, tags_json, links_json, properties_json, source_type, source_path, source_mtime)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                content = excluded.content,
                tags_json = excluded.tags_json,
                links_json = excluded.links_json,
                properties_json = excluded.properties_json,
                source_type = excluded.source_type,
                source_path = excluded.source_path,
                source_mtime = excluded.source_mtime",
            params![
                node.id,
                node.title,
                node.content,
                tags_json,
                links_json,
                properties_json,
                source_type.map(|t| t.as_str()),
                path,
                mtime,
            ],
        )
        .context("upserting node")?;

        self.conn
            .execute("DELETE FROM node_tags WHERE node_id = ?1", params![node.id])
            .context("clearing stale node_tags rows")?;
        for tag in &node.tags {
            self.conn
                .execute(
                    "INSERT OR IGNORE INTO node_tags (node_id, tag) VALUES (?1, ?2)",
                    params![node.id, tag.to_lowercase()],
                )
                .context("indexing node tag")?;
        }
        Ok(())
    }

    pub fn get_node(&self, id: &str) -> Result<Option<Node>> {
        let sql = format!("SELECT {NODE_COLUMNS} FROM nodes WHERE id = ?1 COLLATE NOCASE");
        self.conn
            .query_row(&sql, params![id], row_to_node)
            .optional()
            .context("reading node by id")
    }

    pub fn get_nodes(&self, ids: &[String]) -> Result<Vec<Node>> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(node) = self.get_node(id)? {
                out.push(node);
            }
        }
        Ok(out)
    }

    pub fn get_all_nodes(&self) -> Result<Vec<Node>> {
        let sql = format!("SELECT {NODE_COLUMNS} FROM nodes");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], row_to_node)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("reading all nodes")?;
        Ok(rows)
    }

    pub fn delete_node(&self, id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM nodes WHERE id = ?1 COLLATE NOCASE", params![id])?;
        Ok(())
    }

    pub fn get_node_by_path(&self, path: &str) -> Result<Option<Node>> {
        let sql = format!(
            "SELECT {NODE_COLUMNS} FROM nodes WHERE source_path = ?1 COLLATE NOCASE"
        );
        self.conn
            .query_row(&sql, params![path], row_to_node)
            .optional()
            .context("reading node by path")
    }

    pub fn get_modified_time(&self, path: &str) -> Result<Option<i64>> {
        self.conn
            .query_row(
                "SELECT source_mtime FROM nodes WHERE source_path = ?1 COLLATE NOCASE",
                params![path],
                |row| row.get(0),
            )
            .optional()
            .context("reading modified time")
    }

    pub fn get_all_tracked_paths(&self) -> Result<HashSet<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT source_path FROM nodes WHERE source_path IS NOT NULL")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(rows)
    }

    pub fn resolve_titles(&self, ids: &[String]) -> Result<HashMap<String, String>> {
        let mut out = HashMap::new();
        for id in ids {
            if let Some(title) = self
                .conn
                .query_row(
                    "SELECT title FROM nodes WHERE id = ?1 COLLATE NOCASE",
                    params![id],
                    |row| row.get::<_, String>(0),
                )
                .optional()?
            {
                out.insert(id.clone(), title);
            }
        }
        Ok(out)
    }

    /// `mode = "any"` matches a node tagged with at least one of `tags`;
    /// `mode = "all"` requires every tag. Matching is case-insensitive,
    /// driven entirely through the indexed `node_tags` table.
    pub fn search_by_tags(
        &self,
        tags: &[String],
        mode: &str,
        limit: Option<usize>,
    ) -> Result<Vec<NodeSummary>> {
        if tags.is_empty() {
            return Ok(Vec::new());
        }
        let wanted: Vec<String> = tags.iter().map(|t| t.to_lowercase()).collect();
        let placeholders = wanted.iter().map(|_| "?").collect::<Vec<_>>().join(", ");

        let (sql, require_count) = if mode == "all" {
            (
                format!(
                    "SELECT n.id, n.title FROM nodes n
                     WHERE (SELECT COUNT(DISTINCT nt.tag) FROM node_tags nt
                            WHERE nt.node_id = n.id AND nt.tag IN ({placeholders})) = ?
                     ORDER BY n.id"
                ),
                true,
            )
        } else {
            (
                format!(
                    "SELECT DISTINCT n.id, n.title FROM nodes n
                     JOIN node_tags nt ON nt.node_id = n.id
                     WHERE nt.tag IN ({placeholders})
                     ORDER BY n.id"
                ),
                false,
            )
        };

        let wanted_count = wanted.len() as i64;
        let mut binds: Vec<&dyn rusqlite::ToSql> =
            wanted.iter().map(|t| t as &dyn rusqlite::ToSql).collect();
        if require_count {
            binds.push(&wanted_count);
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(binds.as_slice(), |row| {
                Ok(NodeSummary {
                    id: row.get(0)?,
                    title: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("searching by tags")?;

        Ok(match limit {
            Some(limit) => rows.into_iter().take(limit).collect(),
            None => rows,
        })
    }

    /// `total` is the full match count regardless of `options.limit/offset`.
    pub fn list_nodes(&self, filter: &ListFilter, options: &ListOptions) -> Result<ListResult> {
        let limit = options.limit.min(1000) as i64;
        let offset = options.offset as i64;

        let mut where_clauses = Vec::new();
        let mut bind_tag = None;
        let mut bind_path = None;
        if let Some(tag) = &filter.tag {
            where_clauses.push(
                "EXISTS (SELECT 1 FROM node_tags nt WHERE nt.node_id = nodes.id AND nt.tag = ?)"
                    .to_string(),
            );
            bind_tag = Some(tag.to_lowercase());
        }
        if let Some(path) = &filter.path {
            where_clauses.push("LOWER(source_path) LIKE LOWER(?)".to_string());
            bind_path = Some(format!("%{}%", path));
        }
        let where_sql = if where_clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", where_clauses.join(" AND "))
        };

        let mut binds: Vec<&dyn rusqlite::ToSql> = Vec::new();
        if let Some(t) = &bind_tag {
            binds.push(t);
        }
        if let Some(p) = &bind_path {
            binds.push(p);
        }

        let count_sql = format!("SELECT COUNT(*) FROM nodes {where_sql}");
        let total: i64 = self
            .conn
            .query_row(&count_sql, binds.as_slice(), |row| row.get(0))
            .context("counting listNodes total")?;

        let mut page_binds = binds;
        page_binds.push(&limit);
        page_binds.push(&offset);
        let page_sql =
            format!("SELECT id, title FROM nodes {where_sql} ORDER BY id LIMIT ? OFFSET ?");
        let mut stmt = self.conn.prepare(&page_sql)?;
        let nodes = stmt
            .query_map(page_binds.as_slice(), |row| {
                Ok(NodeSummary {
                    id: row.get(0)?,
                    title: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("listing nodes")?;

        Ok(ListResult { nodes, total })
    }

    pub fn nodes_exist(&self, ids: &[String]) -> Result<HashMap<String, bool>> {
        let mut out = HashMap::new();
        for id in ids {
            let exists: bool = self.conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM nodes WHERE id = ?1 COLLATE NOCASE)",
                params![id],
                |row| row.get(0),
            )?;
            out.insert(id.clone(), exists);
        }
        Ok(out)
    }
}

/// Deserialize one `nodes` row. Corrupted JSON cells surface as a read
/// error rather than silently dropping data.
fn row_to_node(row: &rusqlite::Row<'_>) -> rusqlite::Result<Node> {
    let id: String = row.get(0)?;
    let title: String = row.get(1)?;
    let content: String = row.get(2)?;
    let tags_json: String = row.get(3)?;
    let links_json: String = row.get(4)?;
    let properties_json: String = row.get(5)?;
    let source_type: Option<String> = row.get(6)?;
    let source_path: Option<String> = row.get(7)?;
    let source_mtime: Option<i64> = row.get(8)?;

    let tags = serde_json::from_str(&tags_json).map_err(json_err)?;
    let outgoing_links = serde_json::from_str(&links_json).map_err(json_err)?;
    let properties = serde_json::from_str(&properties_json).map_err(json_err)?;

    let source_ref = match (source_type, source_path, source_mtime) {
        (Some(_), Some(path), Some(last_modified)) => {
            Some(crate::model::SourceRef { path, last_modified })
        }
        _ => None,
    };

    Ok(Node {
        id,
        title,
        content,
        tags,
        properties,
        outgoing_links,
        source_ref,
    })
}

fn json_err(e: serde_json::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
}
