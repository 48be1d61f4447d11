//! `resolveNodes`: batch name → node resolution across exact/fuzzy/semantic
//! strategies.

use anyhow::Result;
use strsim::jaro_winkler;

use super::types::{ResolveMatch, ResolveOptions, ResolveStrategy};
use super::CacheStore;

impl CacheStore {
    /// Resolve each entry in `names` to a node id. Order of output mirrors
    /// order of input; an unmatched name gets `match_id = None, score = 0`.
    pub fn resolve_nodes(
        &self,
        names: &[String],
        options: &ResolveOptions,
    ) -> Result<Vec<ResolveMatch>> {
        let candidates = self.candidate_titles(options)?;

        let mut out = Vec::with_capacity(names.len());
        for name in names {
            let lowered = name.to_lowercase();
            let resolved = match options.strategy {
                ResolveStrategy::Exact => candidates
                    .iter()
                    .find(|(_, title)| title.to_lowercase() == lowered)
                    .map(|(id, _)| (id.clone(), 1.0)),
                ResolveStrategy::Fuzzy => candidates
                    .iter()
                    .map(|(id, title)| (id.clone(), jaro_winkler(&lowered, &title.to_lowercase())))
                    .filter(|(_, score)| *score >= options.threshold)
                    .max_by(|a, b| a.1.total_cmp(&b.1)),
                // semantic resolution needs an embedding provider the cache
                // store doesn't have access to; the dispatcher decides
                // whether to retry with `fuzzy`.
                ResolveStrategy::Semantic => None,
            };

            match resolved {
                Some((id, score)) => out.push(ResolveMatch {
                    query: name.clone(),
                    match_id: Some(id),
                    score,
                }),
                None => out.push(ResolveMatch {
                    query: name.clone(),
                    match_id: None,
                    score: 0.0,
                }),
            }
        }
        Ok(out)
    }

    fn candidate_titles(&self, options: &ResolveOptions) -> Result<Vec<(String, String)>> {
        let mut where_clauses = Vec::new();
        let mut bind_tag = None;
        let mut bind_path = None;
        if let Some(tag) = &options.tag {
            where_clauses.push("tags_json LIKE ?".to_string());
            bind_tag = Some(format!("%\"{}\"%", tag.to_lowercase()));
        }
        if let Some(path) = &options.path {
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

        let sql = format!("SELECT id, title FROM nodes {where_sql}");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(binds.as_slice(), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
