//! Cache Store type definitions shared across nodes/resolve/centrality.

use serde::{Deserialize, Serialize};

/// `sourceRef.type` — currently always `file`, kept as an enum so a future
/// source kind doesn't require a column migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceType {
    File,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::File => "file",
        }
    }
}

/// `(id, title)` pair, the shape returned by `listNodes` and used wherever
/// a full node body would be wasteful.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSummary {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub tag: Option<String>,
    pub path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ListOptions {
    pub limit: usize,
    pub offset: usize,
}

impl Default for ListOptions {
    fn default() -> Self {
        ListOptions {
            limit: 100,
            offset: 0,
        }
    }
}

pub struct ListResult {
    pub nodes: Vec<NodeSummary>,
    pub total: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStrategy {
    Exact,
    Fuzzy,
    Semantic,
}

#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub strategy: ResolveStrategy,
    pub threshold: f64,
    pub tag: Option<String>,
    pub path: Option<String>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        ResolveOptions {
            strategy: ResolveStrategy::Exact,
            threshold: 0.7,
            tag: None,
            path: None,
        }
    }
}

/// One slot of a `resolveNodes` response — `match_id = None, score = 0.0`
/// for an unmatched input name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolveMatch {
    pub query: String,
    pub match_id: Option<String>,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CentralityRecord {
    pub in_degree: i64,
    pub out_degree: i64,
    pub pagerank: f64,
    pub computed_at: i64,
}
