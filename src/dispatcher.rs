//! Query/Command Dispatcher (C9): thin, total-function validation layer in
//! front of [`crate::store::DocStore`]. Shapes every response in
//! [`response`] and enforces the typed error taxonomy at this boundary only.

pub mod response;

use std::sync::Arc;

use thiserror::Error;

use crate::database::{ListFilter, ListOptions, ResolveOptions};
use crate::graph::{Direction, HubMetric};
use crate::model::Node;
use crate::store::{DocStore, NodePatch};

use response::*;

const MAX_NEIGHBORS: usize = 20;
const TRUNCATE_PRIMARY: usize = 10_000;
const TRUNCATE_LIST: usize = 500;
const TRUNCATE_NEIGHBOR: usize = 200;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("INVALID_PARAMS: {0}")]
    InvalidParams(String),
    #[error("NODE_EXISTS: {0}")]
    NodeExists(String),
    #[error("NODE_NOT_FOUND: {0}")]
    NodeNotFound(String),
    #[error("LINK_INTEGRITY: {0}")]
    LinkIntegrity(String),
    #[error("PROVIDER_ERROR: {0}")]
    ProviderError(String),
}

impl DispatchError {
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::InvalidParams(_) => "INVALID_PARAMS",
            DispatchError::NodeExists(_) => "NODE_EXISTS",
            DispatchError::NodeNotFound(_) => "NODE_NOT_FOUND",
            DispatchError::LinkIntegrity(_) => "LINK_INTEGRITY",
            DispatchError::ProviderError(_) => "PROVIDER_ERROR",
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: ErrorBody {
                code: self.code().to_string(),
                message: self.to_string(),
            },
        }
    }
}

pub struct Dispatcher {
    store: Arc<DocStore>,
    search_capable: bool,
}

impl Dispatcher {
    pub fn new(store: Arc<DocStore>, search_capable: bool) -> Self {
        Dispatcher {
            store,
            search_capable,
        }
    }

    /// `depth=0` returns node-only; `depth=1` adds up to `MAX_NEIGHBORS`
    /// truncated in/out neighbor responses plus full in/out counts.
    pub async fn handle_get_node(&self, id: &str, depth: u8) -> Result<NodeResponseEnvelope, DispatchError> {
        if depth > 1 {
            return Err(DispatchError::InvalidParams(format!(
                "depth must be 0 or 1, got {depth}"
            )));
        }
        let node = self
            .store
            .get_node(id)
            .await
            .map_err(|e| DispatchError::ProviderError(e.to_string()))?
            .ok_or_else(|| DispatchError::NodeNotFound(id.to_string()))?;

        if depth == 0 {
            return Ok(NodeResponseEnvelope::Node(
                self.to_node_response(&node, TRUNCATE_PRIMARY).await?,
            ));
        }

        let out_ids = self.store.graph_neighbors(id, Direction::Out, MAX_NEIGHBORS).await;
        let in_ids = self.store.graph_neighbors(id, Direction::In, MAX_NEIGHBORS).await;
        let out_count = self.store.graph_degree(id, Direction::Out).await;
        let in_count = self.store.graph_degree(id, Direction::In).await;

        let mut outgoing_neighbors = Vec::new();
        for nid in out_ids {
            if let Some(n) = self.store_node_or_none(&nid).await? {
                outgoing_neighbors.push(self.to_node_response(&n, TRUNCATE_NEIGHBOR).await?);
            }
        }
        let mut incoming_neighbors = Vec::new();
        for nid in in_ids {
            if let Some(n) = self.store_node_or_none(&nid).await? {
                incoming_neighbors.push(self.to_node_response(&n, TRUNCATE_NEIGHBOR).await?);
            }
        }

        Ok(NodeResponseEnvelope::WithContext(NodeWithContextResponse {
            node: self.to_node_response(&node, TRUNCATE_PRIMARY).await?,
            incoming_neighbors,
            outgoing_neighbors,
            incoming_count: in_count,
            outgoing_count: out_count,
        }))
    }

    pub async fn handle_search(&self, query_vector: &[f32], k: usize) -> Result<Vec<SearchResult>, DispatchError> {
        if !self.search_capable {
            return Err(DispatchError::ProviderError(
                "no embedding capability configured".to_string(),
            ));
        }
        let matches = self
            .store
            .vector_search(query_vector, k)
            .await
            .map_err(|e| DispatchError::ProviderError(e.to_string()))?;

        let mut results = Vec::new();
        for m in matches {
            if let Some(node) = self.store_node_or_none(&m.id).await? {
                results.push(SearchResult {
                    node: self.to_node_response(&node, TRUNCATE_LIST).await?,
                    score: 1.0 - m.distance,
                });
            }
        }
        Ok(results)
    }

    pub async fn handle_get_neighbors(
        &self,
        id: &str,
        direction: Direction,
        limit: usize,
    ) -> Result<Vec<NodeResponse>, DispatchError> {
        let ids = self.store.graph_neighbors(id, direction, limit).await;
        let mut out = Vec::new();
        for nid in ids {
            if let Some(n) = self.store_node_or_none(&nid).await? {
                out.push(self.to_node_response(&n, TRUNCATE_LIST).await?);
            }
        }
        Ok(out)
    }

    pub async fn handle_find_path(&self, source: &str, target: &str) -> Result<Option<PathResponse>, DispatchError> {
        let path = self.store.graph_find_path(source, target).await;
        Ok(path.map(|ids| PathResponse { length: ids.len(), path: ids }))
    }

    pub async fn handle_get_hubs(&self, metric: HubMetric, limit: usize) -> Result<Vec<HubResponse>, DispatchError> {
        let hubs = self.store.graph_hubs(metric, limit).await;
        let mut out = Vec::new();
        for (id, score) in hubs {
            let title = self
                .store
                .get_node(&id)
                .await
                .map_err(|e| DispatchError::ProviderError(e.to_string()))?
                .map(|n| n.title)
                .unwrap_or_default();
            out.push(HubResponse { id, title, score });
        }
        Ok(out)
    }

    pub async fn handle_list_nodes(
        &self,
        filter: ListFilter,
        options: ListOptions,
    ) -> Result<ListResponse, DispatchError> {
        let result = self
            .store
            .list_nodes(&filter, &options)
            .await
            .map_err(|e| DispatchError::ProviderError(e.to_string()))?;
        Ok(ListResponse {
            nodes: result.nodes,
            total: result.total,
        })
    }

    pub async fn handle_resolve_nodes(
        &self,
        names: &[String],
        options: ResolveOptions,
    ) -> Result<Vec<crate::database::ResolveMatch>, DispatchError> {
        // Semantic strategy with no embedding provider returns nulls (the
        // cache store has no provider access); the caller may retry with
        // `fuzzy` instead.
        self.store
            .resolve_nodes(names, &options)
            .await
            .map_err(|e| DispatchError::ProviderError(e.to_string()))
    }

    pub async fn handle_create_node(&self, node: Node, relative_path: &str) -> Result<NodeResponse, DispatchError> {
        if relative_path.trim().is_empty() {
            return Err(DispatchError::InvalidParams("relative_path is required".to_string()));
        }
        let created = self
            .store
            .create_node(node, relative_path)
            .await
            .map_err(classify_store_error)?;
        self.to_node_response(&created, TRUNCATE_PRIMARY).await
    }

    /// Refuses a title change when incoming edges exist, unless the new
    /// title equals the current one.
    pub async fn handle_update_node(&self, id: &str, patch: NodePatch) -> Result<NodeResponse, DispatchError> {
        if let Some(new_title) = &patch.title {
            let current = self
                .store
                .get_node(id)
                .await
                .map_err(|e| DispatchError::ProviderError(e.to_string()))?
                .ok_or_else(|| DispatchError::NodeNotFound(id.to_string()))?;

            if new_title != &current.title {
                let incoming = self.store.graph_degree(id, Direction::In).await;
                if incoming > 0 {
                    return Err(DispatchError::LinkIntegrity(format!(
                        "node {id} has {incoming} incoming link(s); title change refused"
                    )));
                }
            }
        }

        let updated = self
            .store
            .update_node(id, patch)
            .await
            .map_err(classify_store_error)?;
        self.to_node_response(&updated, TRUNCATE_PRIMARY).await
    }

    pub async fn handle_delete_node(&self, id: &str) -> Result<DeleteResponse, DispatchError> {
        self.store.delete_node(id).await.map_err(classify_store_error)?;
        Ok(DeleteResponse { deleted: true })
    }

    async fn store_node_or_none(&self, id: &str) -> Result<Option<Node>, DispatchError> {
        self.store
            .get_node(id)
            .await
            .map_err(|e| DispatchError::ProviderError(e.to_string()))
    }

    async fn to_node_response(&self, node: &Node, content_limit: usize) -> Result<NodeResponse, DispatchError> {
        let titles = self
            .store
            .resolve_titles(&node.outgoing_links)
            .await
            .map_err(|e| DispatchError::ProviderError(e.to_string()))?;
        let links = node
            .outgoing_links
            .iter()
            .map(|id| LinkRef {
                id: id.clone(),
                title: titles.get(id).cloned().unwrap_or_default(),
            })
            .collect();

        Ok(NodeResponse {
            id: node.id.clone(),
            title: node.title.clone(),
            content: Some(truncate_for_context(&node.content, content_limit)),
            tags: node.tags.clone(),
            links,
            properties: node
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), v.clone().into()))
                .collect(),
        })
    }
}

fn classify_store_error(e: anyhow::Error) -> DispatchError {
    let message = e.to_string();
    if let Some(rest) = message.strip_prefix("NODE_EXISTS: ") {
        DispatchError::NodeExists(rest.to_string())
    } else if let Some(rest) = message.strip_prefix("NODE_NOT_FOUND: ") {
        DispatchError::NodeNotFound(rest.to_string())
    } else if message.contains("path traversal") {
        DispatchError::InvalidParams(message)
    } else {
        DispatchError::ProviderError(message)
    }
}

/// Char-boundary-safe truncation: never splits a multi-byte character.
/// Appends `... [truncated]` when truncation actually occurs.
pub fn truncate_for_context(s: &str, limit: usize) -> String {
    if s.chars().count() <= limit {
        return s.to_string();
    }
    let truncated: String = s.chars().take(limit).collect();
    format!("{truncated}... [truncated]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_leaves_short_strings_untouched() {
        assert_eq!(truncate_for_context("hello", 10), "hello");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "a".repeat(5) + "🎉🎉🎉";
        let truncated = truncate_for_context(&s, 6);
        assert!(truncated.starts_with("aaaaa🎉"));
        assert!(truncated.ends_with("... [truncated]"));
    }

    #[test]
    fn dispatch_error_codes_match_spec() {
        assert_eq!(DispatchError::InvalidParams("x".into()).code(), "INVALID_PARAMS");
        assert_eq!(DispatchError::NodeExists("x".into()).code(), "NODE_EXISTS");
        assert_eq!(DispatchError::NodeNotFound("x".into()).code(), "NODE_NOT_FOUND");
        assert_eq!(DispatchError::LinkIntegrity("x".into()).code(), "LINK_INTEGRITY");
        assert_eq!(DispatchError::ProviderError("x".into()).code(), "PROVIDER_ERROR");
    }
}
