//! Response shapes, modeled as `serde::Serialize` structs so a future RPC
//! layer can serialize them directly. This crate does not implement the
//! transport itself.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::database::NodeSummary;

#[derive(Debug, Clone, Serialize)]
pub struct LinkRef {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeResponse {
    pub id: String,
    pub title: String,
    pub content: Option<String>,
    pub tags: Vec<String>,
    pub links: Vec<LinkRef>,
    pub properties: HashMap<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeWithContextResponse {
    pub node: NodeResponse,
    pub incoming_neighbors: Vec<NodeResponse>,
    pub outgoing_neighbors: Vec<NodeResponse>,
    pub incoming_count: usize,
    pub outgoing_count: usize,
}

/// `handleGetNode` returns one shape at `depth=0` and another at
/// `depth=1`; this envelope lets both flow through one return type.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum NodeResponseEnvelope {
    Node(NodeResponse),
    WithContext(NodeWithContextResponse),
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub node: NodeResponse,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HubResponse {
    pub id: String,
    pub title: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PathResponse {
    pub path: Vec<String>,
    pub length: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListResponse {
    pub nodes: Vec<NodeSummary>,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}
