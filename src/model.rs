//! Core data model: nodes, properties, and the intermediate draft a format
//! reader hands back to the orchestrator before link resolution.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A dynamically-typed property value, serialized through `serde_json`
/// at the cache boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Seq(Vec<PropertyValue>),
    Map(HashMap<String, PropertyValue>),
}

impl From<serde_json::Value> for PropertyValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => PropertyValue::Null,
            serde_json::Value::Bool(b) => PropertyValue::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    PropertyValue::Int(i)
                } else {
                    PropertyValue::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => PropertyValue::String(s),
            serde_json::Value::Array(a) => {
                PropertyValue::Seq(a.into_iter().map(PropertyValue::from).collect())
            }
            serde_json::Value::Object(o) => PropertyValue::Map(
                o.into_iter()
                    .map(|(k, v)| (k, PropertyValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<PropertyValue> for serde_json::Value {
    fn from(value: PropertyValue) -> Self {
        match value {
            PropertyValue::Null => serde_json::Value::Null,
            PropertyValue::Bool(b) => serde_json::Value::Bool(b),
            PropertyValue::Int(i) => serde_json::Value::from(i),
            PropertyValue::Float(f) => serde_json::Value::from(f),
            PropertyValue::String(s) => serde_json::Value::String(s),
            PropertyValue::Seq(seq) => {
                serde_json::Value::Array(seq.into_iter().map(Into::into).collect())
            }
            PropertyValue::Map(map) => serde_json::Value::Object(
                map.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}

/// Keys that are lifted into dedicated [`Node`] fields rather than
/// `properties`.
pub const RESERVED_PROPERTY_KEYS: [&str; 3] = ["id", "title", "tags"];

/// Lowercase every tag, the same normalization frontmatter-derived tags get
/// in `format::markdown::extract_tags`. Applied wherever tags enter through
/// the write API so `Node.tags` is a normalized set regardless of path.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter().map(|t| t.to_lowercase()).collect()
}

/// `sourceRef` — present for every node backed by a file on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub path: String,
    pub last_modified: i64,
}

/// The authoritative, at-rest representation of one indexed note or ghost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub properties: HashMap<String, PropertyValue>,
    pub outgoing_links: Vec<String>,
    pub source_ref: Option<SourceRef>,
}

impl Node {
    pub fn new_ghost(id: String, title: String) -> Self {
        Node {
            id,
            title,
            content: String::new(),
            tags: Vec::new(),
            properties: HashMap::new(),
            outgoing_links: Vec::new(),
            source_ref: None,
        }
    }
}

/// What a [`crate::format::FormatReader`] hands back after parsing one
/// file. `raw_links` are link targets exactly as normalized by C1, not yet
/// resolved to node ids — resolution is the resolver's (C5) job.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDraft {
    pub id: Option<String>,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub properties: HashMap<String, PropertyValue>,
    pub raw_links: Vec<String>,
}

/// Whether the parsed draft needs a freshly assigned id written back to
/// the source file's frontmatter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    pub draft: NodeDraft,
    pub needs_id_write: bool,
}

/// Does `id` satisfy the "valid 12-character id" test, or does it need
/// (re)assignment? Missing, wrong-length, non-alphabet, and path-shaped
/// ids all count as invalid.
pub fn needs_id_write(id: &Option<String>) -> bool {
    match id {
        None => true,
        Some(s) if s.is_empty() => true,
        Some(s) => !crate::id::is_valid_id(s),
    }
}
