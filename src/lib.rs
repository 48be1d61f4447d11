//! roux — a local knowledge-graph indexing engine for a vault of markdown
//! notes. Continuously maintains a queryable projection of the on-disk
//! vault (nodes, tags, properties, directed wiki-link edges) that powers
//! search, neighborhood traversal, shortest-path, hub ranking, and batch
//! name resolution.
//!
//! The tool-call RPC layer, vector/embedding backend, plugin schema, UI,
//! and config-file loading are external collaborators; this crate only
//! documents their interfaces ([`vector::VectorProvider`],
//! [`dispatcher::response`]) and implements everything upstream of them.

pub mod database;
pub mod dispatcher;
pub mod format;
pub mod graph;
pub mod id;
pub mod model;
pub mod paths;
pub mod resolver;
pub mod store;
pub mod vector;
pub mod watcher;

#[cfg(test)]
pub mod tests;

pub use dispatcher::{DispatchError, Dispatcher};
pub use model::{Node, NodeDraft, PropertyValue};
pub use store::{DocStore, DocStoreConfig};
