//! Graph Engine (C6): in-memory directed adjacency over node ids, rebuilt
//! after sync or any batch that touches links.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::database::CentralityRecord;
use crate::model::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubMetric {
    InDegree,
    OutDegree,
    Pagerank,
}

/// Snapshot of the adjacency derived from the current node set. Swapped in
/// atomically by the orchestrator on rebuild — readers holding an `Arc` to
/// a prior snapshot never observe a half-built graph.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    out_edges: HashMap<String, Vec<String>>,
    in_edges: HashMap<String, Vec<String>>,
    built: bool,
}

impl Graph {
    pub fn empty() -> Self {
        Graph::default()
    }

    /// Build from `(id → outgoingLinks)` pairs. Edge `(u → v)` exists iff
    /// `v` appears in `u`'s outgoing links; `v` need not itself be a key
    /// (ghost targets still get an in-edge).
    pub fn build(nodes: &[Node]) -> Self {
        let mut out_edges: HashMap<String, Vec<String>> = HashMap::new();
        let mut in_edges: HashMap<String, Vec<String>> = HashMap::new();

        for node in nodes {
            out_edges.entry(node.id.clone()).or_default();
            for target in &node.outgoing_links {
                out_edges.entry(node.id.clone()).or_default().push(target.clone());
                in_edges.entry(target.clone()).or_default().push(node.id.clone());
            }
            in_edges.entry(node.id.clone()).or_default();
        }

        Graph {
            out_edges,
            in_edges,
            built: true,
        }
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    fn neighbor_ids(&self, id: &str, direction: Direction) -> Vec<String> {
        match direction {
            Direction::Out => self.out_edges.get(id).cloned().unwrap_or_default(),
            Direction::In => self.in_edges.get(id).cloned().unwrap_or_default(),
            Direction::Both => {
                let mut seen = HashSet::new();
                let mut combined = Vec::new();
                for id in self
                    .out_edges.get(id).into_iter().flatten()
                    .chain(self.in_edges.get(id).into_iter().flatten())
                {
                    if seen.insert(id.clone()) {
                        combined.push(id.clone());
                    }
                }
                combined
            }
        }
    }

    /// Ids of `id`'s neighbors in `direction`, deduplicated, capped at
    /// `limit`. Empty (never panics) when the graph hasn't been built yet
    /// or `id` is unknown.
    pub fn get_neighbor_ids(&self, id: &str, direction: Direction, limit: usize) -> Vec<String> {
        if !self.built {
            return Vec::new();
        }
        let mut ids = self.neighbor_ids(id, direction);
        ids.truncate(limit);
        ids
    }

    pub fn in_degree(&self, id: &str) -> usize {
        self.in_edges.get(id).map(Vec::len).unwrap_or(0)
    }

    pub fn out_degree(&self, id: &str) -> usize {
        self.out_edges.get(id).map(Vec::len).unwrap_or(0)
    }

    /// BFS shortest path including both endpoints. `None` if either
    /// endpoint is unknown to the graph or unreachable. `Some([source])`
    /// when `source == target` and it's a known id.
    pub fn find_path(&self, source: &str, target: &str) -> Option<Vec<String>> {
        if !self.built || !self.out_edges.contains_key(source) || !self.out_edges.contains_key(target) {
            return None;
        }
        if source == target {
            return Some(vec![source.to_string()]);
        }

        let mut queue = VecDeque::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut parent: HashMap<String, String> = HashMap::new();

        queue.push_back(source.to_string());
        visited.insert(source.to_string());

        while let Some(current) = queue.pop_front() {
            if let Some(neighbors) = self.out_edges.get(&current) {
                for next in neighbors {
                    if visited.insert(next.clone()) {
                        parent.insert(next.clone(), current.clone());
                        if next == target {
                            return Some(reconstruct_path(&parent, source, target));
                        }
                        queue.push_back(next.clone());
                    }
                }
            }
        }
        None
    }

    /// Top-k ids by `metric`, ties broken by id. Empty when the graph
    /// hasn't been built.
    pub fn get_hubs(&self, metric: HubMetric, limit: usize, pagerank: &HashMap<String, f64>) -> Vec<(String, f64)> {
        if !self.built {
            return Vec::new();
        }
        let mut scored: Vec<(String, f64)> = self
            .out_edges
            .keys()
            .map(|id| {
                let score = match metric {
                    HubMetric::InDegree => self.in_degree(id) as f64,
                    HubMetric::OutDegree => self.out_degree(id) as f64,
                    HubMetric::Pagerank => *pagerank.get(id).unwrap_or(&0.0),
                };
                (id.clone(), score)
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(limit);
        scored
    }

    /// Per-node `(in_degree, out_degree, pagerank)` snapshots, ready to
    /// persist into C4.centrality. Pagerank is 0-stubbed in this phase.
    pub fn centrality_snapshot(&self, computed_at: i64) -> HashMap<String, CentralityRecord> {
        self.out_edges
            .keys()
            .map(|id| {
                (
                    id.clone(),
                    CentralityRecord {
                        in_degree: self.in_degree(id) as i64,
                        out_degree: self.out_degree(id) as i64,
                        pagerank: 0.0,
                        computed_at,
                    },
                )
            })
            .collect()
    }
}

fn reconstruct_path(parent: &HashMap<String, String>, source: &str, target: &str) -> Vec<String> {
    let mut path = vec![target.to_string()];
    let mut current = target;
    while current != source {
        let prev = parent.get(current).expect("BFS parent chain must reach source");
        path.push(prev.clone());
        current = prev;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceRef;
    use std::collections::HashMap as Map;

    fn node(id: &str, links: &[&str]) -> Node {
        Node {
            id: id.to_string(),
            title: id.to_string(),
            content: String::new(),
            tags: Vec::new(),
            properties: Map::new(),
            outgoing_links: links.iter().map(|s| s.to_string()).collect(),
            source_ref: Some(SourceRef {
                path: format!("{id}.md"),
                last_modified: 0,
            }),
        }
    }

    #[test]
    fn unbuilt_graph_degrades_gracefully() {
        let graph = Graph::empty();
        assert!(graph.get_neighbor_ids("a", Direction::Out, 10).is_empty());
        assert_eq!(graph.find_path("a", "b"), None);
        assert!(graph.get_hubs(HubMetric::InDegree, 5, &Map::new()).is_empty());
    }

    #[test]
    fn shortest_path_follows_edges_through_an_intermediate_node() {
        let nodes = vec![
            node("a", &["b", "d"]),
            node("b", &["c"]),
            node("c", &[]),
            node("d", &["c"]),
        ];
        let graph = Graph::build(&nodes);

        let path = graph.find_path("a", "c").unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path.first(), Some(&"a".to_string()));
        assert_eq!(path.last(), Some(&"c".to_string()));

        assert_eq!(graph.find_path("c", "a"), None);
        assert_eq!(graph.find_path("a", "a"), Some(vec!["a".to_string()]));
    }

    #[test]
    fn neighbors_dedupe_for_both_direction() {
        let nodes = vec![node("a", &["b"]), node("b", &["a"])];
        let graph = Graph::build(&nodes);
        let both = graph.get_neighbor_ids("a", Direction::Both, 10);
        assert_eq!(both, vec!["b".to_string()]);
    }

    #[test]
    fn hubs_break_ties_by_id() {
        let nodes = vec![node("z", &["shared"]), node("a", &["shared"]), node("shared", &[])];
        let graph = Graph::build(&nodes);
        let hubs = graph.get_hubs(HubMetric::OutDegree, 10, &Map::new());
        // "a" and "z" both have out-degree 1, "shared" has 0; tie broken by id.
        assert_eq!(hubs[0].0, "a");
        assert_eq!(hubs[1].0, "z");
        assert_eq!(hubs[2].0, "shared");
    }

    #[test]
    fn centrality_snapshot_counts_degrees() {
        let nodes = vec![node("a", &["b"]), node("b", &[])];
        let graph = Graph::build(&nodes);
        let snapshot = graph.centrality_snapshot(1000);
        assert_eq!(snapshot["a"].out_degree, 1);
        assert_eq!(snapshot["a"].in_degree, 0);
        assert_eq!(snapshot["b"].in_degree, 1);
    }
}
