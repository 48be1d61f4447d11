//! Link Resolver (C5): builds the title/filename index and resolves raw
//! link text to node ids.

use std::collections::HashMap;

use tracing::warn;

use crate::id::ghost_id;
use crate::model::Node;
use crate::paths::{space_dash_variant, strip_fragment_and_extension};

/// `lowercase(title|filename_without_ext) → sorted node ids`, sorted
/// lexicographically for deterministic tie-break.
pub struct TitleIndex {
    entries: HashMap<String, Vec<String>>,
}

impl TitleIndex {
    /// Build the index over `nodes`. A node contributes its title key and,
    /// if it differs under case-folding, a filename-derived key too. Nodes
    /// with neither a usable title nor a source path are skipped with a
    /// one-time warning.
    pub fn build(nodes: &[Node]) -> Self {
        let mut entries: HashMap<String, Vec<String>> = HashMap::new();
        let mut warned_once = false;

        for node in nodes {
            let mut keys: Vec<String> = Vec::new();
            if !node.title.trim().is_empty() {
                keys.push(node.title.to_lowercase());
            }
            if let Some(source_ref) = &node.source_ref {
                if let Some(file_stem) = filename_stem(&source_ref.path) {
                    let lowered = file_stem.to_lowercase();
                    if !keys.contains(&lowered) {
                        keys.push(lowered);
                    }
                }
            }

            if keys.is_empty() {
                if !warned_once {
                    warn!(
                        node_id = %node.id,
                        "node has neither a usable title nor a source path; it is not indexable by link resolution"
                    );
                    warned_once = true;
                }
                continue;
            }

            for key in keys {
                let bucket = entries.entry(key).or_default();
                if !bucket.contains(&node.id) {
                    bucket.push(node.id.clone());
                }
            }
        }

        for bucket in entries.values_mut() {
            bucket.sort();
        }

        TitleIndex { entries }
    }

    fn lookup(&self, key: &str) -> Option<&[String]> {
        self.entries.get(key).map(|v| v.as_slice())
    }
}

fn filename_stem(path: &str) -> Option<&str> {
    let file_name = path.rsplit(['/', '\\']).next()?;
    Some(
        file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(file_name),
    )
}

/// Resolve already-normalized raw targets to node ids. Pure function of
/// `(rawTargets, index, validIds)` — same inputs always yield the same
/// output, and ambiguous matches always pick the lexicographically
/// smallest candidate id.
pub fn resolve_links(
    raw_targets: &[String],
    index: &TitleIndex,
    valid_ids: &std::collections::HashSet<String>,
) -> Vec<String> {
    raw_targets
        .iter()
        .map(|target| resolve_one(target, index, valid_ids))
        .collect()
}

fn resolve_one(
    target: &str,
    index: &TitleIndex,
    valid_ids: &std::collections::HashSet<String>,
) -> String {
    if valid_ids.contains(target) {
        return target.to_string();
    }

    let bare_key = strip_fragment_and_extension(target).to_lowercase();
    if let Some(id) = lookup_with_warning(index, &bare_key, target) {
        return id;
    }

    if let Some(variant) = space_dash_variant(&bare_key) {
        if let Some(id) = lookup_with_warning(index, &variant, target) {
            return id;
        }
    }

    // No partial-path suffix matching: targets containing '/' remain literal.
    target.to_string()
}

fn lookup_with_warning(index: &TitleIndex, key: &str, original_target: &str) -> Option<String> {
    let candidates = index.lookup(key)?;
    if candidates.is_empty() {
        return None;
    }
    if candidates.len() > 1 {
        warn!(
            target = %original_target,
            candidates = ?candidates,
            "ambiguous wikilink: choosing lexicographically smallest id"
        );
    }
    Some(candidates[0].clone())
}

/// Mint (or reuse) a deterministic ghost id for a target that resolution
/// left unresolved, i.e. one that has no file extension stripped down to a
/// recognizable title and wasn't found in the index.
pub fn ghost_id_for_target(target: &str) -> String {
    ghost_id(strip_fragment_and_extension(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceRef;
    use std::collections::HashSet;

    fn node(id: &str, title: &str, path: Option<&str>) -> Node {
        Node {
            id: id.to_string(),
            title: title.to_string(),
            content: String::new(),
            tags: Vec::new(),
            properties: HashMap::new(),
            outgoing_links: Vec::new(),
            source_ref: path.map(|p| SourceRef {
                path: p.to_string(),
                last_modified: 0,
            }),
        }
    }

    #[test]
    fn exact_id_target_is_kept() {
        let index = TitleIndex::build(&[]);
        let valid: HashSet<String> = ["abc123def456".to_string()].into_iter().collect();
        let resolved = resolve_links(&["abc123def456".to_string()], &index, &valid);
        assert_eq!(resolved, vec!["abc123def456"]);
    }

    #[test]
    fn title_lookup_resolves_to_id() {
        let nodes = vec![node("id1", "Other Note", Some("notes/other-note.md"))];
        let index = TitleIndex::build(&nodes);
        let valid = HashSet::new();
        let resolved = resolve_links(&["other note.md".to_string()], &index, &valid);
        assert_eq!(resolved, vec!["id1"]);
    }

    #[test]
    fn ambiguous_titles_pick_smallest_id() {
        let nodes = vec![
            node("zzz", "Dup", Some("a.md")),
            node("aaa", "Dup", Some("b.md")),
        ];
        let index = TitleIndex::build(&nodes);
        let resolved = resolve_links(&["dup.md".to_string()], &index, &HashSet::new());
        assert_eq!(resolved, vec!["aaa"]);
    }

    #[test]
    fn space_dash_fallback_applies() {
        let nodes = vec![node("id1", "My Page", None)];
        let index = TitleIndex::build(&nodes);
        let resolved = resolve_links(&["my-page.md".to_string()], &index, &HashSet::new());
        assert_eq!(resolved, vec!["id1"]);
    }

    #[test]
    fn unresolved_target_kept_literal_for_ghost_minting() {
        let index = TitleIndex::build(&[]);
        let resolved = resolve_links(&["nowhere.md".to_string()], &index, &HashSet::new());
        assert_eq!(resolved, vec!["nowhere.md"]);
    }

    #[test]
    fn partial_paths_are_not_suffix_matched() {
        let nodes = vec![node("id1", "Note", Some("deep/sub/note.md"))];
        let index = TitleIndex::build(&nodes);
        let resolved = resolve_links(&["sub/note.md".to_string()], &index, &HashSet::new());
        assert_eq!(resolved, vec!["sub/note.md"]);
    }

    #[test]
    fn ghost_id_for_target_is_deterministic() {
        let a = ghost_id_for_target("nowhere.md");
        let b = ghost_id_for_target("nowhere.md");
        assert_eq!(a, b);
        assert!(crate::id::is_ghost_id(&a));
    }
}
