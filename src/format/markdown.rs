//! Default `.md`/`.markdown` reader: YAML frontmatter + wiki-link body.

use std::collections::HashMap;

use crate::model::{NodeDraft, ParseOutcome, PropertyValue, RESERVED_PROPERTY_KEYS};
use crate::paths::normalize_link_target;

use super::{draft_needs_id_write, FormatReader, ParseContext};

pub struct MarkdownReader;

impl FormatReader for MarkdownReader {
    fn extensions(&self) -> &[&'static str] {
        &["md", "markdown"]
    }

    fn name(&self) -> &'static str {
        "markdown"
    }

    fn parse(&self, bytes: &[u8], context: &ParseContext<'_>) -> ParseOutcome {
        let text = String::from_utf8_lossy(bytes).into_owned();
        let (frontmatter, body) = split_frontmatter(&text);

        let mut id = None;
        let mut title = None;
        let mut tags = Vec::new();
        let mut properties = HashMap::new();

        if let Some(raw) = frontmatter {
            if let Ok(serde_yaml::Value::Mapping(map)) = serde_yaml::from_str(raw) {
                for (key, value) in map {
                    let serde_yaml::Value::String(key) = key else {
                        continue;
                    };
                    match key.as_str() {
                        "id" => {
                            if let serde_yaml::Value::String(s) = &value {
                                id = Some(s.clone());
                            }
                        }
                        "title" => {
                            if let serde_yaml::Value::String(s) = &value {
                                title = Some(s.clone());
                            }
                        }
                        "tags" => {
                            tags = extract_tags(&value);
                        }
                        other => {
                            if RESERVED_PROPERTY_KEYS.contains(&other) {
                                continue;
                            }
                            if let Ok(json) = serde_json::to_value(yaml_to_json(&value)) {
                                properties.insert(other.to_string(), PropertyValue::from(json));
                            }
                        }
                    }
                }
            }
            // malformed frontmatter (not a mapping, or invalid YAML) falls
            // through silently — defaults stand, never a throw.
        }

        let title = title.unwrap_or_else(|| title_from_path(context.relative_path));
        let raw_links = extract_wikilinks(body)
            .into_iter()
            .map(|target| normalize_link_target(&target))
            .collect();

        let draft = NodeDraft {
            id: id.clone(),
            title,
            content: body.to_string(),
            tags,
            properties,
            raw_links,
        };
        let needs_id_write = draft_needs_id_write(&id);
        ParseOutcome {
            draft,
            needs_id_write,
        }
    }
}

/// Split `---\n...\n---\n` YAML frontmatter off the front of `text`. Returns
/// `(None, text)` when there is no well-formed delimiter pair.
fn split_frontmatter(text: &str) -> (Option<&str>, &str) {
    let Some(rest) = text.strip_prefix("---") else {
        return (None, text);
    };
    let rest = rest.strip_prefix('\n').unwrap_or(rest);
    let Some(end) = rest.find("\n---") else {
        return (None, text);
    };
    let frontmatter = &rest[..end];
    let after = &rest[end + 4..];
    let body = after.strip_prefix('\n').unwrap_or(after);
    (Some(frontmatter), body)
}

fn extract_tags(value: &serde_yaml::Value) -> Vec<String> {
    match value {
        serde_yaml::Value::Sequence(seq) => seq
            .iter()
            .filter_map(|v| v.as_str().map(|s| s.to_lowercase()))
            .collect(),
        serde_yaml::Value::String(s) => vec![s.to_lowercase()],
        _ => Vec::new(),
    }
}

fn yaml_to_json(value: &serde_yaml::Value) -> serde_json::Value {
    match value {
        serde_yaml::Value::Null => serde_json::Value::Null,
        serde_yaml::Value::Bool(b) => serde_json::Value::Bool(*b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                serde_json::Value::from(i)
            } else if let Some(f) = n.as_f64() {
                serde_json::Value::from(f)
            } else {
                serde_json::Value::Null
            }
        }
        serde_yaml::Value::String(s) => serde_json::Value::String(s.clone()),
        serde_yaml::Value::Sequence(seq) => {
            serde_json::Value::Array(seq.iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(map) => {
            let mut obj = serde_json::Map::new();
            for (k, v) in map {
                if let serde_yaml::Value::String(k) = k {
                    obj.insert(k.clone(), yaml_to_json(v));
                }
            }
            serde_json::Value::Object(obj)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}

/// Derive a title from a bare filename: `my-derived-title.md` becomes
/// `My Derived Title` (dashes/underscores become spaces, each word
/// capitalized).
fn title_from_path(relative_path: &str) -> String {
    let file_name = relative_path
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(relative_path);
    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name);

    stem.split(['-', '_', ' '])
        .filter(|word| !word.is_empty())
        .map(capitalize_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Tokenize `[[target]]` / `[[target|alias]]` occurrences out of `body`,
/// skipping fenced code blocks (``` ... ```), inline code spans (`...`),
/// and escaped `\[[...]]`.
fn extract_wikilinks(body: &str) -> Vec<String> {
    let mut links = Vec::new();
    let chars: Vec<char> = body.chars().collect();
    let mut i = 0;
    let mut in_fence = false;

    while i < chars.len() {
        // Fenced code block delimiter, only meaningful at line start.
        if is_line_start(&chars, i) && starts_with(&chars, i, "```") {
            in_fence = !in_fence;
            i += 3;
            continue;
        }
        if in_fence {
            i += 1;
            continue;
        }
        // Inline code span: skip to the matching backtick run of equal length.
        if chars[i] == '`' {
            let run_len = run_length(&chars, i, '`');
            if let Some(end) = find_backtick_close(&chars, i + run_len, run_len) {
                i = end + run_len;
                continue;
            }
            i += run_len;
            continue;
        }
        // Escaped opening bracket: `\[[` never starts a link.
        if chars[i] == '\\' && starts_with(&chars, i + 1, "[[") {
            i += 3;
            continue;
        }
        if starts_with(&chars, i, "[[") {
            if let Some(close) = find(&chars, i + 2, "]]") {
                let target: String = chars[i + 2..close].iter().collect();
                links.push(target);
                i = close + 2;
                continue;
            }
        }
        i += 1;
    }

    links
}

fn is_line_start(chars: &[char], i: usize) -> bool {
    i == 0 || chars[i - 1] == '\n'
}

fn starts_with(chars: &[char], i: usize, pat: &str) -> bool {
    let pat_chars: Vec<char> = pat.chars().collect();
    if i + pat_chars.len() > chars.len() {
        return false;
    }
    chars[i..i + pat_chars.len()] == pat_chars[..]
}

fn run_length(chars: &[char], start: usize, c: char) -> usize {
    let mut n = 0;
    while start + n < chars.len() && chars[start + n] == c {
        n += 1;
    }
    n
}

fn find_backtick_close(chars: &[char], from: usize, run_len: usize) -> Option<usize> {
    let mut i = from;
    while i < chars.len() {
        if chars[i] == '`' {
            let n = run_length(chars, i, '`');
            if n == run_len {
                return Some(i);
            }
            i += n;
        } else {
            i += 1;
        }
    }
    None
}

fn find(chars: &[char], from: usize, pat: &str) -> Option<usize> {
    let pat_chars: Vec<char> = pat.chars().collect();
    if pat_chars.is_empty() || from > chars.len() {
        return None;
    }
    let mut i = from;
    while i + pat_chars.len() <= chars.len() {
        if chars[i..i + pat_chars.len()] == pat_chars[..] {
            return Some(i);
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context<'a>(relative_path: &'a str) -> ParseContext<'a> {
        ParseContext {
            absolute_path: relative_path,
            relative_path,
            extension: "md",
            mtime: 0,
        }
    }

    #[test]
    fn parses_frontmatter_title_tags_properties() {
        let text = "---\nid: abc123DEF456\ntitle: My Note\ntags: [Alpha, Beta, 3]\nauthor: jane\n---\nbody [[Other Note]]\n";
        let outcome = MarkdownReader.parse(text.as_bytes(), &context("my-note.md"));
        assert_eq!(outcome.draft.id.as_deref(), Some("abc123DEF456"));
        assert_eq!(outcome.draft.title, "My Note");
        assert_eq!(outcome.draft.tags, vec!["alpha", "beta"]);
        assert!(outcome.draft.properties.contains_key("author"));
        assert!(!outcome.draft.properties.contains_key("id"));
        assert!(!outcome.draft.properties.contains_key("tags"));
        assert_eq!(outcome.draft.raw_links, vec!["other note.md"]);
    }

    #[test]
    fn derived_title_capitalizes_dash_separated_words() {
        let outcome = MarkdownReader.parse(b"no frontmatter", &context("my-derived-title.md"));
        assert_eq!(outcome.draft.title, "My Derived Title");
    }

    #[test]
    fn missing_frontmatter_falls_back_to_filename_title() {
        let text = "just a body, no frontmatter here";
        let outcome = MarkdownReader.parse(text.as_bytes(), &context("sub/Plain File.md"));
        assert_eq!(outcome.draft.title, "Plain File");
        assert!(outcome.needs_id_write);
    }

    #[test]
    fn malformed_frontmatter_never_throws() {
        let text = "---\n: : not yaml : :\n---\nbody\n";
        let outcome = MarkdownReader.parse(text.as_bytes(), &context("x.md"));
        assert_eq!(outcome.draft.title, "x");
    }

    #[test]
    fn wikilink_alias_and_fragment_normalized() {
        let body = "See [[Target Page|display text]] and [[Other#Section]].";
        let links = extract_wikilinks(body);
        assert_eq!(links, vec!["Target Page".to_string(), "Other#Section".to_string()]);
    }

    #[test]
    fn wikilinks_in_fenced_code_are_skipped() {
        let body = "```\n[[Not A Link]]\n```\nreal [[Real Link]]";
        let links = extract_wikilinks(body);
        assert_eq!(links, vec!["Real Link".to_string()]);
    }

    #[test]
    fn wikilinks_in_inline_code_are_skipped() {
        let body = "use `[[Not A Link]]` then [[Real Link]]";
        let links = extract_wikilinks(body);
        assert_eq!(links, vec!["Real Link".to_string()]);
    }

    #[test]
    fn escaped_brackets_are_ignored() {
        let body = r"literal \[[Not A Link]] and [[Real Link]]";
        let links = extract_wikilinks(body);
        assert_eq!(links, vec!["Real Link".to_string()]);
    }

    #[test]
    fn non_string_tags_are_filtered() {
        let text = "---\ntags: [one, 2, true, three]\n---\nbody\n";
        let outcome = MarkdownReader.parse(text.as_bytes(), &context("n.md"));
        assert_eq!(outcome.draft.tags, vec!["one", "three"]);
    }
}
