//! Path and link-target normalization (C1).
//!
//! All id-equivalence comparisons of file paths and all wiki-link
//! resolution go through the functions in this module so that case,
//! separator, and extension handling stay consistent across the crate.

/// Canonicalize a file path for equality comparisons: backslashes become
/// forward slashes and the whole string is lowercased. The extension is
/// left intact.
pub fn normalize_path(raw: &str) -> String {
    raw.replace('\\', "/").to_lowercase()
}

/// Canonicalize a raw wiki-link target into the form stored in
/// `outgoingLinks` before resolution.
///
/// Steps: trim outer whitespace, drop an alias (`[[target|alias]]` keeps
/// only `target`), strip a trailing `#fragment`, normalize separators,
/// lowercase, and append `.md` if the result has no file extension.
///
/// Whitespace-only input normalizes to `.md` — a documented quirk
/// inherited from the alias/fragment-stripping pipeline collapsing to an
/// empty bare name.
pub fn normalize_link_target(raw: &str) -> String {
    let trimmed = raw.trim();
    let before_alias = trimmed.split('|').next().unwrap_or("");
    let without_fragment = match before_alias.find('#') {
        Some(idx) => &before_alias[..idx],
        None => before_alias,
    };
    let slashed = without_fragment.replace('\\', "/");
    let lowered = slashed.to_lowercase();

    if has_file_extension(&lowered) {
        lowered
    } else {
        format!("{lowered}.md")
    }
}

/// A trailing `.xxx` (1-4 chars, at least one letter, not all digits)
/// counts as a file extension. Used to decide whether
/// [`normalize_link_target`] should append `.md`, and by the resolver to
/// strip an extension back off before an index lookup.
pub fn has_file_extension(s: &str) -> bool {
    let Some(dot_idx) = s.rfind('.') else {
        return false;
    };
    let ext = &s[dot_idx + 1..];
    if ext.is_empty() || ext.len() > 4 {
        return false;
    }
    let has_letter = ext.chars().any(|c| c.is_alphabetic());
    let all_digits = ext.chars().all(|c| c.is_ascii_digit());
    has_letter && !all_digits
}

/// If `s` contains spaces xor dashes, return the string with spaces and
/// dashes swapped; otherwise `None`. A last-chance fallback the resolver
/// tries after an exact index lookup fails.
pub fn space_dash_variant(s: &str) -> Option<String> {
    let has_space = s.contains(' ');
    let has_dash = s.contains('-');
    if has_space == has_dash {
        return None;
    }
    if has_space {
        Some(s.replace(' ', "-"))
    } else {
        Some(s.replace('-', " "))
    }
}

/// Strip the extension and any `#fragment` from a normalized link target,
/// yielding the bare key used for title/filename index lookups.
pub fn strip_fragment_and_extension(normalized_target: &str) -> &str {
    let without_fragment = match normalized_target.find('#') {
        Some(idx) => &normalized_target[..idx],
        None => normalized_target,
    };
    match without_fragment.rfind('.') {
        Some(idx) if has_file_extension(without_fragment) => &without_fragment[..idx],
        _ => without_fragment,
    }
}
