//! Stable node identifiers and deterministic ghost ids (C3).

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use sha2::{Digest, Sha256};

const ID_LEN: usize = 12;
const ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";
const GHOST_PREFIX: &str = "ghost_";

/// Generate a fresh 12-character id from the url-safe alphabet, drawn from
/// the thread-local CSPRNG.
pub fn generate_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..ID_ALPHABET.len());
            ID_ALPHABET[idx] as char
        })
        .collect()
}

/// True iff `s` is exactly 12 characters, all drawn from the id alphabet.
pub fn is_valid_id(s: &str) -> bool {
    s.chars().count() == ID_LEN
        && s.bytes().all(|b| ID_ALPHABET.contains(&b))
}

/// Collapse runs of interior whitespace to a single space, after trimming
/// the ends. Shared by ghost-id hashing and title-index key derivation so
/// both treat "Other   Note" and "Other Note" identically.
pub fn collapse_inner_whitespace(s: &str) -> String {
    s.trim().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Deterministic ghost id for an unresolved link target: `ghost_` followed
/// by the first 12 base64url characters of a SHA-256 hash over the
/// lowercased, whitespace-collapsed title. Same title always yields the
/// same ghost id, in this process or any other.
pub fn ghost_id(title: &str) -> String {
    let normalized = collapse_inner_whitespace(title).to_lowercase();
    let digest = Sha256::digest(normalized.as_bytes());
    let encoded = URL_SAFE_NO_PAD.encode(digest);
    format!("{GHOST_PREFIX}{}", &encoded[..ID_LEN])
}

/// True iff `s` carries the ghost-id prefix.
pub fn is_ghost_id(s: &str) -> bool {
    s.starts_with(GHOST_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_valid_and_unique() {
        let a = generate_id();
        let b = generate_id();
        assert!(is_valid_id(&a));
        assert!(is_valid_id(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn valid_id_rejects_wrong_length_and_alphabet() {
        assert!(!is_valid_id("short"));
        assert!(!is_valid_id("abc123def456extra"));
        assert!(!is_valid_id("abc123def45!")); // 12 chars, bad char
        assert!(!is_valid_id("notes/page.m")); // path-shaped
    }

    #[test]
    fn ghost_id_is_deterministic_and_case_insensitive() {
        let a = ghost_id("Other Note");
        let b = ghost_id("  other   note  ");
        assert_eq!(a, b);
        assert!(is_ghost_id(&a));
        assert!(!is_valid_id(&a));
    }

    #[test]
    fn ghost_id_never_collides_with_real_id_alphabet_check() {
        let g = ghost_id("anything");
        assert!(g.starts_with("ghost_"));
        assert!(!is_valid_id(&g));
    }

    #[test]
    fn different_titles_yield_different_ghosts() {
        assert_ne!(ghost_id("Alpha"), ghost_id("Beta"));
    }
}
