//! Format Reader Registry (C2): dispatches file bytes to a parser keyed by
//! extension and folds the result into a [`crate::model::ParseOutcome`].

mod markdown;

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::model::{needs_id_write, ParseOutcome};

pub use markdown::MarkdownReader;

/// Registration-time failure: a reader claims an extension another reader
/// already owns. Registration of a multi-extension reader is atomic — it
/// claims all of its extensions or none.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("extension {extension:?} is already registered to {existing_reader}")]
    ExtensionAlreadyRegistered {
        extension: String,
        existing_reader: &'static str,
    },
}

/// Everything a [`FormatReader`] needs about the file it is parsing, beyond
/// the raw bytes.
#[derive(Debug, Clone)]
pub struct ParseContext<'a> {
    pub absolute_path: &'a str,
    pub relative_path: &'a str,
    pub extension: &'a str,
    pub mtime: i64,
}

/// A capability that turns file bytes into a [`crate::model::NodeDraft`].
pub trait FormatReader: Send + Sync {
    /// Extensions this reader claims, lowercased, without the leading dot.
    fn extensions(&self) -> &[&'static str];

    /// Reader name, used only in diagnostics (e.g. a registration conflict).
    fn name(&self) -> &'static str;

    fn parse(&self, bytes: &[u8], context: &ParseContext<'_>) -> ParseOutcome;
}

/// Extension → reader dispatch table.
#[derive(Default, Clone)]
pub struct FormatRegistry {
    readers: HashMap<String, Arc<dyn FormatReader>>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        FormatRegistry {
            readers: HashMap::new(),
        }
    }

    /// Build the default registry: a markdown reader claiming `.md` and
    /// `.markdown`.
    pub fn with_defaults() -> Self {
        let mut registry = FormatRegistry::new();
        registry
            .register(Arc::new(MarkdownReader))
            .expect("default markdown reader must register cleanly");
        registry
    }

    /// Register `reader` for every extension it claims. Fails atomically —
    /// on the first conflicting extension, no extension from this reader is
    /// registered.
    pub fn register(&mut self, reader: Arc<dyn FormatReader>) -> Result<(), RegistryError> {
        for ext in reader.extensions() {
            let key = ext.to_lowercase();
            if let Some(existing) = self.readers.get(&key) {
                return Err(RegistryError::ExtensionAlreadyRegistered {
                    extension: key,
                    existing_reader: existing.name(),
                });
            }
        }
        for ext in reader.extensions() {
            self.readers.insert(ext.to_lowercase(), reader.clone());
        }
        Ok(())
    }

    pub fn reader_for(&self, extension: &str) -> Option<Arc<dyn FormatReader>> {
        self.readers.get(&extension.to_lowercase()).cloned()
    }

    pub fn parse(&self, bytes: &[u8], context: &ParseContext<'_>) -> Option<ParseOutcome> {
        let reader = self.reader_for(context.extension)?;
        Some(reader.parse(bytes, context))
    }
}

/// Shared by every [`FormatReader`] impl: decide `needsIdWrite` from the
/// frontmatter id field.
pub(crate) fn draft_needs_id_write(id: &Option<String>) -> bool {
    needs_id_write(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeReader {
        exts: &'static [&'static str],
        label: &'static str,
    }

    impl FormatReader for FakeReader {
        fn extensions(&self) -> &[&'static str] {
            self.exts
        }

        fn name(&self) -> &'static str {
            self.label
        }

        fn parse(&self, _bytes: &[u8], _context: &ParseContext<'_>) -> ParseOutcome {
            unimplemented!("fake reader is registration-only in these tests")
        }
    }

    #[test]
    fn default_registry_dispatches_md_and_markdown() {
        let registry = FormatRegistry::with_defaults();
        assert!(registry.reader_for("md").is_some());
        assert!(registry.reader_for("MARKDOWN").is_some());
        assert!(registry.reader_for("txt").is_none());
    }

    #[test]
    fn conflicting_registration_is_atomic() {
        let mut registry = FormatRegistry::with_defaults();
        let conflicting = Arc::new(FakeReader {
            exts: &["txt", "md"],
            label: "fake",
        });
        let err = registry.register(conflicting).unwrap_err();
        match err {
            RegistryError::ExtensionAlreadyRegistered { extension, .. } => {
                assert_eq!(extension, "md");
            }
        }
        // the atomic-or-nothing guarantee: "txt" must not have been claimed
        // by the half-registered fake reader.
        assert!(registry.reader_for("txt").is_none());
    }
}
