use crate::pipelines::types::Document;

use super::Annotate;

/// Flags documents with fewer than `threshold` content lines.
pub struct TinyDocument {
    threshold: usize,
}

impl Annotate for TinyDocument {
    fn annotate(&self, doc: &mut Document) {
        if doc.content_lines().count() < self.threshold {
            doc.add_annotation("tiny")
        }
    }
}

impl Default for TinyDocument {
    fn default() -> Self {
        Self { threshold: 5 }
    }
}
