//! Annotate trait
use crate::pipelines::types::Document;

/// Annotations provide contextual information about content.
pub trait Annotate {
    fn annotate(&self, doc: &mut Document);
}

/// Annotator enables annotation chaining, adding multiple annotators and
/// doing the annotation process in one step.
pub struct Annotator(Vec<Box<dyn Annotate + Send + Sync>>);

impl Annotator {
    pub fn add(&mut self, annotator: Box<dyn Annotate + Send + Sync>) -> &mut Annotator {
        self.0.push(annotator);
        self
    }

    /// `tiny`, `noisy` and `header`/`footer` annotators.
    pub fn with_defaults() -> Self {
        let mut annotator = Self::default();
        annotator
            .add(Box::<super::TinyDocument>::default())
            .add(Box::<super::Noisy>::default())
            .add(Box::<super::Header>::default());
        annotator
    }
}

impl Annotate for Annotator {
    fn annotate(&self, doc: &mut Document) {
        for annotator in &self.0 {
            annotator.annotate(doc);
        }
    }
}

impl Default for Annotator {
    fn default() -> Self {
        Self(vec![])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipelines::types::{BlockLabel, DocumentRecord};

    #[test]
    fn chain() {
        let mut doc = Document::new(DocumentRecord::from_text("id", "//// ////\n---"));
        for block in doc.blocks_mut() {
            block.set_label(BlockLabel::Content);
        }
        Annotator::with_defaults().annotate(&mut doc);
        assert!(doc.annotations().contains(&"tiny".to_string()));
        assert!(doc.annotations().contains(&"noisy".to_string()));
    }
}
