//! Document being processed.
use super::{
    BlockLabel, BlockMark, BlockVerdict, DocumentRecord, DocumentVerdict, ProcessedDocument,
    Reason, Stage,
};
use crate::identifiers::Identification;

/// A [DocumentRecord] and the annotations accumulated while it goes through the stages.
///
/// The record itself is never modified: block annotations live in a parallel vector.
#[derive(Debug, Clone)]
pub struct Document {
    record: DocumentRecord,
    normalized: String,
    blocks: Vec<BlockVerdict>,
    stage: Stage,
    identification: Option<Identification>,
    quality: Option<f32>,
    duplicate_of: Option<String>,
    annotations: Vec<String>,
}

impl Document {
    pub fn new(record: DocumentRecord) -> Self {
        let normalized = record.normalized_text();
        let blocks = vec![BlockVerdict::default(); record.blocks().len()];
        Self {
            record,
            normalized,
            blocks,
            stage: Stage::Received,
            identification: None,
            quality: None,
            duplicate_of: None,
            annotations: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        self.record.id()
    }

    pub fn record(&self) -> &DocumentRecord {
        &self.record
    }

    /// Normalized text of the whole document.
    pub fn text(&self) -> &str {
        &self.normalized
    }

    pub fn blocks(&self) -> &[BlockVerdict] {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut [BlockVerdict] {
        &mut self.blocks
    }

    /// Record blocks zipped with their annotations.
    pub fn annotated_blocks(&self) -> impl Iterator<Item = (&super::Block, &BlockVerdict)> {
        self.record.blocks().iter().zip(self.blocks.iter())
    }

    /// Lines of the blocks that are neither boilerplate nor marked for removal.
    pub fn content_lines(&self) -> impl Iterator<Item = &str> {
        self.annotated_blocks()
            .filter(|(_, verdict)| verdict.is_retained())
            .flat_map(|(block, _)| block.normalized_lines())
    }

    /// Mark every block.
    pub fn mark_all(&mut self, mark: BlockMark) {
        for block in self.blocks.iter_mut() {
            block.mark(mark);
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub(crate) fn advance(&mut self, stage: Stage) {
        debug_assert!(stage > self.stage);
        self.stage = stage;
    }

    pub fn identification(&self) -> Option<&Identification> {
        self.identification.as_ref()
    }

    pub fn set_identification(&mut self, identification: Identification) {
        self.identification = Some(identification);
    }

    pub fn quality(&self) -> Option<f32> {
        self.quality
    }

    pub fn set_quality(&mut self, quality: f32) {
        self.quality = Some(quality);
    }

    pub fn duplicate_of(&self) -> Option<&str> {
        self.duplicate_of.as_deref()
    }

    pub fn set_duplicate_of(&mut self, id: String) {
        self.duplicate_of = Some(id);
    }

    pub fn annotations(&self) -> &[String] {
        &self.annotations
    }

    /// Add an annotation (once).
    pub fn add_annotation(&mut self, annotation: &str) {
        if !self.annotations.iter().any(|a| a == annotation) {
            self.annotations.push(annotation.to_string());
        }
    }

    /// Freeze into a verdict, leaving the record untouched.
    pub fn into_processed(self, keep: bool, reason: Reason) -> ProcessedDocument {
        self.into_processed_with(keep, reason, |record, _| record)
    }

    /// Freeze into a verdict, letting `rebuild` produce the emitted record
    /// from the original one and the block annotations.
    pub fn into_processed_with<F>(self, keep: bool, reason: Reason, rebuild: F) -> ProcessedDocument
    where
        F: FnOnce(DocumentRecord, &[BlockVerdict]) -> DocumentRecord,
    {
        let stage = if keep { Stage::Verdicted } else { self.stage };
        let record = rebuild(self.record, &self.blocks);
        let verdict = DocumentVerdict::new(
            record.id().to_string(),
            keep,
            reason,
            stage,
            self.blocks,
            self.identification,
            self.quality,
            self.duplicate_of,
            self.annotations,
        );

        ProcessedDocument::new(verdict, record)
    }

    /// Number of blocks carrying a label.
    pub fn count_label(&self, label: BlockLabel) -> usize {
        self.blocks.iter().filter(|b| b.label() == label).count()
    }
}
