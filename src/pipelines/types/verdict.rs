//! Pipeline decisions.
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::DocumentRecord;
use crate::identifiers::Identification;

/// Processing stages, in order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Received,
    ExactDupChecked,
    LanguageChecked,
    NearDupChecked,
    BoilerplateLabeled,
    InDocDeduped,
    QualityAssessed,
    Verdicted,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::Received,
        Stage::ExactDupChecked,
        Stage::LanguageChecked,
        Stage::NearDupChecked,
        Stage::BoilerplateLabeled,
        Stage::InDocDeduped,
        Stage::QualityAssessed,
        Stage::Verdicted,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Why a document has been kept or not.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    Kept,
    Malformed,
    TooShort,
    UrlFiltered,
    ExactDuplicate,
    NearDuplicate,
    Language,
    LowQuality,
    /// infrastructure failure (store timeout, io error)
    Errored,
}

impl Reason {
    pub const ALL: [Reason; 9] = [
        Reason::Kept,
        Reason::Malformed,
        Reason::TooShort,
        Reason::UrlFiltered,
        Reason::ExactDuplicate,
        Reason::NearDuplicate,
        Reason::Language,
        Reason::LowQuality,
        Reason::Errored,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BlockLabel {
    Content,
    Boilerplate,
    /// not classified yet, or classification failed
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BlockMark {
    /// repeats an earlier block of the same document
    Duplicate,
    /// the whole document is a near duplicate of an earlier one
    NearDuplicate,
    /// confidently in another language than the target
    ForeignLanguage,
}

/// Annotations of a single block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BlockVerdict {
    label: BlockLabel,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    marks: Vec<BlockMark>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    identification: Option<Identification>,
}

impl Default for BlockVerdict {
    fn default() -> Self {
        Self {
            label: BlockLabel::Unknown,
            marks: Vec::new(),
            identification: None,
        }
    }
}

impl BlockVerdict {
    pub fn label(&self) -> BlockLabel {
        self.label
    }

    pub fn set_label(&mut self, label: BlockLabel) {
        self.label = label;
    }

    pub fn marks(&self) -> &[BlockMark] {
        &self.marks
    }

    pub fn has_mark(&self, mark: BlockMark) -> bool {
        self.marks.contains(&mark)
    }

    /// Add a mark. Marks are kept sorted and unique.
    pub fn mark(&mut self, mark: BlockMark) {
        if let Err(pos) = self.marks.binary_search(&mark) {
            self.marks.insert(pos, mark);
        }
    }

    pub fn identification(&self) -> Option<&Identification> {
        self.identification.as_ref()
    }

    pub fn set_identification(&mut self, identification: Option<Identification>) {
        self.identification = identification;
    }

    /// true if the block survives pruning.
    ///
    /// Near duplicate marks apply to the whole document and do not remove blocks.
    pub fn is_retained(&self) -> bool {
        self.label != BlockLabel::Boilerplate
            && !self.has_mark(BlockMark::Duplicate)
            && !self.has_mark(BlockMark::ForeignLanguage)
    }
}

/// Final decision about a document.
///
/// Created once, when the document leaves the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DocumentVerdict {
    id: String,
    keep: bool,
    reason: Reason,
    /// last stage the document went through
    stage: Stage,
    blocks: Vec<BlockVerdict>,
    identification: Option<Identification>,
    quality: Option<f32>,
    duplicate_of: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    annotations: Vec<String>,
}

impl DocumentVerdict {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: String,
        keep: bool,
        reason: Reason,
        stage: Stage,
        blocks: Vec<BlockVerdict>,
        identification: Option<Identification>,
        quality: Option<f32>,
        duplicate_of: Option<String>,
        annotations: Vec<String>,
    ) -> Self {
        Self {
            id,
            keep,
            reason,
            stage,
            blocks,
            identification,
            quality,
            duplicate_of,
            annotations,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn keep(&self) -> bool {
        self.keep
    }

    pub fn reason(&self) -> Reason {
        self.reason
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn blocks(&self) -> &[BlockVerdict] {
        &self.blocks
    }

    pub fn identification(&self) -> Option<&Identification> {
        self.identification.as_ref()
    }

    pub fn quality(&self) -> Option<f32> {
        self.quality
    }

    pub fn duplicate_of(&self) -> Option<&str> {
        self.duplicate_of.as_deref()
    }

    pub fn annotations(&self) -> &[String] {
        &self.annotations
    }

    pub fn has_annotation(&self, annotation: &str) -> bool {
        self.annotations.iter().any(|a| a == annotation)
    }
}

/// What goes downstream: the verdict and the (possibly pruned and repaired) record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProcessedDocument {
    verdict: DocumentVerdict,
    record: DocumentRecord,
}

impl ProcessedDocument {
    pub fn new(verdict: DocumentVerdict, record: DocumentRecord) -> Self {
        Self { verdict, record }
    }

    pub fn verdict(&self) -> &DocumentVerdict {
        &self.verdict
    }

    pub fn record(&self) -> &DocumentRecord {
        &self.record
    }

    pub fn into_parts(self) -> (DocumentVerdict, DocumentRecord) {
        (self.verdict, self.record)
    }

    /// JSON schema of the output format.
    pub fn get_schema() -> Result<String, crate::error::Error> {
        serde_json::to_string_pretty(&schemars::schema_for!(Self)).map_err(Into::into)
    }
}
