//! Types flowing through the pipeline.
mod document;
mod record;
mod verdict;

pub use document::Document;
pub use record::{Block, DocumentRecord};
pub use verdict::{
    BlockLabel, BlockMark, BlockVerdict, DocumentVerdict, ProcessedDocument, Reason, Stage,
};
