/*!
# IO utilities

Documents are read from and written to JSON Lines files, gzipped if their name ends in `.gz`.

- input: one [DocumentRecord](crate::pipelines::types::DocumentRecord) per line,
- output: one [ProcessedDocument](crate::pipelines::types::ProcessedDocument) per line.
!*/
pub mod reader;
pub mod writer;

pub use reader::DocumentReader;
pub use writer::{JsonlWriter, MemorySink, Sink};

use std::path::Path;

/// true if the file name ends with `.gz`.
pub(crate) fn is_gzipped(path: &Path) -> bool {
    path.extension().map(|ext| ext == "gz").unwrap_or(false)
}
