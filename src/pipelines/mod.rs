//! Pipelines.
//!
//! The [Orchestrator] drives a single document through the stages,
//! the [WorkerPool] runs it over a stream of documents, and
//! [CorpusRun] wires both to JSON Lines files through the light [Pipeline] trait.
mod orchestrator;
#[allow(clippy::module_inception)]
mod pipeline;
mod pool;
mod retry;
mod stats;
pub mod types;

pub use orchestrator::Orchestrator;
pub use pipeline::{CorpusRun, Pipeline};
pub use pool::{ShutdownHandle, WorkerPool};
pub use retry::Backoff;
pub use stats::{RunStats, RunSummary};
