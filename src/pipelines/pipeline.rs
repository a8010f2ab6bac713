//! Pipeline trait and corpus run.
use std::path::PathBuf;

use super::orchestrator::Orchestrator;
use super::pool::{ShutdownHandle, WorkerPool};
use super::stats::RunSummary;
use crate::config::Config;
use crate::error::Error;
use crate::io::{DocumentReader, JsonlWriter};

/// This trait must be implemented for each Pipeline,
/// and is generic over the return type so that
/// any custom pipeline that needs a return type can use the
/// trait as well.
pub trait Pipeline<T> {
    fn run(&self) -> Result<T, Error>;
}

/// Filter a JSON Lines file of records into a JSON Lines file of processed documents.
pub struct CorpusRun {
    src: PathBuf,
    dst: PathBuf,
    config: Config,
    kept_only: bool,
    shutdown: ShutdownHandle,
}

impl CorpusRun {
    pub fn new(src: PathBuf, dst: PathBuf, config: Config) -> Self {
        Self {
            src,
            dst,
            config,
            kept_only: false,
            shutdown: ShutdownHandle::new(),
        }
    }

    /// Only write kept documents.
    pub fn kept_only(mut self, kept_only: bool) -> Self {
        self.kept_only = kept_only;
        self
    }

    /// Handle that stops the run gracefully when triggered.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }
}

impl Pipeline<RunSummary> for CorpusRun {
    fn run(&self) -> Result<RunSummary, Error> {
        info!("filtering {:?} into {:?}", self.src, self.dst);
        debug!("configuration: {:#?}", self.config);

        let orchestrator = Orchestrator::from_config(self.config.clone())?;
        let pool = WorkerPool::new(self.config.workers)?;

        if let Some(parent) = self.dst.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                warn!("destination folder does not exist. Creating {:?}", parent);
                std::fs::create_dir_all(parent)?;
            }
        }

        let reader = DocumentReader::open(&self.src)?;
        let writer = JsonlWriter::create(&self.dst, self.kept_only)?;
        pool.run(&orchestrator, reader, &writer, &self.shutdown)
    }
}
