/*! Worker pool.

Documents are pulled from the input iterator by a fixed number of rayon workers,
each one processing a document through every stage before taking the next one.
Output order is unspecified.

A [ShutdownHandle] stops the intake: documents already taken are finished and emitted,
then the sink is finished and the index is checkpointed.
!*/
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use rayon::prelude::*;

use super::orchestrator::Orchestrator;
use super::stats::RunSummary;
use super::types::{DocumentRecord, Reason, Stage};
use crate::error::Error;
use crate::io::Sink;
use crate::transformers::LineFrequencyTable;

/// Cloneable flag telling the pool to stop taking new documents.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct WorkerPool {
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    /// Build a pool of `workers` threads (one per core if `None`).
    pub fn new(workers: Option<usize>) -> Result<Self, Error> {
        let mut builder =
            rayon::ThreadPoolBuilder::new().thread_name(|idx| format!("rexfilter-worker-{idx}"));
        if let Some(workers) = workers {
            builder = builder.num_threads(workers);
        }
        let pool = builder.build()?;
        info!("using {} workers", pool.current_num_threads());
        Ok(Self { pool })
    }

    pub fn current_num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Process every record, sending results to `sink`.
    ///
    /// Unreadable records are counted as malformed. Input io errors and sink errors
    /// stop the intake and are returned once in-flight documents are done.
    /// Fails with [Error::RunFailed] when the share of errored documents is too high.
    pub fn run<I, S>(
        &self,
        orchestrator: &Orchestrator,
        records: I,
        sink: &S,
        shutdown: &ShutdownHandle,
    ) -> Result<RunSummary, Error>
    where
        I: Iterator<Item = Result<DocumentRecord, Error>> + Send,
        S: Sink,
    {
        let fatal: Mutex<Option<Error>> = Mutex::new(None);
        let stop = |e: Error| {
            error!("stopping intake: {}", e);
            shutdown.trigger();
            if let Ok(mut fatal) = fatal.lock() {
                fatal.get_or_insert(e);
            }
        };

        self.pool.install(|| {
            records
                .take_while(|_| !shutdown.is_triggered())
                .par_bridge()
                .for_each_init(
                    || LineFrequencyTable::batch(orchestrator.frequencies()),
                    |batch, record| match record {
                        Ok(record) => {
                            let processed = orchestrator.process_with(record, batch);
                            if let Err(e) = sink.emit(processed) {
                                stop(e);
                            }
                        }
                        Err(Error::Serde(e)) => {
                            debug!("skipping unreadable record: {}", e);
                            orchestrator
                                .stats()
                                .record(Stage::Received, Reason::Malformed, false);
                        }
                        Err(e) => stop(e),
                    },
                );
        });

        if shutdown.is_triggered() {
            warn!(
                "intake stopped after {} documents",
                orchestrator.stats().processed()
            );
        }

        sink.finish()?;
        let nb_checkpointed = orchestrator.checkpoint()?;
        debug!("final checkpoint: {nb_checkpointed} index entries");

        let fatal = match fatal.into_inner() {
            Ok(fatal) => fatal,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(e) = fatal {
            return Err(e);
        }

        let summary = orchestrator.stats().summary();
        info!(
            "processed {} documents: {} kept, {} errored",
            summary.processed, summary.kept, summary.errored
        );
        orchestrator
            .stats()
            .check(orchestrator.config().max_error_rate)?;
        Ok(summary)
    }
}
