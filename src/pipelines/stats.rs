//! Run statistics.
use std::sync::atomic::{AtomicUsize, Ordering};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::pipelines::types::{Reason, Stage};

/// Counters shared by every worker.
#[derive(Debug, Default)]
pub struct RunStats {
    processed: AtomicUsize,
    kept: AtomicUsize,
    block_errors: AtomicUsize,
    retries: AtomicUsize,
    reached: [AtomicUsize; Stage::ALL.len()],
    reasons: [AtomicUsize; Reason::ALL.len()],
}

/// Snapshot of [RunStats].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RunSummary {
    pub processed: usize,
    pub kept: usize,
    pub errored: usize,
    pub block_errors: usize,
    pub retries: usize,
    /// number of documents having reached each stage
    pub stages: Vec<(Stage, usize)>,
    /// number of documents per final reason
    pub reasons: Vec<(Reason, usize)>,
}

impl RunSummary {
    pub fn reason(&self, reason: Reason) -> usize {
        self.reasons
            .iter()
            .find(|(r, _)| *r == reason)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    pub fn stage(&self, stage: Stage) -> usize {
        self.stages
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of a document. `stage` is the last stage it reached.
    pub fn record(&self, stage: Stage, reason: Reason, keep: bool) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        if keep {
            self.kept.fetch_add(1, Ordering::Relaxed);
        }
        for reached in &self.reached[..=stage.index()] {
            reached.fetch_add(1, Ordering::Relaxed);
        }
        self.reasons[reason.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_block_errors(&self, nb: usize) {
        self.block_errors.fetch_add(nb, Ordering::Relaxed);
    }

    pub fn add_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn errored(&self) -> usize {
        self.reasons[Reason::Errored.index()].load(Ordering::Relaxed)
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            processed: self.processed(),
            kept: self.kept.load(Ordering::Relaxed),
            errored: self.errored(),
            block_errors: self.block_errors.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            stages: Stage::ALL
                .iter()
                .map(|s| (*s, self.reached[s.index()].load(Ordering::Relaxed)))
                .collect(),
            reasons: Reason::ALL
                .iter()
                .map(|r| (*r, self.reasons[r.index()].load(Ordering::Relaxed)))
                .collect(),
        }
    }

    /// Fail if the share of errored documents exceeds `max_error_rate`.
    pub fn check(&self, max_error_rate: f64) -> Result<(), Error> {
        let processed = self.processed();
        let errored = self.errored();
        if processed > 0 && errored as f64 / processed as f64 > max_error_rate {
            return Err(Error::RunFailed { errored, processed });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts() {
        let stats = RunStats::new();
        stats.record(Stage::Verdicted, Reason::Kept, true);
        stats.record(Stage::ExactDupChecked, Reason::ExactDuplicate, false);
        stats.record(Stage::Received, Reason::TooShort, false);

        let summary = stats.summary();
        assert_eq!(summary.processed, 3);
        assert_eq!(summary.kept, 1);
        assert_eq!(summary.stage(Stage::Received), 3);
        assert_eq!(summary.stage(Stage::ExactDupChecked), 2);
        assert_eq!(summary.stage(Stage::LanguageChecked), 1);
        assert_eq!(summary.stage(Stage::Verdicted), 1);
        assert_eq!(summary.reason(Reason::ExactDuplicate), 1);
        assert_eq!(summary.reason(Reason::NearDuplicate), 0);
    }

    #[test]
    fn error_rate() {
        let stats = RunStats::new();
        assert!(stats.check(0.05).is_ok());
        for _ in 0..19 {
            stats.record(Stage::Verdicted, Reason::Kept, true);
        }
        stats.record(Stage::ExactDupChecked, Reason::Errored, false);
        // 1/20 is not above 5%
        assert!(stats.check(0.05).is_ok());

        stats.record(Stage::ExactDupChecked, Reason::Errored, false);
        match stats.check(0.05) {
            Err(Error::RunFailed { errored, processed }) => {
                assert_eq!(errored, 2);
                assert_eq!(processed, 21);
            }
            other => panic!("expected run failure, got {:?}", other),
        }
    }
}
