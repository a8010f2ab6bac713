//! Retrying shared store operations.
use std::{thread, time::Duration};

use crate::dedup::StoreError;

/// Exponential backoff: `base`, `2*base`, `4*base`... capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    retries: u32,
    base: Duration,
    max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            retries: 3,
            base: Duration::from_millis(10),
            max: Duration::from_secs(1),
        }
    }
}

impl Backoff {
    pub fn new(retries: u32, base: Duration, max: Duration) -> Self {
        Self { retries, base, max }
    }

    pub fn with_retries(retries: u32) -> Self {
        Self {
            retries,
            ..Default::default()
        }
    }

    fn delay(&self, attempt: u32) -> Duration {
        self.base
            .checked_mul(1u32 << attempt.min(16))
            .map(|d| d.min(self.max))
            .unwrap_or(self.max)
    }

    /// Run `op`, retrying up to `retries` more times while it fails.
    ///
    /// `on_retry` is called before each retry. The last error is returned.
    pub fn run<T>(
        &self,
        mut op: impl FnMut() -> Result<T, StoreError>,
        mut on_retry: impl FnMut(u32, &StoreError),
    ) -> Result<T, StoreError> {
        let mut attempt = 0;
        loop {
            match op() {
                Ok(v) => return Ok(v),
                Err(e) if attempt < self.retries => {
                    on_retry(attempt + 1, &e);
                    thread::sleep(self.delay(attempt));
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
