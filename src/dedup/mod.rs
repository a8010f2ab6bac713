/*! Duplicate detection.

- [fingerprint]: exact duplicates across the corpus, by SHA-256 of the normalized text.
- [minhash] and [index]: near duplicates across the corpus, by MinHash/LSH.
- [indoc]: repeated blocks inside a single document.

Corpus-wide structures only store hashes and signatures, never text.
!*/
use std::{
    fmt,
    sync::TryLockResult,
    thread,
    time::{Duration, Instant},
};

pub mod fingerprint;
pub mod index;
pub mod indoc;
pub mod minhash;

pub use fingerprint::{ContentFingerprint, FingerprintStore, Insertion, ShardedFingerprintStore};
pub use index::{Match, ShingleIndex};
pub use indoc::InDocDedup;
pub use minhash::{MinHasher, Shingler, Signature};

/// Failure of a shared store operation.
///
/// These are transient from the point of view of a document: the call can be retried.
#[derive(Debug)]
pub enum StoreError {
    /// lock could not be acquired in time
    Timeout(Duration),
    /// a thread panicked while holding the lock
    Poisoned,
    Io(std::io::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Timeout(d) => write!(f, "lock not acquired after {}ms", d.as_millis()),
            StoreError::Poisoned => write!(f, "poisoned lock"),
            StoreError::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> StoreError {
        StoreError::Io(e)
    }
}

/// Repeatedly try to get a lock guard until `timeout` elapses.
pub(crate) fn acquire<G>(
    timeout: Duration,
    mut try_acquire: impl FnMut() -> TryLockResult<G>,
) -> Result<G, StoreError> {
    let deadline = Instant::now() + timeout;
    let mut wait = Duration::from_micros(5);
    loop {
        match try_acquire() {
            Ok(guard) => return Ok(guard),
            Err(std::sync::TryLockError::Poisoned(_)) => return Err(StoreError::Poisoned),
            Err(std::sync::TryLockError::WouldBlock) => {
                if Instant::now() >= deadline {
                    return Err(StoreError::Timeout(timeout));
                }
                thread::sleep(wait);
                wait = (wait * 2).min(Duration::from_millis(2));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::{acquire, StoreError};

    #[test]
    fn acquire_free_lock() {
        let m = Mutex::new(1);
        let guard = acquire(Duration::from_millis(10), || m.try_lock()).unwrap();
        assert_eq!(*guard, 1);
    }

    #[test]
    fn acquire_times_out() {
        let m = Mutex::new(1);
        let _held = m.lock().unwrap();
        let res = acquire(Duration::from_millis(20), || m.try_lock());
        assert!(matches!(res, Err(StoreError::Timeout(_))));
    }

    #[test]
    fn acquire_poisoned() {
        let m = Arc::new(Mutex::new(1));
        let m2 = m.clone();
        let _ = std::thread::spawn(move || {
            let _guard = m2.lock().unwrap();
            panic!("poisoning");
        })
        .join();
        let res = acquire(Duration::from_millis(10), || m.try_lock());
        assert!(matches!(res, Err(StoreError::Poisoned)));
    }
}
