//! Exact duplicate detection under concurrency.
use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use rayon::prelude::*;
use rexfilter::dedup::{ContentFingerprint, FingerprintStore, Insertion, ShardedFingerprintStore};

const NB_DISTINCT: usize = 500;
const NB_COPIES: usize = 8;

fn texts() -> Vec<String> {
    (0..NB_DISTINCT * NB_COPIES)
        .map(|i| format!("Dokument Nummer {}", i % NB_DISTINCT))
        .collect()
}

fn insert_all(store: &dyn FingerprintStore) -> usize {
    let nb_new = AtomicUsize::new(0);
    texts().par_iter().for_each(|text| {
        match store
            .check_and_insert(&ContentFingerprint::of_text(text))
            .unwrap()
        {
            Insertion::New => {
                nb_new.fetch_add(1, Ordering::Relaxed);
            }
            Insertion::Duplicate => (),
        }
    });
    nb_new.into_inner()
}

#[test_log::test]
fn one_new_per_fingerprint() {
    let store = ShardedFingerprintStore::in_memory(16, Duration::from_secs(5));
    assert_eq!(insert_all(&store), NB_DISTINCT);
    assert_eq!(store.len(), NB_DISTINCT);
}

#[test_log::test]
fn journal_survives_concurrent_writes() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = ShardedFingerprintStore::open(dir.path(), 4, Duration::from_secs(5)).unwrap();
        assert_eq!(insert_all(&store), NB_DISTINCT);
    }

    let journal = ShardedFingerprintStore::journal_path(dir.path());
    assert_eq!(
        std::fs::metadata(&journal).unwrap().len() as usize,
        NB_DISTINCT * 32
    );

    let store = ShardedFingerprintStore::open(dir.path(), 4, Duration::from_secs(5)).unwrap();
    assert_eq!(store.len(), NB_DISTINCT);
    assert_eq!(insert_all(&store), 0);
}
