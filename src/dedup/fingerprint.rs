/*! Exact duplicate detection.

A [ContentFingerprint] is the SHA-256 digest of the normalized document text.
The [ShardedFingerprintStore] keeps every fingerprint seen so far, split in shards
selected by the fingerprint prefix so that workers rarely contend for the same lock.

When backed by a state directory, every new fingerprint is appended to
`fingerprints.bin` (32 byte records) before being reported as new.
The journal is replayed when the store is opened again.
!*/
use std::{
    collections::HashSet,
    fmt,
    fs::{File, OpenOptions},
    io::{BufReader, BufWriter, ErrorKind, Read, Write},
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};

use sha2::{Digest, Sha256};

use super::{acquire, StoreError};
use crate::error::Error;

pub const FINGERPRINT_LEN: usize = 32;
pub const JOURNAL_FILE: &str = "fingerprints.bin";

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentFingerprint([u8; FINGERPRINT_LEN]);

impl ContentFingerprint {
    /// Fingerprint of an already normalized text.
    pub fn of_text(text: &str) -> Self {
        let digest = Sha256::digest(text.as_bytes());
        let mut bytes = [0u8; FINGERPRINT_LEN];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    /// shard index, from the first 8 bytes.
    fn shard(&self, nb_shards: usize) -> usize {
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&self.0[..8]);
        (u64::from_be_bytes(prefix) as usize) & (nb_shards - 1)
    }
}

impl fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentFingerprint({self})")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    New,
    Duplicate,
}

/// Set of fingerprints with an atomic test-and-insert.
pub trait FingerprintStore: Send + Sync {
    /// Insert the fingerprint if absent.
    ///
    /// Over a whole run, at most one call per fingerprint returns [Insertion::New].
    fn check_and_insert(&self, fingerprint: &ContentFingerprint) -> Result<Insertion, StoreError>;

    /// Number of distinct fingerprints.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct ShardedFingerprintStore {
    shards: Vec<Mutex<HashSet<ContentFingerprint>>>,
    journal: Option<Mutex<BufWriter<File>>>,
    timeout: Duration,
}

impl ShardedFingerprintStore {
    /// Create a store that lives in memory only.
    ///
    /// `nb_shards` has to be a power of two.
    pub fn in_memory(nb_shards: usize, timeout: Duration) -> Self {
        let nb_shards = nb_shards.max(1).next_power_of_two();
        Self {
            shards: (0..nb_shards).map(|_| Mutex::new(HashSet::new())).collect(),
            journal: None,
            timeout,
        }
    }

    /// Open (or create) a journaled store in `dir`, replaying existing fingerprints.
    pub fn open(dir: &Path, nb_shards: usize, timeout: Duration) -> Result<Self, Error> {
        std::fs::create_dir_all(dir)?;
        let path = Self::journal_path(dir);

        let mut store = Self::in_memory(nb_shards, timeout);
        if path.exists() {
            let replayed = store.replay(&path)?;
            info!("replayed {replayed} fingerprints from {:?}", path);
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        store.journal = Some(Mutex::new(BufWriter::new(file)));
        Ok(store)
    }

    pub fn journal_path(dir: &Path) -> PathBuf {
        dir.join(JOURNAL_FILE)
    }

    /// Load fingerprints from a journal.
    /// A trailing partial record (interrupted write) is truncated away.
    fn replay(&mut self, path: &Path) -> Result<usize, Error> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        let valid_len = len - len % FINGERPRINT_LEN as u64;

        let mut reader = BufReader::new(file.take(valid_len));
        let mut buf = [0u8; FINGERPRINT_LEN];
        let mut nb_records = 0;
        loop {
            match reader.read_exact(&mut buf) {
                Ok(()) => {
                    let fingerprint = ContentFingerprint::from_bytes(buf);
                    let shard = fingerprint.shard(self.shards.len());
                    // not shared yet: no need to lock
                    if let Ok(set) = self.shards[shard].get_mut() {
                        set.insert(fingerprint);
                    }
                    nb_records += 1;
                }
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }
        }

        if valid_len != len {
            warn!(
                "{:?}: truncating {} trailing bytes of a partial record",
                path,
                len - valid_len
            );
            OpenOptions::new().write(true).open(path)?.set_len(valid_len)?;
        }

        Ok(nb_records)
    }

    /// Write a fingerprint to the journal, if any.
    fn journal(&self, fingerprint: &ContentFingerprint) -> Result<(), StoreError> {
        if let Some(journal) = &self.journal {
            let mut journal = acquire(self.timeout, || journal.try_lock())?;
            journal.write_all(fingerprint.as_bytes())?;
            journal.flush()?;
        }
        Ok(())
    }
}

impl FingerprintStore for ShardedFingerprintStore {
    fn check_and_insert(&self, fingerprint: &ContentFingerprint) -> Result<Insertion, StoreError> {
        let shard = &self.shards[fingerprint.shard(self.shards.len())];
        let mut set = acquire(self.timeout, || shard.try_lock())?;

        if set.contains(fingerprint) {
            return Ok(Insertion::Duplicate);
        }

        // journal first: a failed write leaves the fingerprint absent so the call can be retried.
        self.journal(fingerprint)?;
        set.insert(*fingerprint);
        Ok(Insertion::New)
    }

    fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| match shard.lock() {
                Ok(set) => set.len(),
                Err(poisoned) => poisoned.into_inner().len(),
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use std::{fs::OpenOptions, io::Write, time::Duration};

    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(1);

    #[test]
    fn equal_text_equal_fingerprint() {
        let a = ContentFingerprint::of_text("Hallo Welt");
        let b = ContentFingerprint::of_text("Hallo Welt");
        let c = ContentFingerprint::of_text("Hallo Welt!");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string().len(), 64);
    }

    #[test]
    fn check_and_insert() {
        let store = ShardedFingerprintStore::in_memory(4, TIMEOUT);
        let fp = ContentFingerprint::of_text("text");
        assert_eq!(store.check_and_insert(&fp).unwrap(), Insertion::New);
        assert_eq!(store.check_and_insert(&fp).unwrap(), Insertion::Duplicate);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn shards_rounded_to_power_of_two() {
        let store = ShardedFingerprintStore::in_memory(6, TIMEOUT);
        assert_eq!(store.shards.len(), 8);
        for i in 0..100 {
            let fp = ContentFingerprint::of_text(&i.to_string());
            store.check_and_insert(&fp).unwrap();
        }
        assert_eq!(store.len(), 100);
    }

    #[test]
    fn journal_replay() {
        let dir = tempfile::tempdir().unwrap();
        let fp_a = ContentFingerprint::of_text("a");
        let fp_b = ContentFingerprint::of_text("b");
        {
            let store = ShardedFingerprintStore::open(dir.path(), 4, TIMEOUT).unwrap();
            assert_eq!(store.check_and_insert(&fp_a).unwrap(), Insertion::New);
            assert_eq!(store.check_and_insert(&fp_b).unwrap(), Insertion::New);
        }

        let store = ShardedFingerprintStore::open(dir.path(), 4, TIMEOUT).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.check_and_insert(&fp_a).unwrap(), Insertion::Duplicate);
        assert_eq!(
            std::fs::metadata(ShardedFingerprintStore::journal_path(dir.path()))
                .unwrap()
                .len(),
            2 * FINGERPRINT_LEN as u64
        );
    }

    #[test]
    fn journal_partial_record_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let fp = ContentFingerprint::of_text("a");
        {
            let store = ShardedFingerprintStore::open(dir.path(), 4, TIMEOUT).unwrap();
            store.check_and_insert(&fp).unwrap();
        }
        let path = ShardedFingerprintStore::journal_path(dir.path());
        OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap()
            .write_all(&[1, 2, 3])
            .unwrap();

        let store = ShardedFingerprintStore::open(dir.path(), 4, TIMEOUT).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(
            std::fs::metadata(&path).unwrap().len(),
            FINGERPRINT_LEN as u64
        );
    }

    #[test]
    fn timeout_when_shard_held() {
        let store = ShardedFingerprintStore::in_memory(1, Duration::from_millis(20));
        let fp = ContentFingerprint::of_text("a");
        let _held = store.shards[0].lock().unwrap();
        assert!(matches!(
            store.check_and_insert(&fp),
            Err(StoreError::Timeout(_))
        ));
    }
}
