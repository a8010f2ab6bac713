/*! Near duplicate index.

MinHash signatures are split in `num_bands` bands of `num_perm / num_bands` rows.
Each band is hashed into a bucket; two documents become candidates when they share
at least one bucket, and are then compared slot by slot.

Entries are numbered in insertion order, which is also the order in which
matches are reported (first seen first).

# Persistence

When the index has a state directory, [ShingleIndex::checkpoint] writes the entries
inserted since the last checkpoint to a new snappy-compressed avro segment
(`index/segment-000000.avro`, `index/segment-000001.avro`...).
Segments are loaded back in order by [ShingleIndex::open].
Only the document id and the signature are stored.

The index lock is only held to copy the pending entries and to record the
written segment, never while the segment is being written.
!*/
use std::{
    collections::HashMap,
    fs::File,
    hash::Hasher,
    io::BufReader,
    path::{Path, PathBuf},
    sync::{Mutex, RwLock},
    time::Duration,
};

use avro_rs::{from_value, Codec, Reader, Schema, Writer};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use twox_hash::XxHash64;

use super::{acquire, Signature, StoreError};
use crate::error::Error;

pub const INDEX_DIR: &str = "index";

lazy_static! {
    static ref SCHEMA: Schema = {
        let schema = r#"
{
  "type":"record",
  "name":"index_entry",
  "fields":[
    {"name": "position", "type":"long"},
    {"name": "doc_id", "type":"string"},
    {"name": "signature", "type": {"type": "array", "items":"long"}}
  ]
}
"#;
        Schema::parse_str(schema).unwrap()
    };
}

/// Avro representation of an entry.
/// Signature values are stored bit-for-bit as signed longs.
#[derive(Debug, Serialize, Deserialize)]
struct SegmentRecord {
    position: i64,
    doc_id: String,
    signature: Vec<i64>,
}

/// An earlier document similar to the queried one.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    /// insertion order of the matched document
    pub position: usize,
    pub doc_id: String,
    pub similarity: f64,
}

#[derive(Debug)]
struct Entry {
    doc_id: String,
    signature: Signature,
}

#[derive(Debug, Default)]
struct Inner {
    entries: Vec<Entry>,
    bands: Vec<HashMap<u64, Vec<usize>>>,
    persisted: usize,
    next_segment: usize,
}

/// Entries copied out of the index, written without holding its lock.
#[derive(Debug)]
struct PendingSegment {
    segment: usize,
    end: usize,
    records: Vec<SegmentRecord>,
}

#[derive(Debug)]
pub struct ShingleIndex {
    inner: RwLock<Inner>,
    // one checkpoint at a time: `persisted` and `next_segment` only change under it
    checkpointing: Mutex<()>,
    num_perm: usize,
    num_bands: usize,
    timeout: Duration,
    dir: Option<PathBuf>,
}

impl ShingleIndex {
    /// Create an empty, in-memory index.
    pub fn new(num_perm: usize, num_bands: usize, timeout: Duration) -> Result<Self, Error> {
        if num_bands == 0 || num_perm == 0 || num_perm % num_bands != 0 {
            return Err(Error::Config(format!(
                "{num_perm} permutations can not be split in {num_bands} bands"
            )));
        }

        let inner = Inner {
            bands: vec![HashMap::new(); num_bands],
            ..Default::default()
        };

        Ok(Self {
            inner: RwLock::new(inner),
            checkpointing: Mutex::new(()),
            num_perm,
            num_bands,
            timeout,
            dir: None,
        })
    }

    /// Open an index persisted in `state_dir/index`, loading every existing segment.
    pub fn open(
        state_dir: &Path,
        num_perm: usize,
        num_bands: usize,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let dir = state_dir.join(INDEX_DIR);
        std::fs::create_dir_all(&dir)?;

        let mut index = Self::new(num_perm, num_bands, timeout)?;
        index.dir = Some(dir.clone());

        let pattern = dir.join("segment-*.avro");
        let pattern = pattern
            .to_str()
            .ok_or_else(|| Error::Custom(format!("{:?} is not valid unicode", dir)))?;
        let mut segments = glob::glob(pattern)?.collect::<Result<Vec<_>, _>>()?;
        segments.sort();

        let inner = index
            .inner
            .get_mut()
            .map_err(|_| Error::Store(StoreError::Poisoned))?;
        for segment in &segments {
            let nb_loaded = Self::load_segment(inner, segment, num_perm, num_bands)?;
            debug!("loaded {nb_loaded} entries from {:?}", segment);
        }
        inner.persisted = inner.entries.len();
        inner.next_segment = segments
            .iter()
            .filter_map(|segment| segment_number(segment))
            .max()
            .map(|nb| nb + 1)
            .unwrap_or(0);

        if !segments.is_empty() {
            info!(
                "loaded {} index entries from {} segments",
                inner.entries.len(),
                segments.len()
            );
        }
        Ok(index)
    }

    fn load_segment(
        inner: &mut Inner,
        path: &Path,
        num_perm: usize,
        num_bands: usize,
    ) -> Result<usize, Error> {
        let reader = Reader::new(BufReader::new(File::open(path)?))?;
        let mut nb_loaded = 0;
        for value in reader {
            let record: SegmentRecord = from_value(&value?)?;
            if record.signature.len() != num_perm {
                return Err(Error::Config(format!(
                    "{:?}: signatures of length {} can not be used with num_perm={}",
                    path,
                    record.signature.len(),
                    num_perm
                )));
            }
            if record.position as usize != inner.entries.len() {
                warn!(
                    "{:?}: entry {} found at position {}",
                    path,
                    record.position,
                    inner.entries.len()
                );
            }

            let signature = Signature::new(record.signature.into_iter().map(|v| v as u64).collect());
            let keys = band_keys(&signature, num_bands);
            push_entry(inner, record.doc_id, signature, &keys);
            nb_loaded += 1;
        }
        Ok(nb_loaded)
    }

    pub fn num_perm(&self) -> usize {
        self.num_perm
    }

    /// Documents similar to `signature` with a similarity ≥ `threshold`, first seen first.
    pub fn query_similar(
        &self,
        signature: &Signature,
        threshold: f64,
    ) -> Result<Vec<Match>, StoreError> {
        let keys = band_keys(signature, self.num_bands);
        let inner = acquire(self.timeout, || self.inner.try_read())?;
        Ok(matches(&inner, signature, &keys, threshold))
    }

    /// Add a signature, returning its insertion order.
    pub fn insert(&self, signature: Signature, doc_id: String) -> Result<usize, StoreError> {
        let keys = band_keys(&signature, self.num_bands);
        let mut inner = acquire(self.timeout, || self.inner.try_write())?;
        Ok(push_entry(&mut inner, doc_id, signature, &keys))
    }

    /// Query then insert the signature when nothing matched, atomically.
    ///
    /// Two concurrent near duplicates can not both miss each other.
    pub fn query_then_insert(
        &self,
        signature: &Signature,
        doc_id: &str,
        threshold: f64,
    ) -> Result<Vec<Match>, StoreError> {
        let keys = band_keys(signature, self.num_bands);
        let mut inner = acquire(self.timeout, || self.inner.try_write())?;
        let found = matches(&inner, signature, &keys, threshold);
        if found.is_empty() {
            push_entry(&mut inner, doc_id.to_string(), signature.clone(), &keys);
        }
        Ok(found)
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        match self.inner.read() {
            Ok(inner) => inner.entries.len(),
            Err(poisoned) => poisoned.into_inner().entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Persist entries inserted since the last checkpoint in a new segment.
    ///
    /// Returns the number of written entries. No-op for in-memory indices.
    pub fn checkpoint(&self) -> Result<usize, Error> {
        let dir = match &self.dir {
            Some(dir) => dir,
            None => return Ok(0),
        };

        let _checkpointing = self
            .checkpointing
            .lock()
            .map_err(|_| Error::Store(StoreError::Poisoned))?;

        let pending = match self.pending_segment()? {
            Some(pending) => pending,
            None => return Ok(0),
        };
        let path = write_segment(dir, &pending)?;
        self.commit(&pending)?;

        let nb_written = pending.records.len();
        info!("checkpointed {nb_written} index entries into {:?}", path);
        Ok(nb_written)
    }

    /// Copy the entries inserted since the last checkpoint, under the read lock.
    fn pending_segment(&self) -> Result<Option<PendingSegment>, StoreError> {
        let inner = acquire(self.timeout, || self.inner.try_read())?;
        if inner.persisted == inner.entries.len() {
            return Ok(None);
        }

        let records = inner
            .entries
            .iter()
            .enumerate()
            .skip(inner.persisted)
            .map(|(position, entry)| SegmentRecord {
                position: position as i64,
                doc_id: entry.doc_id.clone(),
                signature: entry.signature.values().iter().map(|v| *v as i64).collect(),
            })
            .collect();

        Ok(Some(PendingSegment {
            segment: inner.next_segment,
            end: inner.entries.len(),
            records,
        }))
    }

    /// Record a written segment.
    ///
    /// If this fails, the next checkpoint rewrites the same segment with the newer entries.
    fn commit(&self, pending: &PendingSegment) -> Result<(), StoreError> {
        let mut inner = acquire(self.timeout, || self.inner.try_write())?;
        inner.persisted = pending.end;
        inner.next_segment = pending.segment + 1;
        Ok(())
    }
}

/// Write a segment to a temporary file, then move it in place.
fn write_segment(dir: &Path, pending: &PendingSegment) -> Result<PathBuf, Error> {
    let path = dir.join(format!("segment-{:06}.avro", pending.segment));
    let tmp_path = path.with_extension("avro.tmp");
    {
        let file = File::create(&tmp_path)?;
        let mut writer = Writer::with_codec(&SCHEMA, file, Codec::Snappy);
        for record in &pending.records {
            writer.append_ser(record)?;
        }
        writer.flush()?;
    }
    std::fs::rename(&tmp_path, &path)?;
    Ok(path)
}

/// `segment-000042.avro` -> 42
fn segment_number(path: &Path) -> Option<usize> {
    path.file_stem()?
        .to_str()?
        .strip_prefix("segment-")?
        .parse()
        .ok()
}

/// One bucket key per band.
fn band_keys(signature: &Signature, num_bands: usize) -> Vec<u64> {
    let rows = (signature.len() / num_bands).max(1);
    signature
        .values()
        .chunks(rows)
        .take(num_bands)
        .enumerate()
        .map(|(band, values)| {
            let mut hasher = XxHash64::with_seed(band as u64);
            for value in values {
                hasher.write_u64(*value);
            }
            hasher.finish()
        })
        .collect()
}

fn matches(inner: &Inner, signature: &Signature, keys: &[u64], threshold: f64) -> Vec<Match> {
    let mut candidates: Vec<usize> = keys
        .iter()
        .zip(inner.bands.iter())
        .filter_map(|(key, band)| band.get(key))
        .flatten()
        .copied()
        .collect();
    candidates.sort_unstable();
    candidates.dedup();

    candidates
        .into_iter()
        .filter_map(|position| {
            let entry = &inner.entries[position];
            let similarity = entry.signature.jaccard(signature);
            (similarity >= threshold).then(|| Match {
                position,
                doc_id: entry.doc_id.clone(),
                similarity,
            })
        })
        .collect()
}

fn push_entry(inner: &mut Inner, doc_id: String, signature: Signature, keys: &[u64]) -> usize {
    let position = inner.entries.len();
    for (key, band) in keys.iter().zip(inner.bands.iter_mut()) {
        band.entry(*key).or_default().push(position);
    }
    inner.entries.push(Entry { doc_id, signature });
    position
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(1);

    fn sig(values: impl IntoIterator<Item = u64>) -> Signature {
        Signature::new(values.into_iter().collect())
    }

    #[test]
    fn invalid_banding() {
        assert!(ShingleIndex::new(10, 3, TIMEOUT).is_err());
        assert!(ShingleIndex::new(10, 0, TIMEOUT).is_err());
    }

    #[test]
    fn identical_signature_matches() {
        let index = ShingleIndex::new(8, 4, TIMEOUT).unwrap();
        index.insert(sig(0..8), "a".to_string()).unwrap();
        let found = index.query_similar(&sig(0..8), 0.8).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].doc_id, "a");
        assert_eq!(found[0].similarity, 1.0);
    }

    #[test]
    fn no_shared_band_no_match() {
        let index = ShingleIndex::new(8, 4, TIMEOUT).unwrap();
        index.insert(sig(0..8), "a".to_string()).unwrap();
        assert!(index.query_similar(&sig(100..108), 0.0).unwrap().is_empty());
    }

    #[test]
    fn threshold_is_inclusive() {
        let index = ShingleIndex::new(8, 4, TIMEOUT).unwrap();
        index.insert(sig(0..8), "a".to_string()).unwrap();
        // 6 equal slots out of 8
        let query = sig([0, 1, 2, 3, 4, 5, 100, 101]);
        assert_eq!(index.query_similar(&query, 0.75).unwrap().len(), 1);
        assert!(index.query_similar(&query, 0.76).unwrap().is_empty());
    }

    #[test]
    fn insertion_order() {
        let index = ShingleIndex::new(8, 4, TIMEOUT).unwrap();
        index.insert(sig([0, 1, 9, 9, 9, 9, 9, 9]), "b".to_string()).unwrap();
        index.insert(sig(0..8), "a".to_string()).unwrap();
        let found = index.query_similar(&sig(0..8), 0.1).unwrap();
        let ids: Vec<&str> = found.iter().map(|m| m.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(found[0].position, 0);
    }

    #[test]
    fn query_then_insert_only_inserts_new() {
        let index = ShingleIndex::new(8, 4, TIMEOUT).unwrap();
        assert!(index.query_then_insert(&sig(0..8), "a", 0.8).unwrap().is_empty());
        let found = index.query_then_insert(&sig(0..8), "b", 0.8).unwrap();
        assert_eq!(found[0].doc_id, "a");
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn segments_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        {
            let index = ShingleIndex::open(dir.path(), 8, 4, TIMEOUT).unwrap();
            index.insert(sig(0..8), "a".to_string()).unwrap();
            assert_eq!(index.checkpoint().unwrap(), 1);
            assert_eq!(index.checkpoint().unwrap(), 0);
            index
                .insert(sig([u64::MAX, 1, 2, 3, 4, 5, 6, 7]), "b".to_string())
                .unwrap();
            assert_eq!(index.checkpoint().unwrap(), 1);
        }
        assert!(dir.path().join("index/segment-000000.avro").exists());
        assert!(dir.path().join("index/segment-000001.avro").exists());

        let index = ShingleIndex::open(dir.path(), 8, 4, TIMEOUT).unwrap();
        assert_eq!(index.len(), 2);
        let found = index
            .query_similar(&sig([u64::MAX, 1, 2, 3, 4, 5, 6, 7]), 1.0)
            .unwrap();
        assert_eq!(found[0].doc_id, "b");
        assert_eq!(found[0].position, 1);

        index.insert(sig(50..58), "c".to_string()).unwrap();
        index.checkpoint().unwrap();
        assert!(dir.path().join("index/segment-000002.avro").exists());
    }

    #[test]
    fn inserts_during_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let index = ShingleIndex::open(dir.path(), 8, 4, TIMEOUT).unwrap();
        index.insert(sig(0..8), "a".to_string()).unwrap();

        let pending = index.pending_segment().unwrap().unwrap();
        // the index stays writable while the segment is written
        index.insert(sig(50..58), "b".to_string()).unwrap();
        write_segment(&dir.path().join(INDEX_DIR), &pending).unwrap();
        index.commit(&pending).unwrap();

        // only the entry inserted after the copy is left to persist
        assert_eq!(index.checkpoint().unwrap(), 1);
        assert_eq!(ShingleIndex::open(dir.path(), 8, 4, TIMEOUT).unwrap().len(), 2);
    }

    #[test]
    fn segment_numbers_with_gaps() {
        let dir = tempfile::tempdir().unwrap();
        {
            let index = ShingleIndex::open(dir.path(), 8, 4, TIMEOUT).unwrap();
            for (i, id) in ["a", "b", "c"].iter().enumerate() {
                let start = i as u64 * 100;
                index.insert(sig(start..start + 8), id.to_string()).unwrap();
                index.checkpoint().unwrap();
            }
        }
        let segment = |nb: usize| dir.path().join(format!("index/segment-{:06}.avro", nb));
        std::fs::remove_file(segment(1)).unwrap();

        let index = ShingleIndex::open(dir.path(), 8, 4, TIMEOUT).unwrap();
        assert_eq!(index.len(), 2);
        index.insert(sig(500..508), "d".to_string()).unwrap();
        index.checkpoint().unwrap();
        assert!(!segment(1).exists());
        assert!(segment(3).exists());

        let found = ShingleIndex::open(dir.path(), 8, 4, TIMEOUT)
            .unwrap()
            .query_similar(&sig(200..208), 1.0)
            .unwrap();
        assert_eq!(found[0].doc_id, "c");
    }

    #[test]
    fn segment_names() {
        assert_eq!(segment_number(Path::new("index/segment-000042.avro")), Some(42));
        assert_eq!(segment_number(Path::new("index/other.avro")), None);
    }

    #[test]
    fn segments_checked_against_num_perm() {
        let dir = tempfile::tempdir().unwrap();
        {
            let index = ShingleIndex::open(dir.path(), 8, 4, TIMEOUT).unwrap();
            index.insert(sig(0..8), "a".to_string()).unwrap();
            index.checkpoint().unwrap();
        }
        assert!(ShingleIndex::open(dir.path(), 16, 4, TIMEOUT).is_err());
    }
}
