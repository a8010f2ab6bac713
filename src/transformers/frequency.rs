/*! Corpus-wide line frequencies.

Navigation items, copyright notices and share buttons are short lines that appear
on a lot of pages. The [LineFrequencyTable] counts short lines (by hash) over the
whole run so that the boilerplate classifier can use their frequency as a feature.

Workers read the table under a read lock, and record their own observations in a
[FrequencyBatch] that is merged into the table (under the write lock) once it
reaches `merge_batch_size` entries, and when it is dropped.
Counts are therefore eventually consistent.

The table holds at most `capacity` lines. When a merge goes over, the least
frequent lines are dropped until half of the capacity is used, so that lines
seen on a lot of pages stay while one-off lines are forgotten.
!*/
use std::{
    collections::HashMap,
    hash::Hasher,
    sync::{Arc, RwLock},
};

use twox_hash::XxHash64;

use crate::pipelines::types::Block;

/// Default maximum number of distinct lines in a [LineFrequencyTable].
pub const DEFAULT_CAPACITY: usize = 1 << 20;

/// Hash of a trimmed, lowercased line.
pub fn line_hash(line: &str) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    for c in line.trim().chars().flat_map(char::to_lowercase) {
        hasher.write_u32(c as u32);
    }
    hasher.finish()
}

#[derive(Debug)]
pub struct LineFrequencyTable {
    counts: RwLock<HashMap<u64, u32>>,
    max_line_chars: usize,
    min_count: u32,
    batch_size: usize,
    capacity: usize,
}

impl LineFrequencyTable {
    /// * `max_line_chars`: longer lines are not counted.
    /// * `min_count`: a line seen at least this many times is frequent.
    /// * `batch_size`: number of distinct lines a batch holds before being merged.
    pub fn new(max_line_chars: usize, min_count: u32, batch_size: usize) -> Self {
        Self {
            counts: RwLock::new(HashMap::new()),
            max_line_chars,
            min_count,
            batch_size: batch_size.max(1),
            capacity: DEFAULT_CAPACITY,
        }
    }

    /// Maximum number of distinct lines kept in the table.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(2);
        self
    }

    fn is_short(&self, line: &str) -> bool {
        line.chars().nth(self.max_line_chars).is_none()
    }

    /// New thread-local batch.
    pub fn batch(table: &Arc<Self>) -> FrequencyBatch {
        FrequencyBatch {
            table: table.clone(),
            pending: HashMap::new(),
        }
    }

    /// Current count of a line.
    pub fn count(&self, line: &str) -> u32 {
        match self.counts.read() {
            Ok(counts) => counts.get(&line_hash(line)).copied().unwrap_or(0),
            Err(_) => 0,
        }
    }

    /// For each block, the share of its lines that are globally frequent short lines.
    ///
    /// Takes the read lock once. A poisoned table counts as empty.
    pub fn frequent_ratios(&self, blocks: &[Block]) -> Vec<f32> {
        let counts = match self.counts.read() {
            Ok(counts) => counts,
            Err(_) => {
                warn!("line frequency table is poisoned, ignoring frequencies");
                return vec![0.0; blocks.len()];
            }
        };

        blocks
            .iter()
            .map(|block| {
                let (nb_lines, nb_frequent) =
                    block
                        .normalized_lines()
                        .fold((0usize, 0usize), |(nb_lines, nb_frequent), line| {
                            let frequent = self.is_short(line)
                                && counts.get(&line_hash(line)).copied().unwrap_or(0)
                                    >= self.min_count;
                            (nb_lines + 1, nb_frequent + frequent as usize)
                        });
                if nb_lines == 0 {
                    0.0
                } else {
                    nb_frequent as f32 / nb_lines as f32
                }
            })
            .collect()
    }

    fn merge(&self, pending: &mut HashMap<u64, u32>) {
        if pending.is_empty() {
            return;
        }
        match self.counts.write() {
            Ok(mut counts) => {
                for (hash, count) in pending.drain() {
                    let total = counts.entry(hash).or_default();
                    *total = total.saturating_add(count);
                }
                if counts.len() > self.capacity {
                    self.evict(&mut counts);
                }
            }
            Err(_) => {
                warn!("line frequency table is poisoned, dropping {} observations", pending.len());
                pending.clear();
            }
        }
    }

    /// Keep the `capacity / 2` most frequent lines at most.
    ///
    /// Lines tied with the last evicted count are evicted too.
    fn evict(&self, counts: &mut HashMap<u64, u32>) {
        let nb_lines = counts.len();
        let nb_kept = self.capacity / 2;
        let mut values: Vec<u32> = counts.values().copied().collect();
        let (_, cutoff, _) = values.select_nth_unstable(nb_lines - nb_kept - 1);
        let cutoff = *cutoff;

        counts.retain(|_, count| *count > cutoff);
        debug!(
            "line frequency table full, evicted {} lines seen at most {} times",
            nb_lines - counts.len(),
            cutoff
        );
    }

    /// Number of distinct lines in the table.
    pub fn len(&self) -> usize {
        self.counts.read().map(|counts| counts.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Observations not merged yet. Merged on drop.
pub struct FrequencyBatch {
    table: Arc<LineFrequencyTable>,
    pending: HashMap<u64, u32>,
}

impl FrequencyBatch {
    /// Count the short lines of the blocks (once per document).
    pub fn observe(&mut self, blocks: &[Block]) {
        let mut seen = std::collections::HashSet::new();
        for line in blocks.iter().flat_map(|block| block.normalized_lines()) {
            if self.table.is_short(line) {
                let hash = line_hash(line);
                if seen.insert(hash) {
                    *self.pending.entry(hash).or_default() += 1;
                }
            }
        }

        if self.pending.len() >= self.table.batch_size {
            self.flush();
        }
    }

    pub fn flush(&mut self) {
        self.table.merge(&mut self.pending);
    }
}

impl Drop for FrequencyBatch {
    fn drop(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks(lines: &[&str]) -> Vec<Block> {
        vec![Block::from_iter(lines.iter().copied())]
    }

    #[test]
    fn hash_normalization() {
        assert_eq!(line_hash("  Impressum "), line_hash("impressum"));
        assert_ne!(line_hash("Impressum"), line_hash("Kontakt"));
    }

    #[test]
    fn batch_merged_on_size() {
        let table = Arc::new(LineFrequencyTable::new(40, 2, 2));
        let mut batch = LineFrequencyTable::batch(&table);
        batch.observe(&blocks(&["Impressum"]));
        assert_eq!(table.count("impressum"), 0);
        batch.observe(&blocks(&["Kontakt"]));
        assert_eq!(table.count("Impressum"), 1);
        assert_eq!(table.count("Kontakt"), 1);
    }

    #[test]
    fn batch_merged_on_drop() {
        let table = Arc::new(LineFrequencyTable::new(40, 2, 1024));
        {
            let mut batch = LineFrequencyTable::batch(&table);
            batch.observe(&blocks(&["Impressum", "Impressum"]));
            batch.observe(&blocks(&["Impressum"]));
        }
        // counted once per document
        assert_eq!(table.count("Impressum"), 2);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn long_lines_ignored() {
        let table = Arc::new(LineFrequencyTable::new(10, 1, 1));
        let mut batch = LineFrequencyTable::batch(&table);
        batch.observe(&blocks(&["a line that is longer than ten characters"]));
        assert!(table.is_empty());
    }

    #[test]
    fn bounded_size() {
        let table = Arc::new(LineFrequencyTable::new(40, 2, 1).with_capacity(100));
        let mut batch = LineFrequencyTable::batch(&table);
        for _ in 0..3 {
            batch.observe(&blocks(&["Impressum"]));
        }
        for i in 0..1000 {
            batch.observe(&blocks(&[&format!("Zeile {i}")]));
            assert!(table.len() <= 100);
        }
        drop(batch);

        // the frequent line survived the evictions
        assert_eq!(table.count("Impressum"), 3);
        assert_eq!(table.count("Zeile 0"), 0);
    }

    #[test]
    fn ratios() {
        let table = Arc::new(LineFrequencyTable::new(40, 2, 1));
        {
            let mut batch = LineFrequencyTable::batch(&table);
            for _ in 0..2 {
                batch.observe(&blocks(&["Impressum", "Datenschutz"]));
            }
            batch.observe(&blocks(&["Kontakt"]));
        }

        let doc = vec![
            Block::from_iter(["Impressum", "Datenschutz", "Kontakt", "Über uns"]),
            Block::from_iter(["Ein Satz."]),
            Block::from_iter(["   "]),
        ];
        assert_eq!(table.frequent_ratios(&doc), vec![0.5, 0.0, 0.0]);
    }
}
