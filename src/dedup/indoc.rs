/*! In-document deduplication.

Marks blocks that repeat an earlier block of the same document.
Exact repeats are detected on the normalized block text using [runiq](https://github.com/whitfin/runiq),
and long enough blocks are also compared by MinHash to catch near-exact repeats
(a counter that changed, a different date...).

The first occurrence is retained. Blocks already marked as duplicates are skipped,
so deduplicating twice gives the same result as deduplicating once.
!*/
use std::collections::HashMap;

use runiq::filters::Filter;

use super::{MinHasher, Shingler, Signature};
use crate::pipelines::types::{Block, BlockMark, Document};

const NEAR_EXACT_PERM: usize = 64;
const NEAR_EXACT_SHINGLE: usize = 3;

/// Lowercased alphanumeric tokens separated by single spaces.
pub fn normalize_block(block: &Block) -> String {
    let mut normalized = String::new();
    for token in block
        .normalized_lines()
        .flat_map(|line| line.split(|c: char| !c.is_alphanumeric()))
        .filter(|token| !token.is_empty())
    {
        if !normalized.is_empty() {
            normalized.push(' ');
        }
        normalized.extend(token.chars().flat_map(char::to_lowercase));
    }
    normalized
}

/// For each block, how many blocks of the document share its normalized text.
///
/// Blocks without alphanumeric content count as unique.
pub fn repetition_counts(blocks: &[Block]) -> Vec<usize> {
    let normalized: Vec<String> = blocks.iter().map(normalize_block).collect();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for text in normalized.iter().filter(|text| !text.is_empty()) {
        *counts.entry(text.as_str()).or_default() += 1;
    }

    normalized
        .iter()
        .map(|text| counts.get(text.as_str()).copied().unwrap_or(1))
        .collect()
}

pub struct InDocDedup {
    near_exact_threshold: f64,
    near_exact_min_tokens: usize,
    shingler: Shingler,
    minhasher: MinHasher,
}

impl InDocDedup {
    pub fn new(near_exact_threshold: f64, near_exact_min_tokens: usize, seed: u64) -> Self {
        Self {
            near_exact_threshold,
            near_exact_min_tokens,
            shingler: Shingler::new(NEAR_EXACT_SHINGLE),
            minhasher: MinHasher::new(NEAR_EXACT_PERM, seed),
        }
    }

    /// Mark repeated blocks as [BlockMark::Duplicate].
    ///
    /// Returns the number of newly marked blocks.
    pub fn dedup(&self, doc: &mut Document) -> usize {
        let mut filter = runiq::filters::DigestFilter::default();
        let mut retained: Vec<Signature> = Vec::new();
        let mut to_mark = Vec::new();

        for (idx, (block, verdict)) in doc.annotated_blocks().enumerate() {
            if verdict.has_mark(BlockMark::Duplicate) {
                continue;
            }

            let normalized = normalize_block(block);
            if normalized.is_empty() {
                continue;
            }

            if !filter.detect(normalized.as_bytes()) {
                to_mark.push(idx);
                continue;
            }

            if normalized.split(' ').count() < self.near_exact_min_tokens {
                continue;
            }

            let signature = match self
                .minhasher
                .signature(&self.shingler.shingles(&normalized))
            {
                Some(signature) => signature,
                None => continue,
            };

            if retained
                .iter()
                .any(|earlier| earlier.jaccard(&signature) >= self.near_exact_threshold)
            {
                to_mark.push(idx);
            } else {
                retained.push(signature);
            }
        }

        let blocks = doc.blocks_mut();
        for idx in &to_mark {
            blocks[*idx].mark(BlockMark::Duplicate);
        }

        if !to_mark.is_empty() {
            debug!("{}: {} duplicate blocks", doc.id(), to_mark.len());
        }
        to_mark.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipelines::types::DocumentRecord;

    fn dedup() -> InDocDedup {
        InDocDedup::new(0.9, 8, 42)
    }

    fn marked(doc: &Document) -> Vec<usize> {
        doc.blocks()
            .iter()
            .enumerate()
            .filter(|(_, b)| b.has_mark(BlockMark::Duplicate))
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn normalization() {
        let block = Block::from_iter(["  Hallo, WELT!  ", "", "zweite--Zeile 42"]);
        assert_eq!(normalize_block(&block), "hallo welt zweite zeile 42");
    }

    #[test]
    fn repetitions() {
        let record = DocumentRecord::from_text("id", "Menü\n\nText hier.\n\nmenü!\n\n---");
        assert_eq!(repetition_counts(record.blocks()), vec![2, 1, 2, 1]);
    }

    #[test]
    fn exact_repeats_keep_first() {
        let mut doc = Document::new(DocumentRecord::from_text(
            "id",
            "Teilen auf Facebook\n\nEin langer Absatz mit Inhalt.\n\nTEILEN AUF FACEBOOK!\n\nteilen auf facebook",
        ));
        assert_eq!(dedup().dedup(&mut doc), 2);
        assert_eq!(marked(&doc), vec![2, 3]);
    }

    #[test]
    fn near_exact_repeats() {
        let base = "Die Veranstaltung findet am Samstag im großen Saal des Rathauses statt und beginnt pünktlich um acht Uhr abends mit einem kurzen Vortrag";
        let changed = base.replace("acht", "neun");
        let text = format!("{base}\n\nGanz anderer Text.\n\n{changed}");
        let mut doc = Document::new(DocumentRecord::from_text("id", &text));

        // low threshold so that a single changed word is enough
        let dedup = InDocDedup::new(0.5, 8, 42);
        assert_eq!(dedup.dedup(&mut doc), 1);
        assert_eq!(marked(&doc), vec![2]);
    }

    #[test]
    fn short_blocks_not_compared_fuzzily() {
        let mut doc = Document::new(DocumentRecord::from_text(
            "id",
            "eins zwei drei\n\neins zwei vier",
        ));
        assert_eq!(InDocDedup::new(0.0, 8, 42).dedup(&mut doc), 0);
    }

    #[test]
    fn idempotent() {
        let text = "a b c d e f g h i j\n\nx\n\na b c d e f g h i j\n\nx\n\na b c d e f g h i k";
        let mut doc = Document::new(DocumentRecord::from_text("id", text));
        let dedup = InDocDedup::new(0.5, 8, 42);
        let first = dedup.dedup(&mut doc);
        let after_first = doc.blocks().to_vec();
        assert!(first >= 2);

        assert_eq!(dedup.dedup(&mut doc), 0);
        assert_eq!(doc.blocks(), after_first.as_slice());
    }
}
