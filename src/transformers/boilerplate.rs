/*! Boilerplate detection.

Each block of a document gets a score from a handful of surface features:

| feature                                   | weight |
|-------------------------------------------|--------|
| short lines on average                    | 0.30   |
| few stopwords (no running text)           | 0.25   |
| globally frequent lines (half or more)    | 0.30   |
| repeated in the document                  | 0.20   |
| no terminal punctuation                   | 0.10   |
| lots of punctuation and symbols           | 0.10   |
| first or last 20% of the blocks           | 0.10   |

Blocks scoring at least the threshold (0.5 by default) are boilerplate.
A single short heading in the middle of an article stays content, a menu at the top does not.
!*/
use std::fmt;

use unic_ucd::GeneralCategory;
use unicode_segmentation::UnicodeSegmentation;

use super::frequency::LineFrequencyTable;
use crate::dedup::indoc::repetition_counts;
use crate::identifiers::stopwords;
use crate::pipelines::types::{Block, BlockLabel, Document};

const SHORT_LINES_WEIGHT: f32 = 0.3;
const FEW_STOPWORDS_WEIGHT: f32 = 0.25;
const FREQUENT_WEIGHT: f32 = 0.3;
const REPEATED_WEIGHT: f32 = 0.2;
const NO_TERMINAL_WEIGHT: f32 = 0.1;
const PUNCTUATION_WEIGHT: f32 = 0.1;
const EDGE_WEIGHT: f32 = 0.1;

const MIN_STOPWORD_RATIO: f32 = 0.1;
const MAX_PUNCTUATION_RATIO: f32 = 0.3;
const MIN_FREQUENT_RATIO: f32 = 0.5;
const EDGE_PCTG: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Lead,
    Mid,
    Tail,
}

impl Position {
    /// Position of a block. Documents with less than 3 blocks have no edges.
    pub fn of(idx: usize, nb_blocks: usize) -> Self {
        if nb_blocks < 3 {
            return Position::Mid;
        }
        let edge = ((nb_blocks as f64 * EDGE_PCTG).ceil() as usize).max(1);
        if idx < edge {
            Position::Lead
        } else if idx >= nb_blocks - edge {
            Position::Tail
        } else {
            Position::Mid
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockFeatures {
    pub avg_line_len: f32,
    pub punctuation_ratio: f32,
    pub stopword_ratio: f32,
    pub terminal_punctuation: bool,
    pub position: Position,
    pub repetitions: usize,
    pub frequent_ratio: f32,
}

/// Features could not be extracted from a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierError {
    pub block: usize,
    pub reason: &'static str,
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block {}: {}", self.block, self.reason)
    }
}

impl std::error::Error for ClassifierError {}

pub struct BoilerplateClassifier {
    threshold: f32,
    short_line_chars: usize,
}

impl Default for BoilerplateClassifier {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            short_line_chars: 40,
        }
    }
}

impl BoilerplateClassifier {
    pub fn new(threshold: f32, short_line_chars: usize) -> Self {
        Self {
            threshold,
            short_line_chars,
        }
    }

    /// Extract the features of the `idx`th block.
    pub fn features(
        &self,
        block: &Block,
        idx: usize,
        nb_blocks: usize,
        repetitions: usize,
        frequent_ratio: f32,
    ) -> Result<BlockFeatures, ClassifierError> {
        let lines: Vec<&str> = block.normalized_lines().collect();
        let mut nb_chars = 0;
        let mut nb_visible = 0;
        let mut nb_punctuation = 0;
        for c in lines.iter().flat_map(|line| line.chars()) {
            nb_chars += 1;
            let category = GeneralCategory::of(c);
            // control and format characters (zero width spaces, BOMs...) are not extractable
            if c.is_whitespace() || category.is_other() {
                continue;
            }
            nb_visible += 1;
            if category.is_punctuation() || category.is_symbol() {
                nb_punctuation += 1;
            }
        }

        if nb_visible == 0 {
            return Err(ClassifierError {
                block: idx,
                reason: "no extractable characters",
            });
        }

        let mut nb_tokens = 0;
        let mut nb_stopwords = 0;
        for word in lines.iter().flat_map(|line| line.unicode_words()) {
            nb_tokens += 1;
            if stopwords::is_stopword(&word.to_lowercase()) {
                nb_stopwords += 1;
            }
        }

        let terminal_punctuation = lines
            .last()
            .and_then(|line| {
                line.trim_end_matches(['"', '\'', ')', '»', '«', '“', '”'])
                    .chars()
                    .last()
            })
            .map(|c| matches!(c, '.' | '!' | '?' | ':' | '…'))
            .unwrap_or(false);

        Ok(BlockFeatures {
            avg_line_len: nb_chars as f32 / lines.len() as f32,
            punctuation_ratio: nb_punctuation as f32 / nb_visible as f32,
            stopword_ratio: if nb_tokens == 0 {
                0.0
            } else {
                nb_stopwords as f32 / nb_tokens as f32
            },
            terminal_punctuation,
            position: Position::of(idx, nb_blocks),
            repetitions,
            frequent_ratio,
        })
    }

    pub fn score(&self, features: &BlockFeatures) -> f32 {
        let mut score = 0.0;
        if features.avg_line_len < self.short_line_chars as f32 {
            score += SHORT_LINES_WEIGHT;
        }
        if features.stopword_ratio < MIN_STOPWORD_RATIO {
            score += FEW_STOPWORDS_WEIGHT;
        }
        if features.frequent_ratio >= MIN_FREQUENT_RATIO {
            score += FREQUENT_WEIGHT;
        }
        if features.repetitions > 1 {
            score += REPEATED_WEIGHT;
        }
        if !features.terminal_punctuation {
            score += NO_TERMINAL_WEIGHT;
        }
        if features.punctuation_ratio > MAX_PUNCTUATION_RATIO {
            score += PUNCTUATION_WEIGHT;
        }
        if features.position != Position::Mid {
            score += EDGE_WEIGHT;
        }
        score
    }

    pub fn label(&self, features: &BlockFeatures) -> BlockLabel {
        if self.score(features) >= self.threshold {
            BlockLabel::Boilerplate
        } else {
            BlockLabel::Content
        }
    }

    /// Label every block of the document.
    ///
    /// Blocks whose features can not be extracted are labeled [BlockLabel::Unknown].
    /// Returns the extraction errors, which have already been logged.
    pub fn classify(
        &self,
        doc: &mut Document,
        frequencies: &LineFrequencyTable,
    ) -> Vec<ClassifierError> {
        let blocks = doc.record().blocks();
        let nb_blocks = blocks.len();
        let repetitions = repetition_counts(blocks);
        let frequent = frequencies.frequent_ratios(blocks);

        let mut errors = Vec::new();
        let labels: Vec<BlockLabel> = blocks
            .iter()
            .enumerate()
            .map(|(idx, block)| {
                match self.features(block, idx, nb_blocks, repetitions[idx], frequent[idx]) {
                    Ok(features) => self.label(&features),
                    Err(e) => {
                        if !block.is_blank() {
                            warn!("{}: could not classify {}", doc.id(), e);
                        }
                        errors.push(e);
                        BlockLabel::Unknown
                    }
                }
            })
            .collect();

        for (verdict, label) in doc.blocks_mut().iter_mut().zip(labels) {
            verdict.set_label(label);
        }
        errors
    }
}
