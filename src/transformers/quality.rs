/*! Document quality score.

The score is a weighted mean of four components, each in `[0, 1]`:

- natural language marker density: share of target-language stopwords among tokens,
  saturating at [MARKER_SATURATION],
- length plausibility: mean sentence length (in words) and mean word length (in characters)
  within usual bounds,
- content share: share of non-boilerplate blocks,
- alphabetic share: share of letters among non-whitespace characters, saturating at
  [ALPHA_SATURATION].

Only retained blocks (not boilerplate, not duplicated, not foreign) are measured,
except for the content share. Language identification confidence plays no part.
!*/
use std::collections::HashSet;

use itertools::Itertools;
use oxilangtag::LanguageTag;
use unic_ucd::GeneralCategory;
use unicode_segmentation::UnicodeSegmentation;

use crate::identifiers::stopwords;
use crate::pipelines::types::{BlockLabel, Document};

pub const MARKER_SATURATION: f32 = 0.25;
pub const ALPHA_SATURATION: f32 = 0.75;

const SENTENCE_WORDS: (f32, f32) = (5.0, 40.0);
const WORD_CHARS: (f32, f32) = (3.0, 10.0);

/// Score components.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityScore {
    pub marker_density: f32,
    pub length_plausibility: f32,
    pub content_share: f32,
    pub alphabetic_share: f32,
    pub score: f32,
}

/// 1 inside `[low, high]`, decreasing proportionally outside.
fn plausibility(value: f32, (low, high): (f32, f32)) -> f32 {
    if value <= 0.0 {
        0.0
    } else if value < low {
        value / low
    } else if value > high {
        high / value
    } else {
        1.0
    }
}

pub struct QualityAssessor {
    marker_weight: f32,
    length_weight: f32,
    content_weight: f32,
    alphabetic_weight: f32,
}

impl Default for QualityAssessor {
    fn default() -> Self {
        Self {
            marker_weight: 0.3,
            length_weight: 0.2,
            content_weight: 0.2,
            alphabetic_weight: 0.3,
        }
    }
}

impl QualityAssessor {
    /// Custom weights. They are normalized to sum to 1.
    pub fn with_weights(marker: f32, length: f32, content: f32, alphabetic: f32) -> Self {
        let total = marker + length + content + alphabetic;
        if total <= 0.0 {
            return Self::default();
        }
        Self {
            marker_weight: marker / total,
            length_weight: length / total,
            content_weight: content / total,
            alphabetic_weight: alphabetic / total,
        }
    }

    pub fn assess(&self, doc: &Document, target: &LanguageTag<String>) -> QualityScore {
        let content_share = {
            let nb_blocks = doc.blocks().len() - doc.count_label(BlockLabel::Unknown);
            if nb_blocks == 0 {
                0.0
            } else {
                (nb_blocks - doc.count_label(BlockLabel::Boilerplate)) as f32 / nb_blocks as f32
            }
        };

        let text = doc.content_lines().join("\n");
        if text.is_empty() {
            return QualityScore {
                marker_density: 0.0,
                length_plausibility: 0.0,
                content_share,
                alphabetic_share: 0.0,
                score: 0.0,
            };
        }

        let marker_density = self.marker_density(&text, target);
        let length_plausibility = Self::length_plausibility(&text);
        let alphabetic_share = Self::alphabetic_share(&text);

        let score = self.marker_weight * marker_density
            + self.length_weight * length_plausibility
            + self.content_weight * content_share
            + self.alphabetic_weight * alphabetic_share;

        QualityScore {
            marker_density,
            length_plausibility,
            content_share,
            alphabetic_share,
            score: score.clamp(0.0, 1.0),
        }
    }

    /// Target-language stopword ratio, or any-language ratio when the target has no profile.
    fn marker_density(&self, text: &str, target: &LanguageTag<String>) -> f32 {
        let target_stopwords: Option<HashSet<&'static str>> = stopwords::stopwords_of(target);

        let mut nb_tokens = 0;
        let mut nb_markers = 0;
        for word in text.unicode_words() {
            nb_tokens += 1;
            let word = word.to_lowercase();
            let is_marker = match &target_stopwords {
                Some(words) => words.contains(word.as_str()),
                None => stopwords::is_stopword(&word),
            };
            if is_marker {
                nb_markers += 1;
            }
        }

        if nb_tokens == 0 {
            return 0.0;
        }
        (nb_markers as f32 / nb_tokens as f32 / MARKER_SATURATION).min(1.0)
    }

    fn length_plausibility(text: &str) -> f32 {
        let mut nb_sentences = 0;
        let mut nb_words = 0;
        let mut nb_word_chars = 0;
        for sentence in text.unicode_sentences() {
            let mut sentence_words = 0;
            for word in sentence.unicode_words() {
                sentence_words += 1;
                nb_word_chars += word.chars().count();
            }
            if sentence_words > 0 {
                nb_sentences += 1;
                nb_words += sentence_words;
            }
        }

        if nb_words == 0 {
            return 0.0;
        }

        let sentence_len = nb_words as f32 / nb_sentences as f32;
        let word_len = nb_word_chars as f32 / nb_words as f32;
        (plausibility(sentence_len, SENTENCE_WORDS) + plausibility(word_len, WORD_CHARS)) / 2.0
    }

    fn alphabetic_share(text: &str) -> f32 {
        let (nb_letters, nb_visible) = text
            .chars()
            .filter(|c| !c.is_whitespace())
            .fold((0usize, 0usize), |(letters, visible), c| {
                (
                    letters + GeneralCategory::of(c).is_letter() as usize,
                    visible + 1,
                )
            });

        if nb_visible == 0 {
            return 0.0;
        }
        (nb_letters as f32 / nb_visible as f32 / ALPHA_SATURATION).min(1.0)
    }
}
