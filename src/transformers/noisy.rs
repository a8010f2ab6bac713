/*! Annotates noisy content

Noisy content is content that has a too low letters/punctuation ratio.
 *  !*/

use unic_ucd::GeneralCategory;

use super::Annotate;
use crate::pipelines::types::Document;

pub struct Noisy {
    threshold: f64,
}

impl Default for Noisy {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}

impl Annotate for Noisy {
    fn annotate(&self, doc: &mut Document) {
        let content: Vec<&str> = doc.content_lines().collect();
        let nb_chars: usize = content.iter().map(|line| line.chars().count()).sum();
        let threshold = (nb_chars as f64 * self.threshold).floor() as usize;

        let mut nonletter_count = 0;
        let mut letter_count = 0;
        let mut noisy = false;

        for is_letter in content
            .iter()
            .flat_map(|line| line.chars())
            .map(|c| GeneralCategory::of(c).is_letter())
        {
            if !is_letter {
                nonletter_count += 1;

                // if count is more than what we consider to be the threshold, stop there
                if nonletter_count > threshold {
                    noisy = true;
                    break;
                }
            } else {
                letter_count += 1;

                // same logic applies
                if letter_count > threshold {
                    break;
                }
            }
        }

        if noisy {
            doc.add_annotation("noisy");
        }
    }
}
