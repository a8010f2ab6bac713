/*! Run configuration.

A [Config] is read from a JSON file where every key is optional,
then overridden by command line flags.

```json
{
    "target_language": "de",
    "near_dup_threshold": 0.8,
    "policies": { "near_duplicate": "mark" },
    "url_filter": { "tlds": ["de", "at", "ch"] }
}
```
!*/
use std::{fs::File, io::BufReader, path::Path, path::PathBuf, time::Duration};

use oxilangtag::LanguageTag;
use serde::{Deserialize, Serialize};

use crate::{error::Error, filtering::UrlFilterConfig};

/// What to do with a document that fails a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// reject the document
    Filter,
    /// annotate the document and keep processing it
    Mark,
}

/// Which match becomes `duplicate_of` when several earlier documents are similar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Canonical {
    FirstSeen,
    MostSimilar,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policies {
    pub exact_duplicate: Policy,
    pub near_duplicate: Policy,
    pub language: Policy,
    pub quality: Policy,
}

impl Default for Policies {
    fn default() -> Self {
        Self {
            exact_duplicate: Policy::Filter,
            near_duplicate: Policy::Filter,
            language: Policy::Filter,
            quality: Policy::Filter,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// BCP-47 tag of the language the corpus is built for.
    pub target_language: String,
    pub language_threshold: f32,
    pub near_dup_threshold: f64,
    pub quality_threshold: f32,
    pub min_document_chars: usize,
    pub policies: Policies,
    pub canonical: Canonical,

    pub num_perm: usize,
    pub num_bands: usize,
    pub shingle_size: usize,
    pub seed: u64,

    pub boilerplate_threshold: f32,
    pub short_line_chars: usize,
    pub frequent_line_min_count: u32,
    pub merge_batch_size: usize,
    /// Maximum number of distinct short lines counted over the run.
    pub frequency_table_capacity: usize,

    pub near_exact_threshold: f64,
    pub near_exact_min_tokens: usize,
    pub block_min_tokens: usize,

    /// Number of characters of the document used for the document-level language check.
    pub language_sample_chars: usize,
    pub prune_blocks: bool,
    pub repair: bool,

    pub workers: Option<usize>,
    pub fingerprint_shards: usize,
    pub store_timeout_ms: u64,
    pub store_retries: u32,
    pub checkpoint_every: usize,
    pub max_error_rate: f64,

    pub url_filter: Option<UrlFilterConfig>,
    pub state_dir: Option<PathBuf>,
    pub fasttext_model: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_language: "de".to_string(),
            language_threshold: 0.85,
            near_dup_threshold: 0.8,
            quality_threshold: 0.5,
            min_document_chars: 200,
            policies: Policies::default(),
            canonical: Canonical::FirstSeen,

            num_perm: 128,
            num_bands: 32,
            shingle_size: 5,
            seed: 42,

            boilerplate_threshold: 0.5,
            short_line_chars: 40,
            frequent_line_min_count: 50,
            merge_batch_size: 1024,
            frequency_table_capacity: 1 << 20,

            near_exact_threshold: 0.9,
            near_exact_min_tokens: 8,
            block_min_tokens: 5,

            language_sample_chars: 5000,
            prune_blocks: true,
            repair: true,

            workers: None,
            fingerprint_shards: 64,
            store_timeout_ms: 5000,
            store_retries: 3,
            checkpoint_every: 100_000,
            max_error_rate: 0.05,

            url_filter: None,
            state_dir: None,
            fasttext_model: None,
        }
    }
}

impl Config {
    /// Load a configuration from a JSON file.
    /// Missing keys take their default value.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let reader = BufReader::new(File::open(path)?);
        let config: Config = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Parsed and normalized target language.
    pub fn target(&self) -> Result<LanguageTag<String>, Error> {
        Ok(LanguageTag::parse_and_normalize(&self.target_language)?)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Check knob consistency.
    pub fn validate(&self) -> Result<(), Error> {
        self.target()?;

        if self.num_perm == 0 || self.num_bands == 0 || self.num_perm % self.num_bands != 0 {
            return Err(Error::Config(format!(
                "num_perm ({}) must be a non-zero multiple of num_bands ({})",
                self.num_perm, self.num_bands
            )));
        }
        if self.shingle_size == 0 {
            return Err(Error::Config("shingle_size must be at least 1".to_string()));
        }
        if self.fingerprint_shards == 0 || !self.fingerprint_shards.is_power_of_two() {
            return Err(Error::Config(format!(
                "fingerprint_shards ({}) must be a power of two",
                self.fingerprint_shards
            )));
        }

        if self.frequency_table_capacity < 2 {
            return Err(Error::Config(
                "frequency_table_capacity must be at least 2".to_string(),
            ));
        }

        let unit_knobs = [
            ("language_threshold", self.language_threshold as f64),
            ("near_dup_threshold", self.near_dup_threshold),
            ("quality_threshold", self.quality_threshold as f64),
            ("boilerplate_threshold", self.boilerplate_threshold as f64),
            ("near_exact_threshold", self.near_exact_threshold),
            ("max_error_rate", self.max_error_rate),
        ];
        for (name, value) in unit_knobs {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "{name} must be in [0, 1], got {value}"
                )));
            }
        }

        Ok(())
    }
}
