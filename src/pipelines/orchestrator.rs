/*! Per-document state machine.

Every document goes through the following stages, in order:

1. `Received`: blank records are malformed, then the URL filter and the minimum length apply,
1. `ExactDupChecked`: SHA-256 of the normalized text against the [FingerprintStore],
1. `LanguageChecked`: document-level identification on a sample of the text,
1. `NearDupChecked`: MinHash signature against the [ShingleIndex],
1. `BoilerplateLabeled`: block labels, and line frequency observations,
1. `InDocDeduped`: repeated blocks are marked,
1. `QualityAssessed`: block-level identification, annotators and quality score,
1. `Verdicted`: surviving documents are pruned and repaired.

A failed check either rejects the document (and skips the remaining stages)
or annotates it, depending on its [Policy].
Store failures are retried, then the document is errored.
!*/
use std::{
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use oxilangtag::LanguageTag;

use super::retry::Backoff;
use super::stats::RunStats;
use super::types::{
    Block, BlockLabel, BlockMark, BlockVerdict, Document, DocumentRecord, ProcessedDocument,
    Reason, Stage,
};
use crate::config::{Canonical, Config, Policy};
use crate::dedup::{
    ContentFingerprint, FingerprintStore, InDocDedup, Insertion, Match, MinHasher,
    ShardedFingerprintStore, Shingler, ShingleIndex, StoreError,
};
use crate::error::Error;
use crate::filtering::{Filter, MinLength, UrlFilter};
use crate::identifiers::DetectorChain;
use crate::transformers::{
    Annotate, Annotator, BoilerplateClassifier, FrequencyBatch, LineFrequencyTable,
    QualityAssessor, RepairRules,
};

/// Result of a single stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Continue,
    Reject(Reason),
}

type StageFn = fn(&Orchestrator, &mut Document, &mut FrequencyBatch) -> Result<Outcome, StoreError>;

const STAGES: [(Stage, StageFn); 6] = [
    (Stage::ExactDupChecked, Orchestrator::check_exact),
    (Stage::LanguageChecked, Orchestrator::check_language),
    (Stage::NearDupChecked, Orchestrator::check_near),
    (Stage::BoilerplateLabeled, Orchestrator::label_boilerplate),
    (Stage::InDocDeduped, Orchestrator::dedup_blocks),
    (Stage::QualityAssessed, Orchestrator::assess_quality),
];

pub struct Orchestrator {
    config: Config,
    target: LanguageTag<String>,
    fingerprints: Arc<dyn FingerprintStore>,
    index: Arc<ShingleIndex>,
    frequencies: Arc<LineFrequencyTable>,
    detector: DetectorChain,
    shingler: Shingler,
    minhasher: MinHasher,
    classifier: BoilerplateClassifier,
    indoc: InDocDedup,
    quality: QualityAssessor,
    annotator: Annotator,
    repair: Option<RepairRules>,
    url_filter: Option<UrlFilter>,
    min_length: MinLength,
    backoff: Backoff,
    stats: RunStats,
    since_checkpoint: AtomicUsize,
}

impl Orchestrator {
    /// Build every component from the configuration.
    ///
    /// When `state_dir` is set, the fingerprint journal and the index segments are loaded from it.
    /// Failure to open them fails the run.
    pub fn from_config(config: Config) -> Result<Self, Error> {
        config.validate()?;
        let target = config.target()?;
        let timeout = config.store_timeout();

        let (fingerprints, index): (Arc<dyn FingerprintStore>, ShingleIndex) =
            match &config.state_dir {
                Some(dir) => (
                    Arc::new(ShardedFingerprintStore::open(
                        dir,
                        config.fingerprint_shards,
                        timeout,
                    )?),
                    ShingleIndex::open(dir, config.num_perm, config.num_bands, timeout)?,
                ),
                None => {
                    warn!("no state directory, dedup state will not be persisted");
                    (
                        Arc::new(ShardedFingerprintStore::in_memory(
                            config.fingerprint_shards,
                            timeout,
                        )),
                        ShingleIndex::new(config.num_perm, config.num_bands, timeout)?,
                    )
                }
            };

        let repair = if config.repair {
            let rules = RepairRules::for_language(&target);
            if rules.is_none() {
                warn!("no repair rules for {target}, text repair disabled");
            }
            rules
        } else {
            None
        };

        let detector = Self::build_detector(config.fasttext_model.as_deref(), &config)?;
        debug!("language identification chain: {:?}", detector.names());

        Ok(Self {
            target,
            fingerprints,
            index: Arc::new(index),
            frequencies: Arc::new(LineFrequencyTable::new(
                config.short_line_chars,
                config.frequent_line_min_count,
                config.merge_batch_size,
            )
            .with_capacity(config.frequency_table_capacity)),
            detector,
            shingler: Shingler::new(config.shingle_size),
            minhasher: MinHasher::new(config.num_perm, config.seed),
            classifier: BoilerplateClassifier::new(
                config.boilerplate_threshold,
                config.short_line_chars,
            ),
            indoc: InDocDedup::new(
                config.near_exact_threshold,
                config.near_exact_min_tokens,
                config.seed,
            ),
            quality: QualityAssessor::default(),
            annotator: Annotator::with_defaults(),
            repair,
            url_filter: config.url_filter.as_ref().map(UrlFilter::from),
            min_length: MinLength::with_min_chars(config.min_document_chars),
            backoff: Backoff::with_retries(config.store_retries),
            stats: RunStats::new(),
            since_checkpoint: AtomicUsize::new(0),
            config,
        })
    }

    #[cfg(feature = "fasttext")]
    fn build_detector(model: Option<&Path>, config: &Config) -> Result<DetectorChain, Error> {
        use crate::identifiers::{FastTextDetector, ScriptDetector, StopwordDetector};
        match model {
            Some(path) => {
                let mut chain = DetectorChain::default();
                chain
                    .add(Box::new(FastTextDetector::new(
                        path,
                        config.language_threshold,
                    )?))
                    .add(Box::new(StopwordDetector::default()))
                    .add(Box::new(ScriptDetector::default()));
                Ok(chain)
            }
            None => Ok(DetectorChain::with_builtin()),
        }
    }

    #[cfg(not(feature = "fasttext"))]
    fn build_detector(model: Option<&Path>, _config: &Config) -> Result<DetectorChain, Error> {
        if let Some(path) = model {
            warn!("built without fasttext support, ignoring model {:?}", path);
        }
        Ok(DetectorChain::with_builtin())
    }

    /// Replace the language identification chain.
    pub fn with_detector(mut self, detector: DetectorChain) -> Self {
        self.detector = detector;
        self
    }

    /// Replace the fingerprint store.
    pub fn with_fingerprints(mut self, fingerprints: Arc<dyn FingerprintStore>) -> Self {
        self.fingerprints = fingerprints;
        self
    }

    /// Replace the text repair rules (`None` disables repair).
    pub fn with_repair(mut self, repair: Option<RepairRules>) -> Self {
        self.repair = repair;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn target(&self) -> &LanguageTag<String> {
        &self.target
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn index(&self) -> &ShingleIndex {
        &self.index
    }

    pub fn fingerprints(&self) -> &dyn FingerprintStore {
        self.fingerprints.as_ref()
    }

    pub fn frequencies(&self) -> &Arc<LineFrequencyTable> {
        &self.frequencies
    }

    /// Process a single document, merging line frequencies right away.
    pub fn process(&self, record: DocumentRecord) -> ProcessedDocument {
        let mut batch = LineFrequencyTable::batch(&self.frequencies);
        self.process_with(record, &mut batch)
    }

    /// Process a single document, recording line frequencies in `batch`.
    pub fn process_with(
        &self,
        record: DocumentRecord,
        batch: &mut FrequencyBatch,
    ) -> ProcessedDocument {
        let processed = self.run_stages(record, batch);

        let verdict = processed.verdict();
        self.stats
            .record(verdict.stage(), verdict.reason(), verdict.keep());

        if self.config.checkpoint_every > 0 {
            let nb = self.since_checkpoint.fetch_add(1, Ordering::Relaxed) + 1;
            if nb % self.config.checkpoint_every == 0 {
                if let Err(e) = self.index.checkpoint() {
                    error!("could not checkpoint index after {nb} documents: {e}");
                }
            }
        }

        processed
    }

    fn run_stages(&self, record: DocumentRecord, batch: &mut FrequencyBatch) -> ProcessedDocument {
        if let Some(reason) = self.validate(&record) {
            debug!("{}: rejected at reception ({:?})", record.id(), reason);
            return Document::new(record).into_processed(false, reason);
        }

        let mut doc = Document::new(record);
        for (stage, run) in STAGES.iter() {
            match run(self, &mut doc, batch) {
                Ok(Outcome::Continue) => doc.advance(*stage),
                Ok(Outcome::Reject(reason)) => {
                    doc.advance(*stage);
                    debug!("{}: rejected at {:?} ({:?})", doc.id(), stage, reason);
                    return doc.into_processed(false, reason);
                }
                Err(e) => {
                    error!("{}: errored at {:?}: {}", doc.id(), stage, e);
                    return doc.into_processed(false, Reason::Errored);
                }
            }
        }

        let prune = self.config.prune_blocks;
        let repair = self.repair.as_ref();
        doc.into_processed_with(true, Reason::Kept, |record, verdicts| {
            rebuild(record, verdicts, prune, repair)
        })
    }

    /// Received-stage checks.
    fn validate(&self, record: &DocumentRecord) -> Option<Reason> {
        if record.is_blank() {
            return Some(Reason::Malformed);
        }
        if let Some(filter) = &self.url_filter {
            if !filter.detect(record.url()) {
                return Some(Reason::UrlFiltered);
            }
        }
        if !self.min_length.detect(&record.normalized_text()) {
            return Some(Reason::TooShort);
        }
        None
    }

    /// Retry a store operation with backoff.
    fn with_retries<T>(
        &self,
        doc_id: &str,
        op: impl FnMut() -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        self.backoff.run(op, |attempt, e| {
            self.stats.add_retry();
            warn!("{doc_id}: store error ({e}), retry #{attempt}");
        })
    }

    fn apply(policy: Policy, doc: &mut Document, annotation: &str, reason: Reason) -> Outcome {
        match policy {
            Policy::Filter => Outcome::Reject(reason),
            Policy::Mark => {
                doc.add_annotation(annotation);
                Outcome::Continue
            }
        }
    }

    fn check_exact(
        &self,
        doc: &mut Document,
        _: &mut FrequencyBatch,
    ) -> Result<Outcome, StoreError> {
        let fingerprint = ContentFingerprint::of_text(doc.text());
        let insertion =
            self.with_retries(doc.id(), || self.fingerprints.check_and_insert(&fingerprint))?;

        Ok(match insertion {
            Insertion::New => Outcome::Continue,
            Insertion::Duplicate => Self::apply(
                self.config.policies.exact_duplicate,
                doc,
                "exact_duplicate",
                Reason::ExactDuplicate,
            ),
        })
    }

    fn check_language(
        &self,
        doc: &mut Document,
        _: &mut FrequencyBatch,
    ) -> Result<Outcome, StoreError> {
        let sample: String = doc
            .text()
            .chars()
            .take(self.config.language_sample_chars)
            .collect();
        let identification = self.detector.identify(&sample);
        let confident = identification.is_confident(&self.target, self.config.language_threshold);
        doc.set_identification(identification);

        Ok(if confident {
            Outcome::Continue
        } else {
            Self::apply(
                self.config.policies.language,
                doc,
                "language_mismatch",
                Reason::Language,
            )
        })
    }

    fn check_near(
        &self,
        doc: &mut Document,
        _: &mut FrequencyBatch,
    ) -> Result<Outcome, StoreError> {
        let signature = match self.minhasher.signature(&self.shingler.shingles(doc.text())) {
            Some(signature) => signature,
            None => return Ok(Outcome::Continue),
        };

        let threshold = self.config.near_dup_threshold;
        let matches = self.with_retries(doc.id(), || {
            self.index.query_then_insert(&signature, doc.id(), threshold)
        })?;

        let canonical = match canonical(&matches, self.config.canonical) {
            Some(canonical) => canonical,
            None => return Ok(Outcome::Continue),
        };

        debug!(
            "{} is a near duplicate of {} ({:.3})",
            doc.id(),
            canonical.doc_id,
            canonical.similarity
        );
        doc.set_duplicate_of(canonical.doc_id.clone());

        let outcome = Self::apply(
            self.config.policies.near_duplicate,
            doc,
            "near_duplicate",
            Reason::NearDuplicate,
        );
        if outcome == Outcome::Continue {
            doc.mark_all(BlockMark::NearDuplicate);
        }
        Ok(outcome)
    }

    fn label_boilerplate(
        &self,
        doc: &mut Document,
        batch: &mut FrequencyBatch,
    ) -> Result<Outcome, StoreError> {
        let errors = self.classifier.classify(doc, &self.frequencies);
        self.stats.add_block_errors(errors.len());
        batch.observe(doc.record().blocks());
        Ok(Outcome::Continue)
    }

    fn dedup_blocks(
        &self,
        doc: &mut Document,
        _: &mut FrequencyBatch,
    ) -> Result<Outcome, StoreError> {
        let nb_marked = self.indoc.dedup(doc);
        if nb_marked > 0 {
            debug!("{}: {} repeated blocks", doc.id(), nb_marked);
        }
        Ok(Outcome::Continue)
    }

    fn assess_quality(
        &self,
        doc: &mut Document,
        _: &mut FrequencyBatch,
    ) -> Result<Outcome, StoreError> {
        self.identify_blocks(doc);
        self.annotator.annotate(doc);

        let score = self.quality.assess(doc, &self.target);
        debug!("{}: quality {:?}", doc.id(), score);
        doc.set_quality(score.score);

        Ok(if score.score >= self.config.quality_threshold {
            Outcome::Continue
        } else {
            Self::apply(
                self.config.policies.quality,
                doc,
                "low_quality",
                Reason::LowQuality,
            )
        })
    }

    /// Identify retained content blocks, marking the ones confidently in another language.
    fn identify_blocks(&self, doc: &mut Document) {
        let threshold = self.config.language_threshold;
        let identifications: Vec<_> = doc
            .annotated_blocks()
            .enumerate()
            .filter(|(_, (_, verdict))| {
                verdict.label() == BlockLabel::Content && verdict.is_retained()
            })
            .filter_map(|(idx, (block, _))| {
                let text = block.text();
                if crate::dedup::minhash::tokens(&text).count() < self.config.block_min_tokens {
                    return None;
                }
                Some((idx, self.detector.identify(&text)))
            })
            .collect();

        for (idx, identification) in identifications {
            let foreign =
                identification.prob() >= threshold && !identification.is_language(&self.target);
            let verdict = &mut doc.blocks_mut()[idx];
            if foreign {
                verdict.mark(BlockMark::ForeignLanguage);
            }
            verdict.set_identification(Some(identification));
        }
    }

    /// Persist the index entries inserted since the last checkpoint.
    pub fn checkpoint(&self) -> Result<usize, Error> {
        self.index.checkpoint()
    }
}

/// Pick the canonical match.
fn canonical(matches: &[Match], policy: Canonical) -> Option<&Match> {
    match policy {
        // matches are sorted by insertion order
        Canonical::FirstSeen => matches.first(),
        Canonical::MostSimilar => matches.iter().reduce(|best, m| {
            if m.similarity > best.similarity {
                m
            } else {
                best
            }
        }),
    }
}

/// Emitted record of a kept document.
fn rebuild(
    record: DocumentRecord,
    verdicts: &[BlockVerdict],
    prune: bool,
    repair: Option<&RepairRules>,
) -> DocumentRecord {
    if !prune && repair.is_none() {
        return record;
    }

    let blocks: Vec<Block> = record
        .blocks()
        .iter()
        .zip(verdicts)
        .filter(|(_, verdict)| !prune || verdict.is_retained())
        .map(|(block, verdict)| match repair {
            Some(rules) if verdict.label() == BlockLabel::Content && verdict.is_retained() => {
                rules.repair_block(block)
            }
            _ => block.clone(),
        })
        .collect();

    record.with_blocks(blocks)
}
