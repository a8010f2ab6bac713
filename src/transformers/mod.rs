/*! Document transformers.

Block labeling (boilerplate, line frequencies), quality scoring, text repair
and OSCAR-style annotators (`tiny`, `noisy`, `header`/`footer`).
!*/
mod annotate;
mod boilerplate;
mod frequency;
mod header;
mod noisy;
mod quality;
mod repair;
mod tiny;

pub use annotate::{Annotate, Annotator};
pub use boilerplate::{BlockFeatures, BoilerplateClassifier, ClassifierError, Position};
pub use frequency::{line_hash, FrequencyBatch, LineFrequencyTable};
pub use header::Header;
pub use noisy::Noisy;
pub use quality::{QualityAssessor, QualityScore};
pub use repair::{DictionarySubwords, HeuristicSubwords, RepairRules, SubwordCheck};
pub use tiny::TinyDocument;
