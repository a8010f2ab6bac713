/*! Language identification.

Identification is done by a [DetectorChain] of [Detect] strategies:
the first strategy that does not abstain wins, and a chain where every strategy abstains
yields an undetermined (`und`) identification with a null confidence.

Shipped strategies:
- [StopwordDetector], built-in stopword profiles for ten european languages,
- [ScriptDetector], for scripts used by a single language,
- `FastTextDetector` (cargo feature `fasttext`), using a [fasttext](https://fasttext.cc) model.
!*/
mod detector;
#[cfg(feature = "fasttext")]
mod model;
mod identification;
mod script;
pub mod stopwords;

pub use detector::{ConservativeReject, Detect, DetectorChain, Fixed};
#[cfg(feature = "fasttext")]
pub use model::FastTextDetector;
pub use identification::{Identification, IdentificationSer};
pub use script::ScriptDetector;
pub use stopwords::StopwordDetector;

impl DetectorChain {
    /// Stopwords, then script.
    pub fn with_builtin() -> Self {
        let mut chain = Self::default();
        chain
            .add(Box::new(StopwordDetector::default()))
            .add(Box::new(ScriptDetector::default()));
        chain
    }
}
