//! Detection strategies and their chaining.
use super::Identification;

/// Language detection strategy.
pub trait Detect: Send + Sync {
    /// Identify the language of the text, or abstain.
    fn detect(&self, text: &str) -> Option<Identification>;

    /// Name used in logs.
    fn name(&self) -> &'static str;
}

/// Terminal strategy: undetermined language with null confidence.
pub struct ConservativeReject;

impl Detect for ConservativeReject {
    fn name(&self) -> &'static str {
        "reject"
    }

    fn detect(&self, _text: &str) -> Option<Identification> {
        Some(Identification::undetermined())
    }
}

/// Always returns the same identification.
///
/// Useful for sources whose language is known beforehand.
pub struct Fixed(Identification);

impl Fixed {
    pub fn new(identification: Identification) -> Self {
        Self(identification)
    }
}

impl Detect for Fixed {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn detect(&self, _text: &str) -> Option<Identification> {
        Some(self.0.clone())
    }
}

/// Ordered list of strategies. The first one that does not abstain wins,
/// [ConservativeReject] closes the chain.
pub struct DetectorChain(Vec<Box<dyn Detect>>);

impl DetectorChain {
    pub fn add(&mut self, detector: Box<dyn Detect>) -> &mut DetectorChain {
        self.0.push(detector);
        self
    }

    /// Names of the strategies, in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.0
            .iter()
            .map(|detector| detector.name())
            .chain(std::iter::once(ConservativeReject.name()))
            .collect()
    }

    pub fn identify(&self, text: &str) -> Identification {
        self.0
            .iter()
            .find_map(|detector| detector.detect(text))
            .unwrap_or_else(Identification::undetermined)
    }
}

impl Default for DetectorChain {
    fn default() -> Self {
        Self(vec![])
    }
}

#[cfg(test)]
mod tests {
    use oxilangtag::LanguageTag;

    use super::*;
    use crate::identifiers::{ScriptDetector, StopwordDetector};

    struct Abstain;
    impl Detect for Abstain {
        fn name(&self) -> &'static str {
            "abstain"
        }
        fn detect(&self, _text: &str) -> Option<Identification> {
            None
        }
    }

    fn fixed(lang: &str, prob: f32) -> Box<dyn Detect> {
        Box::new(Fixed::new(Identification::new(
            LanguageTag::parse(lang.to_string()).unwrap(),
            prob,
        )))
    }

    #[test]
    fn empty_chain_rejects() {
        let id = DetectorChain::default().identify("whatever");
        assert_eq!(id.label().as_str(), "und");
        assert_eq!(id.prob(), 0.0);
    }

    #[test]
    fn first_answer_wins() {
        let mut chain = DetectorChain::default();
        chain
            .add(Box::new(Abstain))
            .add(fixed("nl", 0.6))
            .add(fixed("de", 1.0));
        let id = chain.identify("tekst");
        assert_eq!(id.label().as_str(), "nl");
        assert_eq!(chain.names(), vec!["abstain", "fixed", "fixed", "reject"]);
    }

    #[test]
    fn stopwords_then_script() {
        let mut chain = DetectorChain::default();
        chain
            .add(Box::new(StopwordDetector::default()))
            .add(Box::new(ScriptDetector::default()));
        assert_eq!(
            chain
                .identify("Καλημέρα σε όλους τους φίλους μας")
                .label()
                .as_str(),
            "el"
        );
        assert_eq!(chain.identify("1234 5678").label().as_str(), "und");
    }
}
