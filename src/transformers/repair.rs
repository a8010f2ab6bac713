/*! Text repair for surviving content blocks.

Two rules, applied per language (German and English):

- hyphenation: `Wort-` at the end of a line followed by `fortsetzung` is joined
  into `Wortfortsetzung`, provided the [SubwordCheck] accepts the two fragments.
- run-together sentences: `gut.Dann` becomes `gut. Dann`.
!*/
use std::{collections::HashSet, fs::File, io::BufRead, io::BufReader, path::Path};

use oxilangtag::LanguageTag;

use crate::error::Error;
use crate::pipelines::types::Block;

/// Decides whether two fragments around a line-end hyphen form a single word.
pub trait SubwordCheck: Send + Sync {
    fn is_valid_join(&self, left: &str, right: &str) -> bool;
}

/// Both fragments alphabetic, the left one has at least two letters
/// and the right one starts lowercase.
///
/// Capitalized right fragments are kept apart since they usually are a compound
/// (`Ende-Effekt`) or a new noun rather than a continuation.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicSubwords;

impl SubwordCheck for HeuristicSubwords {
    fn is_valid_join(&self, left: &str, right: &str) -> bool {
        left.chars().count() >= 2
            && left.chars().all(char::is_alphabetic)
            && !right.is_empty()
            && right.chars().all(char::is_alphabetic)
            && right.chars().next().map(char::is_lowercase).unwrap_or(false)
    }
}

/// Accepts a join only if the joined word is in a word list.
#[derive(Debug, Default, Clone)]
pub struct DictionarySubwords {
    words: HashSet<String>,
}

impl DictionarySubwords {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            words: words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    /// One word per line.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let reader = BufReader::new(File::open(path)?);
        let words = reader.lines().collect::<Result<Vec<_>, _>>()?;
        debug!("loaded {} words from {:?}", words.len(), path);
        Ok(Self::new(words))
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl SubwordCheck for DictionarySubwords {
    fn is_valid_join(&self, left: &str, right: &str) -> bool {
        self.words.contains(&format!("{}{}", left, right).to_lowercase())
    }
}

// prefixes conventionally kept hyphenated in English (self-evident, non-trivial)
const EN_HYPHEN_PREFIXES: [&str; 10] = [
    "self", "non", "co", "ex", "anti", "pre", "post", "semi", "multi", "well",
];

pub struct RepairRules {
    check: Box<dyn SubwordCheck>,
    kept_prefixes: &'static [&'static str],
}

impl RepairRules {
    /// Rules for a supported language (`de`, `en`), using [HeuristicSubwords].
    pub fn for_language(lang: &LanguageTag<String>) -> Option<Self> {
        let kept_prefixes: &'static [&'static str] =
            match lang.primary_language().to_ascii_lowercase().as_str() {
                "de" => &[],
                "en" => &EN_HYPHEN_PREFIXES,
                _ => return None,
            };

        Some(Self {
            check: Box::new(HeuristicSubwords),
            kept_prefixes,
        })
    }

    /// Replace the subword check.
    pub fn with_check(mut self, check: Box<dyn SubwordCheck>) -> Self {
        self.check = check;
        self
    }

    /// Parts to join if `line` ends with a hyphenated word continued on `next`.
    fn hyphenated<'a>(&self, line: &'a str, next: &'a str) -> Option<(&'a str, &'a str)> {
        let head = line.trim_end().strip_suffix('-')?;
        if !head.chars().last().map(char::is_alphabetic).unwrap_or(false) {
            return None;
        }
        let left = head.split_whitespace().last()?;
        let right = next.split_whitespace().next()?;
        let right = right.trim_end_matches(|c: char| c.is_ascii_punctuation());

        let lowercase_left = left.to_lowercase();
        if self.kept_prefixes.contains(&lowercase_left.as_str()) {
            return None;
        }

        if self.check.is_valid_join(left, right) {
            Some((head, next.trim_start()))
        } else {
            None
        }
    }

    /// Join lines split on a hyphenated word.
    ///
    /// The continuation is appended to the hyphenated line, and the next line is consumed.
    pub fn repair_hyphenation(&self, lines: &[String]) -> Vec<String> {
        let mut repaired: Vec<String> = Vec::with_capacity(lines.len());
        let mut current: Option<String> = None;

        for line in lines {
            current = match current.take() {
                None => Some(line.clone()),
                Some(previous) => match self.hyphenated(&previous, line) {
                    Some((head, tail)) => Some(format!("{}{}", head, tail)),
                    None => {
                        repaired.push(previous);
                        Some(line.clone())
                    }
                },
            };
        }
        repaired.extend(current);
        repaired
    }

    /// Insert a space after `.`, `!` or `?` between a lowercase and an uppercase letter.
    pub fn repair_run_together(&self, line: &str) -> String {
        let chars: Vec<char> = line.chars().collect();
        let mut repaired = String::with_capacity(line.len() + 4);
        for (idx, c) in chars.iter().enumerate() {
            repaired.push(*c);
            if idx > 0
                && matches!(c, '.' | '!' | '?')
                && chars[idx - 1].is_lowercase()
                && chars.get(idx + 1).map(|n| n.is_uppercase()).unwrap_or(false)
            {
                repaired.push(' ');
            }
        }
        repaired
    }

    pub fn repair_block(&self, block: &Block) -> Block {
        self.repair_hyphenation(block.lines())
            .iter()
            .map(|line| self.repair_run_together(line))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(lang: &str) -> RepairRules {
        RepairRules::for_language(&LanguageTag::parse(lang.to_string()).unwrap()).unwrap()
    }

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(String::from).collect()
    }

    #[test]
    fn supported_languages() {
        let tag = |t: &str| LanguageTag::parse(t.to_string()).unwrap();
        assert!(RepairRules::for_language(&tag("de-AT")).is_some());
        assert!(RepairRules::for_language(&tag("fr")).is_none());
    }

    #[test]
    fn hyphenation() {
        let r = rules("de");
        assert_eq!(
            r.repair_hyphenation(&lines("Wort-\nfortsetzung")),
            vec!["Wortfortsetzung"]
        );
        assert_eq!(
            r.repair_hyphenation(&lines("Das ist eine Wort-\nfortsetzung, die weitergeht.")),
            vec!["Das ist eine Wortfortsetzung, die weitergeht."]
        );
    }

    #[test]
    fn hyphenation_kept() {
        let r = rules("de");
        assert_eq!(
            r.repair_hyphenation(&lines("Ende-\nEffekt")),
            lines("Ende-\nEffekt")
        );
        // single letter
        assert_eq!(r.repair_hyphenation(&lines("A-\nbis")), lines("A-\nbis"));
        // not a letter before the hyphen
        assert_eq!(r.repair_hyphenation(&lines("2021-\nheute")), lines("2021-\nheute"));
        // last line
        assert_eq!(r.repair_hyphenation(&lines("Wort-")), lines("Wort-"));
    }

    #[test]
    fn hyphenation_chained() {
        let r = rules("de");
        assert_eq!(
            r.repair_hyphenation(&lines("Donau-\ndampf-\nschiff")),
            vec!["Donaudampfschiff"]
        );
    }

    #[test]
    fn english_prefixes() {
        let r = rules("en");
        assert_eq!(
            r.repair_hyphenation(&lines("a self-\nevident truth")),
            lines("a self-\nevident truth")
        );
        assert_eq!(
            r.repair_hyphenation(&lines("an exam-\nple of this")),
            vec!["an example of this"]
        );
    }

    #[test]
    fn dictionary() {
        let dict = DictionarySubwords::new(["Wortfortsetzung"]);
        assert!(dict.is_valid_join("Wort", "fortsetzung"));
        assert!(!dict.is_valid_join("Haus", "tür"));

        let r = rules("de").with_check(Box::new(dict));
        assert_eq!(
            r.repair_hyphenation(&lines("Haus-\ntür")),
            lines("Haus-\ntür")
        );
    }

    #[test]
    fn dictionary_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.txt");
        std::fs::write(&path, "Haustür\n\nWortfortsetzung\n").unwrap();
        let dict = DictionarySubwords::from_path(&path).unwrap();
        assert_eq!(dict.len(), 2);
        assert!(dict.is_valid_join("Haus", "tür"));
    }

    #[test]
    fn run_together() {
        let r = rules("de");
        assert_eq!(r.repair_run_together("gut.Dann"), "gut. Dann");
        assert_eq!(r.repair_run_together("Was?Nein!Doch"), "Was? Nein! Doch");
        assert_eq!(r.repair_run_together("Version 2.Beta"), "Version 2.Beta");
        assert_eq!(r.repair_run_together("gut. Dann"), "gut. Dann");
        assert_eq!(r.repair_run_together("www.example.de"), "www.example.de");
    }

    #[test]
    fn block() {
        let r = rules("de");
        let block = Block::from_iter(["Es war gut.Dann kam die Wort-", "fortsetzung."]);
        assert_eq!(
            r.repair_block(&block).lines(),
            &["Es war gut. Dann kam die Wortfortsetzung.".to_string()]
        );
    }
}
