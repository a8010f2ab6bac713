//! Script based identification, for scripts that are used by a single language.
use std::collections::HashMap;

use oxilangtag::LanguageTag;
use unicode_script::{Script, UnicodeScript};

use super::{Detect, Identification};

/// Scripts that identify a language on their own.
fn language_of(script: Script) -> Option<&'static str> {
    match script {
        Script::Greek => Some("el"),
        Script::Hebrew => Some("he"),
        Script::Thai => Some("th"),
        Script::Hangul => Some("ko"),
        Script::Hiragana | Script::Katakana => Some("ja"),
        Script::Armenian => Some("hy"),
        Script::Georgian => Some("ka"),
        Script::Khmer => Some("km"),
        Script::Lao => Some("lo"),
        Script::Sinhala => Some("si"),
        _ => None,
    }
}

pub struct ScriptDetector {
    min_letters: usize,
}

impl Default for ScriptDetector {
    fn default() -> Self {
        Self { min_letters: 10 }
    }
}

impl Detect for ScriptDetector {
    fn name(&self) -> &'static str {
        "script"
    }

    fn detect(&self, text: &str) -> Option<Identification> {
        let mut counts: HashMap<Script, usize> = HashMap::new();
        let mut nb_letters = 0;
        for c in text.chars().filter(|c| c.is_alphabetic()) {
            nb_letters += 1;
            // kana and kanji are mixed in japanese texts
            let script = match c.script() {
                Script::Katakana => Script::Hiragana,
                script => script,
            };
            *counts.entry(script).or_default() += 1;
        }

        if nb_letters < self.min_letters {
            return None;
        }

        let (script, count) = counts.into_iter().max_by_key(|(_, count)| *count)?;
        let lang = language_of(script)?;
        let label = LanguageTag::parse(lang.to_string()).ok()?;
        Some(Identification::new(label, count as f32 / nb_letters as f32))
    }
}
