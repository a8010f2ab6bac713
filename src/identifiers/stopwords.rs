/*! Stopword based language identification.

Each supported language has a short list of very frequent function words.
Stopwords shared by several languages split their weight between them to pick
the best language. Its confidence is the share of the found stopwords that
belong to its profile.

This is cheap and works well on paragraphs of running text, which is what
remains once boilerplate has been stripped. It abstains on texts with too few
stopwords (titles, lists, menus).
!*/
use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;
use oxilangtag::LanguageTag;
use unicode_segmentation::UnicodeSegmentation;

use super::{Detect, Identification};

/// (language, stopwords)
const PROFILES: [(&str, &[&str]); 10] = [
    (
        "de",
        &[
            "aber", "als", "am", "auch", "auf", "aus", "bei", "bin", "bis", "das", "dass", "dem",
            "den", "der", "des", "die", "diese", "dieser", "doch", "durch", "ein", "eine", "einem",
            "einen", "einer", "eines", "er", "es", "für", "haben", "hat", "hatte", "ich", "ihr",
            "im", "in", "ist", "kann", "mehr", "mit", "nach", "nicht", "noch", "nur", "oder",
            "sehr", "sich", "sie", "sind", "über", "und", "uns", "von", "vom", "war", "weil",
            "wenn", "werden", "wie", "wir", "wird", "wurde", "zu", "zum", "zur",
        ],
    ),
    (
        "en",
        &[
            "a", "about", "all", "an", "and", "are", "as", "at", "be", "been", "but", "by", "can",
            "for", "from", "had", "has", "have", "he", "her", "his", "i", "if", "in", "into", "is",
            "it", "its", "more", "not", "of", "on", "or", "our", "she", "so", "that", "the",
            "their", "there", "they", "this", "to", "was", "we", "were", "what", "which", "who",
            "will", "with", "would", "you",
        ],
    ),
    (
        "fr",
        &[
            "a", "au", "aux", "avec", "ce", "cette", "dans", "de", "des", "du", "elle", "en",
            "est", "et", "été", "être", "il", "ils", "je", "la", "le", "les", "leur", "mais",
            "ne", "nous", "ou", "par", "pas", "plus", "pour", "que", "qui", "sa", "se", "ses",
            "son", "sont", "sur", "un", "une", "vous",
        ],
    ),
    (
        "nl",
        &[
            "aan", "als", "bij", "dat", "de", "deze", "die", "dit", "door", "een", "en", "er",
            "het", "hij", "hoe", "ik", "in", "is", "je", "kan", "maar", "met", "naar", "niet",
            "nog", "of", "om", "ook", "op", "over", "te", "tot", "uit", "van", "voor", "was",
            "wat", "we", "wij", "worden", "wordt", "zijn", "zich", "ze", "zo",
        ],
    ),
    (
        "es",
        &[
            "a", "al", "como", "con", "de", "del", "el", "en", "es", "está", "este", "esta", "la",
            "las", "le", "lo", "los", "más", "para", "pero", "por", "que", "se", "ser", "sin",
            "son", "su", "sus", "también", "un", "una", "y", "ya",
        ],
    ),
    (
        "it",
        &[
            "a", "al", "alla", "anche", "che", "come", "con", "da", "dei", "del", "della", "di",
            "e", "è", "gli", "ha", "i", "il", "in", "la", "le", "lo", "ma", "nel", "nella",
            "non", "per", "più", "si", "sono", "su", "un", "una", "uno",
        ],
    ),
    (
        "sv",
        &[
            "att", "av", "de", "dem", "den", "det", "en", "ett", "för", "från", "har", "hon",
            "han", "i", "inte", "jag", "kan", "man", "med", "men", "och", "om", "på", "sig",
            "som", "så", "till", "var", "vi", "är", "också", "efter", "eller",
        ],
    ),
    (
        "da",
        &[
            "af", "at", "de", "dem", "den", "der", "det", "en", "er", "et", "for", "fra", "har",
            "hun", "han", "i", "ikke", "jeg", "kan", "med", "men", "og", "om", "på", "sig",
            "som", "så", "til", "var", "vi", "være", "også", "efter", "eller",
        ],
    ),
    (
        "pl",
        &[
            "a", "ale", "aby", "być", "do", "dla", "go", "i", "ich", "jak", "jest", "jego",
            "już", "na", "nie", "o", "od", "oraz", "po", "przez", "się", "są", "tak", "także",
            "to", "w", "we", "z", "za", "że", "ze", "czy",
        ],
    ),
    (
        "pt",
        &[
            "a", "ao", "as", "com", "como", "da", "das", "de", "do", "dos", "e", "é", "em",
            "está", "foi", "mais", "mas", "na", "nas", "no", "nos", "não", "o", "os", "para",
            "pela", "pelo", "por", "que", "se", "seu", "sua", "também", "um", "uma",
        ],
    ),
];

lazy_static! {
    /// stopword -> indices of the languages having it
    static ref STOPWORDS: HashMap<&'static str, Vec<usize>> = {
        let mut stopwords: HashMap<&'static str, Vec<usize>> = HashMap::new();
        for (lang_idx, (_, words)) in PROFILES.iter().enumerate() {
            for word in words.iter() {
                stopwords.entry(*word).or_default().push(lang_idx);
            }
        }
        stopwords
    };
    static ref LANGUAGES: Vec<LanguageTag<String>> = PROFILES
        .iter()
        .map(|(lang, _)| LanguageTag::parse(lang.to_string()).expect("profile tags are valid"))
        .collect();
}

/// true if the (lowercase) word is a stopword of any supported language.
pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains_key(word)
}

/// Stopwords of a language, if supported.
pub fn stopwords_of(lang: &LanguageTag<String>) -> Option<HashSet<&'static str>> {
    PROFILES
        .iter()
        .find(|(code, _)| lang.primary_language().eq_ignore_ascii_case(code))
        .map(|(_, words)| words.iter().copied().collect())
}

/// Languages with a stopword profile.
pub fn supported_languages() -> &'static [LanguageTag<String>] {
    &LANGUAGES
}

pub struct StopwordDetector {
    min_stopwords: usize,
    min_tokens: usize,
}

impl Default for StopwordDetector {
    fn default() -> Self {
        Self {
            min_stopwords: 3,
            min_tokens: 5,
        }
    }
}

impl StopwordDetector {
    pub fn new(min_stopwords: usize, min_tokens: usize) -> Self {
        Self {
            min_stopwords,
            min_tokens,
        }
    }
}

impl Detect for StopwordDetector {
    fn name(&self) -> &'static str {
        "stopwords"
    }

    fn detect(&self, text: &str) -> Option<Identification> {
        let mut scores = [0f32; PROFILES.len()];
        let mut nb_tokens = 0;
        let mut found: Vec<&Vec<usize>> = Vec::new();

        for word in text.unicode_words() {
            nb_tokens += 1;
            if let Some(langs) = STOPWORDS.get(word.to_lowercase().as_str()) {
                let weight = 1.0 / langs.len() as f32;
                for lang_idx in langs {
                    scores[*lang_idx] += weight;
                }
                found.push(langs);
            }
        }

        if nb_tokens < self.min_tokens || found.len() < self.min_stopwords {
            return None;
        }

        let (best, _) = scores
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))?;
        let nb_consistent = found.iter().filter(|langs| langs.contains(&best)).count();

        Some(Identification::new(
            LANGUAGES[best].clone(),
            nb_consistent as f32 / found.len() as f32,
        ))
    }
}
