//! Turns article text into the lowercase lemma stream used by the inverted index.

mod lemmatizer;
mod stopwords;

use lemmatizer::Lemmatizer;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+(?:[-'’]\w+)*").expect("valid token regex"));

/// Contractions split off the way NLTK's tokenizer does (`Microsoft's` gives `Microsoft` + `'s`).
const CLITICS: &[&str] = &["'s", "'re", "'ve", "'ll", "'d", "'m", "n't"];

static STOPWORDS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| stopwords::ENGLISH.iter().copied().collect());

static LEMMATIZER: Lazy<Lemmatizer> = Lazy::new(Lemmatizer::new);

/// Result of normalizing one text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedText {
    /// Lemmas in document order, repeats kept.
    pub tokens: Vec<String>,
    pub term_frequencies: BTreeMap<String, u32>,
}

impl NormalizedText {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Tokenize, drop non-alphabetic tokens and English stopwords, then lemmatize.
///
/// Deterministic for a given input and safe to call from any thread.
pub fn normalize_text(text: &str) -> NormalizedText {
    let cleaned = text.replace('\\', "").replace('’', "'");
    let mut out = NormalizedText::default();

    for m in TOKEN.find_iter(&cleaned) {
        let raw = strip_clitic(m.as_str());
        if !raw.chars().all(char::is_alphabetic) {
            continue;
        }
        let lower = raw.to_lowercase();
        if STOPWORDS.contains(lower.as_str()) {
            continue;
        }
        let lemma = LEMMATIZER.lemmatize(&lower);
        *out.term_frequencies.entry(lemma.clone()).or_insert(0) += 1;
        out.tokens.push(lemma);
    }

    out
}

/// Normalizes free-form query input into distinct search terms, preserving first-seen order.
pub fn normalize_terms<S: AsRef<str>>(terms: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for term in terms {
        for token in normalize_text(term.as_ref()).tokens {
            if seen.insert(token.clone()) {
                out.push(token);
            }
        }
    }
    out
}

/// The clitic itself is never alphabetic, so only the stem is kept.
fn strip_clitic(token: &str) -> &str {
    let lower = token.to_ascii_lowercase();
    CLITICS
        .iter()
        .find(|clitic| lower.len() > clitic.len() && lower.ends_with(*clitic))
        .map_or(token, |clitic| &token[..token.len() - clitic.len()])
}
