use crate::types::{Result, Tag};
use regex::{RegexSet, RegexSetBuilder};
use std::collections::BTreeSet;

/// Matches article bodies against the tag taxonomy.
///
/// All tag patterns are compiled into one `RegexSet`, so a body is scanned once no matter how many
/// tags exist. Each tag keeps its own case sensitivity.
pub struct TagClassifier {
    names: Vec<String>,
    patterns: RegexSet,
}

impl TagClassifier {
    pub fn new(tags: &[Tag]) -> Result<Self> {
        let mut names = Vec::new();
        let mut patterns = Vec::new();

        // Emitted names must equal the stored TAG rows; only the pattern is built from the
        // trimmed text.
        for tag in tags {
            let text = tag.name.trim();
            if text.is_empty() || names.contains(&tag.name) {
                continue;
            }
            names.push(tag.name.clone());
            patterns.push(tag_pattern(text, tag.case_sensitive));
        }

        let patterns = RegexSetBuilder::new(&patterns)
            .size_limit(64 * 1024 * 1024)
            .build()?;
        Ok(Self { names, patterns })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Distinct names of every tag found in `body`.
    pub fn classify(&self, body: &str) -> BTreeSet<String> {
        if self.names.is_empty() || body.is_empty() {
            return BTreeSet::new();
        }
        self.patterns
            .matches(body)
            .into_iter()
            .map(|i| self.names[i].clone())
            .collect()
    }
}

/// `\b` only makes sense next to a word character, so names that start or end with punctuation
/// (`C++`, `.NET`) are delimited by a non-word character or the text edge instead.
fn tag_pattern(name: &str, case_sensitive: bool) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let starts_word = name.chars().next().map_or(false, is_word);
    let ends_word = name.chars().last().map_or(false, is_word);

    let flags = if case_sensitive { "" } else { "(?i)" };
    let lead = if starts_word { r"\b" } else { r"(?:^|\W)" };
    let trail = if ends_word { r"\b" } else { r"(?:\W|$)" };

    format!("{}{}{}{}", flags, lead, regex::escape(name), trail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(set: &BTreeSet<String>) -> Vec<&str> {
        set.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_word_boundary() {
        let classifier = TagClassifier::new(&[Tag::new("AI", true)]).unwrap();
        assert!(classifier.classify("Campaign against the grid").is_empty());
        assert_eq!(names(&classifier.classify("New AI models ship")), vec!["AI"]);
        assert_eq!(names(&classifier.classify("(AI)")), vec!["AI"]);
    }

    #[test]
    fn test_case_sensitivity_per_tag() {
        let classifier = TagClassifier::new(&[
            Tag::new("AI", true),
            Tag::new("ransomware", false),
        ])
        .unwrap();

        let found = classifier.classify("Ransomware gangs and ai tooling");
        assert_eq!(names(&found), vec!["ransomware"]);

        let found = classifier.classify("RANSOMWARE meets AI");
        assert_eq!(names(&found), vec!["AI", "ransomware"]);
    }

    #[test]
    fn test_multiword_and_punctuation() {
        let classifier = TagClassifier::new(&[
            Tag::new("zero day", false),
            Tag::new("C++", true),
            Tag::new(".NET", true),
        ])
        .unwrap();

        let found = classifier.classify("A Zero Day in C++ code and the .NET runtime");
        assert_eq!(names(&found), vec![".NET", "C++", "zero day"]);
        assert!(classifier.classify("C+ and ASP.NETCore").is_empty());
    }

    #[test]
    fn test_repeated_matches_are_deduplicated() {
        let classifier = TagClassifier::new(&[Tag::new("CVE", true), Tag::new("CVE", true)]).unwrap();
        assert_eq!(classifier.len(), 1);
        assert_eq!(names(&classifier.classify("CVE one, CVE two")), vec!["CVE"]);
    }

    #[test]
    fn test_padded_name_is_emitted_as_stored() {
        let classifier = TagClassifier::new(&[Tag::new(" AI ", true)]).unwrap();
        assert_eq!(names(&classifier.classify("New AI models ship")), vec![" AI "]);
    }

    #[test]
    fn test_empty_taxonomy() {
        let classifier = TagClassifier::new(&[]).unwrap();
        assert!(classifier.is_empty());
        assert!(classifier.classify("anything").is_empty());
    }
}
