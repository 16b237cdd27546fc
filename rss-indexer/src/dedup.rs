use crate::types::Entry;
use std::collections::HashSet;
use tracing::debug;

/// Drops entries whose title is already stored for one source.
///
/// Titles are added as entries pass, so an entry repeated inside the same feed run is also dropped.
#[derive(Debug, Default)]
pub struct DedupFilter {
    seen: HashSet<String>,
}

impl DedupFilter {
    pub fn new(seen: HashSet<String>) -> Self {
        Self { seen }
    }

    pub fn is_new(&mut self, entry: &Entry) -> bool {
        self.seen.insert(entry.title.clone())
    }

    pub fn filter(&mut self, entries: Vec<Entry>) -> Vec<Entry> {
        let before = entries.len();
        let fresh: Vec<Entry> = entries.into_iter().filter(|e| self.is_new(e)).collect();
        if fresh.len() < before {
            debug!("Filtered {} already seen entries", before - fresh.len());
        }
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str) -> Entry {
        Entry {
            title: title.to_string(),
            link: format!("https://example.com/{}", title.len()),
            published: String::new(),
            summary: String::new(),
        }
    }

    #[test]
    fn test_known_titles_removed() {
        let seen = HashSet::from(["Old story".to_string()]);
        let mut filter = DedupFilter::new(seen);
        let fresh = filter.filter(vec![entry("Old story"), entry("New story")]);
        let titles: Vec<_> = fresh.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["New story"]);
    }

    #[test]
    fn test_repeats_within_run_removed() {
        let mut filter = DedupFilter::default();
        let fresh = filter.filter(vec![entry("A"), entry("B"), entry("A")]);
        assert_eq!(fresh.len(), 2);
    }

    #[test]
    fn test_title_only_match() {
        let mut filter = DedupFilter::new(HashSet::from(["Same".to_string()]));
        let mut other = entry("Same");
        other.link = "https://elsewhere.example.com/".to_string();
        assert!(!filter.is_new(&other));
    }
}
