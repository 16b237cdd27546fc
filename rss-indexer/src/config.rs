use crate::extractor::compile_selector;
use crate::types::{FeedSourceConfig, FetchConfig, IndexerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use url::Url;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://rss_index.db";

/// TOML-backed configuration: store location, HTTP settings, concurrency limits and the source
/// registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexerConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub sources: Vec<FeedSourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub database_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Sources ingested at the same time.
    pub max_concurrent_sources: usize,
    /// Outbound fetches in flight across all sources.
    pub max_inflight_fetches: usize,
    /// Article bodies processed at once within one source.
    pub per_source_workers: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sources: 4,
            max_inflight_fetches: 8,
            per_source_workers: 4,
        }
    }
}

impl IndexerConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| IndexerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            IndexerError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ingest.max_concurrent_sources == 0
            || self.ingest.max_inflight_fetches == 0
            || self.ingest.per_source_workers == 0
        {
            return Err(IndexerError::Config("ingest limits must be at least 1".to_string()));
        }

        let mut titles = HashSet::new();
        for source in &self.sources {
            validate_source(source)?;
            if !titles.insert(source.title.as_str()) {
                return Err(IndexerError::Config(format!("duplicate source title: {}", source.title)));
            }
        }
        Ok(())
    }

    pub fn source(&self, title: &str) -> Option<&FeedSourceConfig> {
        self.sources.iter().find(|s| s.title == title)
    }
}

fn validate_source(source: &FeedSourceConfig) -> Result<()> {
    if source.title.trim().is_empty() {
        return Err(IndexerError::Config("source with an empty title".to_string()));
    }
    if source.urls.is_empty() {
        return Err(IndexerError::Config(format!("source {} has no urls", source.title)));
    }
    for raw in &source.urls {
        let url = Url::parse(raw)
            .map_err(|e| IndexerError::Config(format!("source {}: bad url {}: {}", source.title, raw, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(IndexerError::Config(format!(
                "source {}: unsupported scheme in {}",
                source.title, raw
            )));
        }
    }
    compile_selector(&source.selector)
        .map_err(|e| IndexerError::Config(format!("source {}: {}", source.title, e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[store]
database_url = "sqlite://test.db"

[ingest]
max_concurrent_sources = 2

[[sources]]
title = "Security Wire"
urls = ["https://news.example.com/feed", "https://news.example.com/feed2"]
description = "Test"
selector = "div.articleBody"

[[sources]]
title = "Advisories"
urls = ["https://advisories.example.com/rss"]
"#;

    #[test]
    fn test_parse_with_defaults() {
        let config = IndexerConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.store.database_url, "sqlite://test.db");
        assert_eq!(config.ingest.max_concurrent_sources, 2);
        assert_eq!(config.ingest.per_source_workers, 4);
        assert_eq!(config.fetch.timeout_seconds, 30);
        assert_eq!(config.sources.len(), 2);

        let advisories = config.source("Advisories").unwrap();
        assert!(!advisories.fetches_body());
        assert_eq!(advisories.feed_link(), "https://advisories.example.com/rss");
    }

    #[test]
    fn test_empty_config_is_valid() {
        let config = IndexerConfig::from_toml("").unwrap();
        assert_eq!(config.store.database_url, DEFAULT_DATABASE_URL);
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_duplicate_titles_rejected() {
        let toml = r#"
[[sources]]
title = "A"
urls = ["https://a.example.com/rss"]

[[sources]]
title = "A"
urls = ["https://b.example.com/rss"]
"#;
        assert!(matches!(IndexerConfig::from_toml(toml), Err(IndexerError::Config(_))));
    }

    #[test]
    fn test_bad_sources_rejected() {
        let no_urls = "[[sources]]\ntitle = \"A\"\nurls = []\n";
        let bad_scheme = "[[sources]]\ntitle = \"A\"\nurls = [\"ftp://a.example.com/rss\"]\n";
        let bad_selector = "[[sources]]\ntitle = \"A\"\nurls = [\"https://a.example.com\"]\nselector = \"div[[\"\n";
        for toml in [no_urls, bad_scheme, bad_selector] {
            assert!(IndexerConfig::from_toml(toml).is_err(), "accepted: {toml}");
        }
    }

    #[test]
    fn test_shipped_registry_is_valid() {
        let config = IndexerConfig::load(concat!(env!("CARGO_MANIFEST_DIR"), "/config/sources.toml")).unwrap();
        assert!(config.source("Hacker News").is_some());
        assert!(config.sources.iter().any(|s| s.urls.len() > 1));
    }
}
