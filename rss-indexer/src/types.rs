use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Static descriptor of one feed source. Adding a source is a config change, not a code change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedSourceConfig {
    pub title: String,
    pub urls: Vec<String>,
    /// Landing link stored with the source row. Falls back to the first poll URL.
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub description: String,
    /// CSS selector of the element holding the article body. Empty means "do not fetch bodies".
    #[serde(default)]
    pub selector: String,
    /// Summaries arrive as HTML; keep only the leading text run.
    #[serde(default)]
    pub strip_summary_markup: bool,
}

impl FeedSourceConfig {
    pub fn new(title: impl Into<String>, url: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            urls: vec![url.into()],
            link: None,
            description: String::new(),
            selector: selector.into(),
            strip_summary_markup: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.urls.push(url.into());
        self
    }

    pub fn feed_link(&self) -> &str {
        self.link
            .as_deref()
            .or_else(|| self.urls.first().map(String::as_str))
            .unwrap_or("")
    }

    pub fn fetches_body(&self) -> bool {
        !self.selector.trim().is_empty()
    }
}

/// One raw item pulled from a feed document.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub title: String,
    pub link: String,
    pub published: String,
    pub summary: String,
}

/// Canonical article. Identity is (`source`, `title`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub source: String,
    pub title: String,
    pub link: String,
    /// `YYYY-MM-DD` when the published string was recognized, the original string otherwise.
    pub pub_date: String,
    pub description: String,
    pub raw_content: String,
    pub tags: BTreeSet<String>,
    pub term_frequencies: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub case_sensitive: bool,
}

impl Tag {
    pub fn new(name: impl Into<String>, case_sensitive: bool) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            case_sensitive,
        }
    }
}

/// One row of a taxonomy import file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyRow {
    pub tag_name: String,
    #[serde(default)]
    pub tag_desc: String,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub set_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagSetRow {
    pub set_name: String,
    #[serde(default)]
    pub set_desc: String,
}

/// Row returned by boolean term search.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ArticleHit {
    pub article_id: i64,
    pub title: String,
    pub link: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryOp {
    #[default]
    And,
    Or,
    /// Exactly one of the terms is present.
    Xor,
    /// Not every term is present.
    Nand,
}

impl FromStr for QueryOp {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "and" => Ok(Self::And),
            "or" => Ok(Self::Or),
            "xor" => Ok(Self::Xor),
            "nand" => Ok(Self::Nand),
            other => Err(format!("unknown query operator: {other}")),
        }
    }
}

impl fmt::Display for QueryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
            Self::Nand => "NAND",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_redirects: usize,
    pub max_body_size_mb: usize,
    /// Minimum gap between two requests to the same host.
    pub min_host_interval_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string(),
            timeout_seconds: 30,
            max_redirects: 5,
            max_body_size_mb: 10,
            min_host_interval_ms: 250,
        }
    }
}

/// Outcome of one `persist_articles` batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistReport {
    pub inserted: Vec<String>,
    pub duplicates: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl PersistReport {
    pub fn inserted_count(&self) -> usize {
        self.inserted.len()
    }
}

/// Rows newly created by a taxonomy import. Rows that already existed are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaxonomyReport {
    pub tags: usize,
    pub sets: usize,
    pub memberships: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SourceReport {
    pub source: String,
    pub entries_seen: usize,
    pub new_entries: usize,
    pub no_entries: bool,
    pub feed_failures: usize,
    pub fetch_failures: usize,
    pub persist: PersistReport,
}

#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub sources: Vec<SourceReport>,
    pub failed_sources: Vec<(String, String)>,
}

impl IngestReport {
    pub fn total_inserted(&self) -> usize {
        self.sources.iter().map(|s| s.persist.inserted_count()).sum()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IndexerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid selector {selector:?}: {reason}")]
    Selector { selector: String, reason: String },

    #[error("Invalid tag pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Response too large: {size_mb}MB")]
    TooLarge { size_mb: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, IndexerError>;
