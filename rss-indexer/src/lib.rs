pub mod types;
pub mod config;
pub mod traits;
pub mod fetcher;
pub mod parser;
pub mod dates;
pub mod text;
pub mod extractor;
pub mod classifier;
pub mod dedup;
pub mod store;
pub mod query;
pub mod coordinator;
pub mod taxonomy;

pub use types::*;
pub use config::{IndexerConfig, IngestConfig, StoreConfig};
pub use traits::PageFetcher;
pub use fetcher::HttpFetcher;
pub use parser::FeedParser;
pub use dates::normalize_date;
pub use text::{normalize_terms, normalize_text, NormalizedText};
pub use extractor::{ContentExtractor, Extraction};
pub use classifier::TagClassifier;
pub use dedup::DedupFilter;
pub use store::ArticleStore;
pub use query::QueryEngine;
pub use coordinator::IngestionCoordinator;
