use crate::classifier::TagClassifier;
use crate::config::IngestConfig;
use crate::dates::normalize_date;
use crate::dedup::DedupFilter;
use crate::extractor::{compile_selector, leading_text, ContentExtractor, Extraction};
use crate::parser::FeedParser;
use crate::store::ArticleStore;
use crate::text::normalize_text;
use crate::traits::PageFetcher;
use crate::types::{Article, Entry, FeedSourceConfig, IndexerError, IngestReport, Result, SourceReport};
use futures::stream::{self, StreamExt};
use scraper::Selector;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, instrument, warn};

/// Drives fetch, dedup, extract, normalize, classify and persist for each configured source.
pub struct IngestionCoordinator {
    store: ArticleStore,
    fetcher: Arc<dyn PageFetcher>,
    extractor: ContentExtractor,
    settings: IngestConfig,
    /// Bounds outbound requests across every source.
    fetch_permits: Arc<Semaphore>,
}

impl IngestionCoordinator {
    pub fn new(store: ArticleStore, fetcher: Arc<dyn PageFetcher>, settings: IngestConfig) -> Self {
        let extractor = ContentExtractor::new(fetcher.clone());
        let fetch_permits = Arc::new(Semaphore::new(settings.max_inflight_fetches.max(1)));
        Self {
            store,
            fetcher,
            extractor,
            settings,
            fetch_permits,
        }
    }

    /// One ingestion pass over `sources`. A failing source is recorded in the report and never
    /// stops the others. Errors are returned only when the taxonomy cannot be loaded.
    pub async fn run(&self, sources: &[FeedSourceConfig]) -> Result<IngestReport> {
        let tags = self.store.tags().await?;
        let classifier = Arc::new(TagClassifier::new(&tags)?);
        info!("Ingesting {} sources with {} tags", sources.len(), classifier.len());

        let results: Vec<(String, Result<SourceReport>)> = stream::iter(sources)
            .map(|source| {
                let classifier = classifier.clone();
                async move { (source.title.clone(), self.ingest_source(source, classifier).await) }
            })
            .buffered(self.settings.max_concurrent_sources.max(1))
            .collect()
            .await;

        let mut report = IngestReport::default();
        for (title, result) in results {
            match result {
                Ok(source_report) => report.sources.push(source_report),
                Err(e) => {
                    error!("Ingestion failed for {}: {}", title, e);
                    report.failed_sources.push((title, e.to_string()));
                }
            }
        }

        info!(
            "Ingestion finished: {} new articles, {} failed sources",
            report.total_inserted(),
            report.failed_sources.len()
        );
        Ok(report)
    }

    #[instrument(skip_all, fields(source = %source.title))]
    pub async fn ingest_source(&self, source: &FeedSourceConfig, classifier: Arc<TagClassifier>) -> Result<SourceReport> {
        let mut report = SourceReport {
            source: source.title.clone(),
            ..Default::default()
        };

        self.store.register_source(source).await?;
        let seen = self.store.seen_titles(&source.title).await?;

        let mut entries = Vec::new();
        for url in &source.urls {
            match self.fetch_feed(url).await {
                Ok(mut found) => entries.append(&mut found),
                Err(e) => {
                    warn!(url = %url, error = %e, "Feed poll failed");
                    report.feed_failures += 1;
                }
            }
        }

        report.entries_seen = entries.len();
        if entries.is_empty() {
            warn!("No articles were found for this feed; the source may be blocking us. Skipping it this run");
            report.no_entries = true;
            return Ok(report);
        }

        let fresh = DedupFilter::new(seen).filter(entries);
        report.new_entries = fresh.len();
        if fresh.is_empty() {
            info!("No new articles");
            return Ok(report);
        }

        let selector = compile_selector(&source.selector)?;
        let built: Vec<Option<Article>> = stream::iter(fresh)
            .map(|entry| self.build_article(source, entry, selector.as_ref(), classifier.clone()))
            .buffered(self.settings.per_source_workers.max(1))
            .collect()
            .await;

        let mut articles = Vec::with_capacity(built.len());
        for article in built {
            match article {
                Some(article) => articles.push(article),
                None => report.fetch_failures += 1,
            }
        }

        report.persist = self.store.persist_articles(&source.title, &articles).await?;
        info!(
            "{}: {} entries, {} new, {} stored, {} fetch failures",
            source.title,
            report.entries_seen,
            report.new_entries,
            report.persist.inserted_count(),
            report.fetch_failures
        );
        Ok(report)
    }

    async fn fetch_feed(&self, url: &str) -> Result<Vec<Entry>> {
        let content = {
            let _permit = self.acquire_fetch_permit().await?;
            self.fetcher.fetch_text(url).await?
        };
        FeedParser::parse_entries(&content)
    }

    async fn acquire_fetch_permit(&self) -> Result<tokio::sync::SemaphorePermit<'_>> {
        self.fetch_permits
            .acquire()
            .await
            .map_err(|e| IndexerError::General(format!("fetch limiter closed: {}", e)))
    }

    /// `None` when the body fetch failed; the entry is left out so the next run retries it.
    async fn build_article(
        &self,
        source: &FeedSourceConfig,
        entry: Entry,
        selector: Option<&Selector>,
        classifier: Arc<TagClassifier>,
    ) -> Option<Article> {
        let extraction = match selector {
            Some(selector) => {
                let _permit = self.acquire_fetch_permit().await.ok()?;
                self.extractor.extract_with(&entry.link, selector).await
            }
            None => Extraction::Skipped,
        };
        if extraction.is_failure() {
            return None;
        }
        let raw_content = extraction.into_content();

        // Normalization and matching are CPU bound; keep them off the async workers.
        let body = raw_content.clone();
        let analysed = tokio::task::spawn_blocking(move || {
            let normalized = normalize_text(&body);
            let tags = classifier.classify(&body);
            (normalized, tags)
        })
        .await;
        let (normalized, tags) = match analysed {
            Ok(result) => result,
            Err(e) => {
                error!(title = %entry.title, error = %e, "Text analysis task failed");
                return None;
            }
        };

        let description = if source.strip_summary_markup {
            leading_text(&entry.summary)
        } else {
            entry.summary
        };

        Some(Article {
            source: source.title.clone(),
            pub_date: normalize_date(&entry.published),
            title: entry.title,
            link: entry.link,
            description,
            raw_content,
            tags,
            term_frequencies: normalized.term_frequencies,
        })
    }
}
