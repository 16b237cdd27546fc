use crate::traits::PageFetcher;
use crate::types::{IndexerError, Result};
use scraper::{Html, Selector};
use std::sync::Arc;
use tracing::{debug, warn};

pub const FETCH_ERROR_PREFIX: &str = "Error fetching the article";

/// Stored body of a page that loaded but had no element matching the selector.
pub const CONTENT_NOT_FOUND: &str = "Content not found.";

/// Outcome of pulling one article body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// The source has no selector; nothing was fetched.
    Skipped,
    Body(String),
    /// The page loaded but nothing matched the selector. Stored as [`CONTENT_NOT_FOUND`].
    NotFound,
    /// Network error or non-success status. Carries the error description.
    Failed(String),
}

impl Extraction {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Raw body text as stored with the article. Failures become a readable sentinel string.
    pub fn into_content(self) -> String {
        match self {
            Self::Body(text) => text,
            Self::Skipped => String::new(),
            Self::NotFound => CONTENT_NOT_FOUND.to_string(),
            Self::Failed(reason) => format!("{}: {}", FETCH_ERROR_PREFIX, reason),
        }
    }
}

pub fn compile_selector(selector: &str) -> Result<Option<Selector>> {
    let selector = selector.trim();
    if selector.is_empty() {
        return Ok(None);
    }
    Selector::parse(selector)
        .map(Some)
        .map_err(|e| IndexerError::Selector {
            selector: selector.to_string(),
            reason: e.to_string(),
        })
}

/// Fetches article pages and pulls the body text out of the first element matching a selector.
#[derive(Clone)]
pub struct ContentExtractor {
    fetcher: Arc<dyn PageFetcher>,
}

impl ContentExtractor {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }

    pub async fn extract(&self, link: &str, selector: &str) -> Result<Extraction> {
        match compile_selector(selector)? {
            Some(compiled) => Ok(self.extract_with(link, &compiled).await),
            None => Ok(Extraction::Skipped),
        }
    }

    /// Single attempt; never returns an error so one bad page cannot stop a batch.
    pub async fn extract_with(&self, link: &str, selector: &Selector) -> Extraction {
        let html = match self.fetcher.fetch_text(link).await {
            Ok(html) => html,
            Err(e) => {
                warn!(url = %link, error = %e, "Article fetch failed");
                return Extraction::Failed(e.to_string());
            }
        };

        match select_text(&html, selector) {
            Some(text) => Extraction::Body(text),
            None => {
                debug!(url = %link, "Selector matched nothing");
                Extraction::NotFound
            }
        }
    }
}

/// First non-blank text run of an HTML fragment, e.g. the lead sentence of a marked-up summary.
pub fn leading_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    fragment
        .root_element()
        .text()
        .map(str::trim)
        .find(|t| !t.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn select_text(html: &str, selector: &Selector) -> Option<String> {
    let document = Html::parse_document(html);
    let element = document.select(selector).next()?;
    let text = element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ");
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CannedPage {
        html: Option<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageFetcher for CannedPage {
        async fn fetch_text(&self, url: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.html {
                Some(html) => Ok(html.to_string()),
                None => Err(IndexerError::Status {
                    status: 503,
                    url: url.to_string(),
                }),
            }
        }
    }

    fn extractor(html: Option<&'static str>) -> (ContentExtractor, Arc<CannedPage>) {
        let page = Arc::new(CannedPage {
            html,
            calls: AtomicUsize::new(0),
        });
        (ContentExtractor::new(page.clone()), page)
    }

    const PAGE: &str = r#"<html><body>
        <nav>Menu</nav>
        <div class="articleBody"><p>Attackers   exploited</p><p>the flaw.</p></div>
        <div class="articleBody"><p>Second block</p></div>
    </body></html>"#;

    #[tokio::test]
    async fn test_first_match_text() {
        let (extractor, _) = extractor(Some(PAGE));
        let result = extractor.extract("https://example.com/a", "div.articleBody").await.unwrap();
        assert_eq!(result, Extraction::Body("Attackers exploited the flaw.".to_string()));
    }

    #[tokio::test]
    async fn test_empty_selector_never_fetches() {
        let (extractor, page) = extractor(Some(PAGE));
        let result = extractor.extract("https://example.com/a", "  ").await.unwrap();
        assert_eq!(result, Extraction::Skipped);
        assert_eq!(result.into_content(), "");
        assert_eq!(page.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_match_stores_marker() {
        let (extractor, _) = extractor(Some(PAGE));
        let result = extractor.extract("https://example.com/a", ".entry-content").await.unwrap();
        assert_eq!(result, Extraction::NotFound);
        assert_eq!(result.into_content(), "Content not found.");
    }

    #[tokio::test]
    async fn test_fetch_failure_degrades_to_sentinel() {
        let (extractor, page) = extractor(None);
        let result = extractor.extract("https://example.com/a", "div.articleBody").await.unwrap();
        assert!(result.is_failure());
        assert!(result.into_content().starts_with("Error fetching the article: HTTP 503"));
        assert_eq!(page.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_leading_text() {
        assert_eq!(
            leading_text("<p>Secretary meets allies.</p><p><a href=\"x\">Read more</a></p>"),
            "Secretary meets allies."
        );
        assert_eq!(leading_text("plain summary"), "plain summary");
        assert_eq!(leading_text(""), "");
    }

    #[test]
    fn test_bad_selector_rejected() {
        assert!(matches!(
            compile_selector("div[["),
            Err(IndexerError::Selector { .. })
        ));
    }
}
