#![allow(dead_code)]

use async_trait::async_trait;
use rss_indexer::{
    normalize_text, Article, ArticleStore, FeedSourceConfig, IndexerError, PageFetcher, Result,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, Once};
use tempfile::TempDir;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Store backed by a throwaway database file. Keep the `TempDir` alive for the test's duration.
pub async fn temp_store() -> Result<(TempDir, ArticleStore)> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let url = format!("sqlite://{}", dir.path().join("index.db").display());
    let store = ArticleStore::connect(&url).await?;
    Ok((dir, store))
}

pub fn article(source: &str, title: &str, body: &str) -> Article {
    Article {
        source: source.to_string(),
        title: title.to_string(),
        link: format!("https://news.example.com/{}", title.to_lowercase().replace(' ', "-")),
        pub_date: "2024-01-02".to_string(),
        description: format!("About {}", title),
        raw_content: body.to_string(),
        tags: BTreeSet::new(),
        term_frequencies: normalize_text(body).term_frequencies,
    }
}

pub fn source(title: &str, url: &str, selector: &str) -> FeedSourceConfig {
    FeedSourceConfig::new(title, url, selector)
}

/// RSS 2.0 document with one item per (title, link), all published on 2024-01-02.
pub fn rss(channel: &str, items: &[(&str, &str)]) -> String {
    let dated: Vec<_> = items
        .iter()
        .map(|(title, link)| (*title, *link, "Tue, 02 Jan 2024 10:00:00 +0000"))
        .collect();
    rss_dated(channel, &dated)
}

/// RSS 2.0 document with one item per (title, link, pubDate text).
pub fn rss_dated(channel: &str, items: &[(&str, &str, &str)]) -> String {
    let mut xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\"><channel><title>{}</title>\
         <link>https://news.example.com/</link><description>fixture</description>",
        channel
    );
    for (title, link, published) in items {
        xml.push_str(&format!(
            "<item><title>{}</title><link>{}</link>\
             <pubDate>{}</pubDate>\
             <description>Summary of {}</description></item>",
            title, link, published, title
        ));
    }
    xml.push_str("</channel></rss>");
    xml
}

pub fn article_page(body: &str) -> String {
    format!(
        "<html><body><header>Site menu</header><div class=\"articleBody\"><p>{}</p></div>\
         <footer>Copyright</footer></body></html>",
        body
    )
}

/// Serves canned documents by URL; anything unknown is a 404. Records every request.
#[derive(Default)]
pub struct StubFetcher {
    pages: Mutex<HashMap<String, String>>,
    requests: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, url: &str, body: impl Into<String>) {
        self.pages.lock().unwrap().insert(url.to_string(), body.into());
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests.lock().unwrap().iter().filter(|u| u.as_str() == url).count()
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        self.requests.lock().unwrap().push(url.to_string());
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| IndexerError::Status {
                status: 404,
                url: url.to_string(),
            })
    }
}
