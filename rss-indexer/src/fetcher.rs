use crate::traits::PageFetcher;
use crate::types::{FetchConfig, IndexerError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

/// HTTP implementation of [`PageFetcher`]. One attempt per call, no retries.
pub struct HttpFetcher {
    client: Client,
    config: FetchConfig,
    /// Next instant a request to each host may start.
    rate_limiter: Arc<Mutex<HashMap<String, Instant>>>,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self {
            client,
            config,
            rate_limiter: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Reserves the next slot for the URL's host and sleeps until it opens.
    /// The lock is released before sleeping so other hosts are not held up.
    async fn apply_rate_limit(&self, url: &str) -> Result<()> {
        let parsed_url = Url::parse(url)?;
        let host = parsed_url.host_str().unwrap_or("").to_string();
        let min_interval = Duration::from_millis(self.config.min_host_interval_ms);

        let wait = {
            let mut slots = self.rate_limiter.lock().await;
            let now = Instant::now();
            let start = match slots.get(&host) {
                Some(next) if *next > now => *next,
                _ => now,
            };
            slots.insert(host.clone(), start + min_interval);
            start.saturating_duration_since(now)
        };

        if !wait.is_zero() {
            debug!("Rate limiting {}: waiting {:?}", host, wait);
            tokio::time::sleep(wait).await;
        }
        Ok(())
    }

    fn check_size(&self, bytes: u64) -> Result<()> {
        let size_mb = (bytes / (1024 * 1024)) as usize;
        if size_mb > self.config.max_body_size_mb {
            return Err(IndexerError::TooLarge { size_mb });
        }
        Ok(())
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        self.apply_rate_limit(url).await?;
        debug!("Fetching: {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(IndexerError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        if let Some(content_length) = response.content_length() {
            self.check_size(content_length)?;
        }

        let content = response.text().await?;
        self.check_size(content.len() as u64)?;
        debug!("Fetched {} ({} bytes)", url, content.len());
        Ok(content)
    }
}
