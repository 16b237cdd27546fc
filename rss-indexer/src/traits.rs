use crate::types::Result;
use async_trait::async_trait;

/// Retrieves remote documents (feed XML or article HTML) as text.
///
/// The coordinator and the content extractor only talk to the network through this trait,
/// so tests can swap in a canned implementation.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` and return the decoded body. Non-success statuses are errors.
    async fn fetch_text(&self, url: &str) -> Result<String>;
}
