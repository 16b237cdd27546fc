use crate::store::ArticleStore;
use crate::text::normalize_terms;
use crate::types::{Article, ArticleHit, QueryOp, Result};
use tracing::debug;

/// Read path over the store: boolean term search and tag lookup.
#[derive(Clone)]
pub struct QueryEngine {
    store: ArticleStore,
}

impl QueryEngine {
    pub fn new(store: ArticleStore) -> Self {
        Self { store }
    }

    /// Terms go through the same normalization as article bodies, so `running` finds articles
    /// indexed under `run`. No terms, or terms that are all stopwords, give an empty result.
    pub async fn search<S: AsRef<str>>(&self, terms: &[S], op: QueryOp) -> Result<Vec<ArticleHit>> {
        let normalized = normalize_terms(terms);
        if normalized.is_empty() {
            debug!("Query has no searchable terms");
            return Ok(Vec::new());
        }
        debug!("Searching {} {:?}", op, normalized);
        self.store.query_terms(&normalized, op).await
    }

    pub async fn tagged(&self, tags: &[String]) -> Result<Vec<Article>> {
        self.store.query_by_tags(tags).await
    }
}
