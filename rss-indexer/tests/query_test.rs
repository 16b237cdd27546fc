mod common;

use common::{article, source, temp_store};
use rss_indexer::{ArticleStore, QueryEngine, QueryOp, Result};
use tempfile::TempDir;

const FEED: &str = "Security Wire";

/// A: malware + patch, B: patch + release, C: neither.
async fn corpus() -> Result<(TempDir, ArticleStore, QueryEngine)> {
    let (dir, store) = temp_store().await?;
    store.register_source(&source(FEED, "https://wire.example.com/rss", "")).await?;
    store
        .persist_articles(
            FEED,
            &[
                article(FEED, "A", "Malware and a patch"),
                article(FEED, "B", "The patch release"),
                article(FEED, "C", "Weather report"),
            ],
        )
        .await?;
    let engine = QueryEngine::new(store.clone());
    Ok((dir, store, engine))
}

async fn titles(engine: &QueryEngine, terms: &[&str], op: QueryOp) -> Result<Vec<String>> {
    let hits = engine.search(terms, op).await?;
    Ok(hits.into_iter().map(|h| h.title).collect())
}

#[tokio::test]
async fn test_and_requires_every_term() -> Result<()> {
    let (_dir, _store, engine) = corpus().await?;
    assert_eq!(titles(&engine, &["malware", "patch"], QueryOp::And).await?, vec!["A"]);
    Ok(())
}

#[tokio::test]
async fn test_or_requires_any_term() -> Result<()> {
    let (_dir, _store, engine) = corpus().await?;
    assert_eq!(titles(&engine, &["malware", "patch"], QueryOp::Or).await?, vec!["A", "B"]);
    Ok(())
}

#[tokio::test]
async fn test_xor_requires_exactly_one_term() -> Result<()> {
    let (_dir, _store, engine) = corpus().await?;
    assert_eq!(titles(&engine, &["malware", "patch"], QueryOp::Xor).await?, vec!["B"]);
    Ok(())
}

#[tokio::test]
async fn test_nand_excludes_full_matches() -> Result<()> {
    let (_dir, _store, engine) = corpus().await?;
    assert_eq!(titles(&engine, &["malware", "patch"], QueryOp::Nand).await?, vec!["B", "C"]);
    Ok(())
}

#[tokio::test]
async fn test_terms_are_normalized_before_matching() -> Result<()> {
    let (_dir, _store, engine) = corpus().await?;
    assert_eq!(titles(&engine, &["Patches", "MALWARE"], QueryOp::And).await?, vec!["A"]);
    // Duplicate terms after normalization count once.
    assert_eq!(titles(&engine, &["patch", "patched"], QueryOp::And).await?, vec!["A", "B"]);
    Ok(())
}

#[tokio::test]
async fn test_empty_queries_return_nothing() -> Result<()> {
    let (_dir, _store, engine) = corpus().await?;
    let none: [&str; 0] = [];
    assert!(engine.search(&none, QueryOp::Or).await?.is_empty());
    assert!(engine.search(&["the", "and"], QueryOp::Nand).await?.is_empty());
    assert!(engine.search(&["2024"], QueryOp::Or).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_hits_carry_article_fields() -> Result<()> {
    let (_dir, store, engine) = corpus().await?;
    let hits = engine.search(&["release"], QueryOp::And).await?;
    assert_eq!(hits.len(), 1);
    assert_eq!(Some(hits[0].article_id), store.article_id(FEED, "B").await?);
    assert_eq!(hits[0].link, "https://news.example.com/b");
    assert_eq!(hits[0].description, "About B");
    Ok(())
}

#[tokio::test]
async fn test_possessive_forms_are_searchable() -> Result<()> {
    let (_dir, store, engine) = corpus().await?;
    store
        .persist_articles(FEED, &[article(FEED, "D", "Microsoft's advisory covers the vendor’s products")])
        .await?;
    assert_eq!(titles(&engine, &["microsoft"], QueryOp::And).await?, vec!["D"]);
    assert_eq!(titles(&engine, &["Microsoft's", "vendor"], QueryOp::And).await?, vec!["D"]);
    Ok(())
}
