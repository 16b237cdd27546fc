mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use rss_indexer::{
    taxonomy, ArticleStore, HttpFetcher, IndexerConfig, IngestionCoordinator, QueryEngine,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let cli = Cli::parse();
    let mut config = IndexerConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config {}", cli.config.display()))?;
    if let Some(url) = cli.database_url {
        config.store.database_url = url;
    }

    let store = ArticleStore::connect(&config.store.database_url)
        .await
        .with_context(|| format!("Failed to open article store {}", config.store.database_url))?;

    let outcome = run(cli.command, &config, &store).await;
    store.close().await;
    outcome
}

async fn run(command: Command, config: &IndexerConfig, store: &ArticleStore) -> Result<()> {
    match command {
        Command::Ingest { source } => {
            let sources: Vec<_> = if source.is_empty() {
                config.sources.clone()
            } else {
                let mut selected = Vec::new();
                for title in &source {
                    match config.source(title) {
                        Some(found) => selected.push(found.clone()),
                        None => bail!("No source titled {:?} in config", title),
                    }
                }
                selected
            };

            let fetcher = Arc::new(HttpFetcher::new(config.fetch.clone())?);
            let coordinator = IngestionCoordinator::new(store.clone(), fetcher, config.ingest.clone());
            let report = coordinator.run(&sources).await?;

            for source in &report.sources {
                if source.no_entries {
                    warn!("{}: no entries", source.source);
                    continue;
                }
                info!(
                    "{}: {} new of {} entries, {} stored, {} fetch failures, {} persist failures",
                    source.source,
                    source.new_entries,
                    source.entries_seen,
                    source.persist.inserted_count(),
                    source.fetch_failures,
                    source.persist.failed.len()
                );
            }
            for (title, reason) in &report.failed_sources {
                error!("{}: {}", title, reason);
            }
            info!("Stored {} new articles", report.total_inserted());
        }
        Command::ImportTags { file } => {
            let rows = taxonomy::load_tag_rows(&file)
                .await
                .with_context(|| format!("Failed to read taxonomy {}", file.display()))?;
            let report = store.import_tags(&rows).await?;
            println!(
                "Imported {} tags, {} sets, {} set memberships",
                report.tags, report.sets, report.memberships
            );
        }
        Command::ImportTagSets { file } => {
            let rows = taxonomy::load_tag_set_rows(&file)
                .await
                .with_context(|| format!("Failed to read tag sets {}", file.display()))?;
            let inserted = store.import_tag_sets(&rows).await?;
            println!("Imported {} tag sets", inserted);
        }
        Command::Reindex => {
            let indexed = store.rebuild_index().await?;
            println!("Indexed {} articles", indexed);
        }
        Command::Search { op, terms } => {
            let hits = QueryEngine::new(store.clone()).search(&terms, op).await?;
            for hit in &hits {
                println!("{}\t{}\t{}", hit.article_id, hit.title, hit.link);
            }
            println!("{} matches", hits.len());
        }
        Command::Tagged { tags } => {
            let articles = QueryEngine::new(store.clone()).tagged(&tags).await?;
            for article in &articles {
                let tags: Vec<&str> = article.tags.iter().map(String::as_str).collect();
                println!("{}\t{}\t[{}]", article.source, article.title, tags.join(", "));
            }
            println!("{} articles", articles.len());
        }
        Command::Sources => {
            for title in store.source_titles().await? {
                let count = store.article_count(Some(&title)).await?;
                println!("{}\t{} articles", title, count);
            }
        }
        Command::Tags => {
            for tag in store.tags().await? {
                let case = if tag.case_sensitive { "case-sensitive" } else { "case-insensitive" };
                println!("{}\t{}\t{}", tag.name, case, tag.description);
            }
        }
        Command::Articles { source } => {
            for article in store.articles(source.as_deref()).await? {
                println!("{}\t{}\t{}\t{}", article.source, article.pub_date, article.title, article.link);
            }
        }
    }
    Ok(())
}
