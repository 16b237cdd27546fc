use clap::{Parser, Subcommand};
use rss_indexer::QueryOp;
use std::path::PathBuf;

/// Pulls security news feeds into a searchable, tagged SQLite index.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "RSS_INDEXER_CONFIG", default_value = "config/sources.toml")]
    pub config: PathBuf,

    /// Overrides `[store] database_url` from the config file
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one ingestion pass over the configured sources
    Ingest {
        /// Only ingest the sources with these titles
        #[arg(short, long)]
        source: Vec<String>,
    },
    /// Load tag definitions from a JSON file
    ImportTags { file: PathBuf },
    /// Load tag sets from a JSON file
    ImportTagSets { file: PathBuf },
    /// Index stored articles that have no index entries yet
    Reindex,
    /// Boolean term search over article bodies
    Search {
        /// and, or, xor or nand
        #[arg(long, default_value = "and")]
        op: QueryOp,
        #[arg(required = true)]
        terms: Vec<String>,
    },
    /// Articles carrying any of the given tags
    Tagged {
        #[arg(required = true)]
        tags: Vec<String>,
    },
    /// List registered feed sources
    Sources,
    /// List tag definitions
    Tags,
    /// List stored articles
    Articles {
        #[arg(short, long)]
        source: Option<String>,
    },
}
