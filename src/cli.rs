use std::path::PathBuf;

use clap::{Parser, Subcommand};

use multiverse::prelude::{CategoryGroup, Collection, SortKey};

/// CLI for searching and browsing the aggregated media catalog
#[derive(Parser)]
#[command(name = "multiverse")]
#[command(about = "Search, browse, and cache the multi-collection media catalog", long_about = None)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit JSON instead of human-readable text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search the catalog and print the combined results
    Search {
        /// Free-text query (empty returns top items)
        query: String,
        /// Bypass the cache for this cycle
        #[arg(short, long)]
        refresh: bool,
        /// Show at most this many results
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Inline quick search (top 8 across all collections)
    Quick { query: String },
    /// Filter, sort, and paginate the combined set for a query
    Browse {
        /// Free-text query to browse within (empty browses everything)
        #[arg(short, long, default_value = "")]
        query: String,
        #[arg(long, default_value = "all")]
        category: CategoryGroup,
        /// Quality label the item must carry (e.g. 720p, 1080p)
        #[arg(long)]
        quality: Option<String>,
        #[arg(long, default_value_t = 0.0)]
        min_rating: f64,
        /// Exact release year
        #[arg(long)]
        year: Option<i32>,
        #[arg(long, default_value = "newest")]
        sort: SortKey,
        #[arg(short, long, default_value_t = 1)]
        page: usize,
        /// Reuse the selection persisted by the previous browse
        #[arg(long)]
        saved: bool,
    },
    /// Newest items across the feed collections
    Latest {
        #[arg(short, long, default_value_t = 12)]
        limit: usize,
    },
    /// Show a single item by collection and slug
    Detail {
        collection: Collection,
        slug: String,
    },
    /// List the fixed collection set
    Collections,
    /// Cache maintenance
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Remove cached entries (all, or those under a key prefix)
    Clear {
        #[arg(long)]
        prefix: Option<String>,
    },
    /// Show entry counts
    Stats,
}
