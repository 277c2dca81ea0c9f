mod cli;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{CacheCommands, Cli, Commands};
use multiverse::browse::BrowseOptions;
use multiverse::prelude::{Collection, Config, MediaItem, Multiverse};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let mv = Multiverse::connect(config).await?;

    match cli.command {
        Commands::Search { query, refresh, limit } => {
            let outcome = mv.search_with_refresh(&query, refresh).await?;
            for (collection, error) in &outcome.partial_failures {
                eprintln!("warning: {collection} failed: {error}");
            }
            let shown = match limit {
                Some(n) => &outcome.items[..n.min(outcome.items.len())],
                None => &outcome.items[..],
            };
            print_items(shown, cli.json)?;
            if !cli.json {
                let source = if outcome.from_cache { "cache" } else { "network" };
                println!("{} result(s) from {}", outcome.items.len(), source);
            }
        }
        Commands::Quick { query } => {
            let items = mv.quick_search(&query).await?;
            print_items(&items, cli.json)?;
        }
        Commands::Browse {
            query,
            category,
            quality,
            min_rating,
            year,
            sort,
            page,
            saved,
        } => {
            let opts = if saved {
                mv.load_filters().await?.unwrap_or_default()
            } else {
                BrowseOptions {
                    category,
                    quality,
                    min_rating,
                    year,
                    sort,
                    page,
                    page_size: mv.config().page_size,
                }
            };
            let result = mv.browse(&query, &opts).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_items(&result.items, false)?;
                println!(
                    "page {}/{} ({} matching item(s))",
                    result.page, result.total_pages, result.total_items
                );
            }
            mv.save_filters(&opts).await?;
        }
        Commands::Latest { limit } => {
            let items = mv.latest_updates(limit).await?;
            print_items(&items, cli.json)?;
        }
        Commands::Detail { collection, slug } => {
            let item = mv.detail(collection, &slug).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&item)?);
            } else {
                println!("{} [{}/{}]", item.title, item.collection, item.slug);
                if let Some(rating) = item.rating {
                    println!("  rating: {rating}");
                }
                if let Some(date) = &item.release_date {
                    println!("  released: {date}");
                }
                if !item.qualities.is_empty() {
                    let labels: Vec<&str> = item.qualities.keys().map(String::as_str).collect();
                    println!("  qualities: {}", labels.join(", "));
                }
                if !item.genres.is_empty() {
                    println!("  genres: {}", item.genres.join(", "));
                }
                if let Some(desc) = &item.description {
                    println!("  {desc}");
                }
            }
        }
        Commands::Collections => {
            for c in Collection::ALL {
                println!("{c}");
            }
        }
        Commands::Cache { command } => match command {
            CacheCommands::Clear { prefix } => {
                let removed = mv.clear_cache(prefix.as_deref()).await?;
                println!("removed {removed} cache entr(ies)");
            }
            CacheCommands::Stats => {
                let stats = mv.cache_stats().await?;
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&stats)?);
                } else {
                    println!(
                        "{} cache entr(ies), {} expired",
                        stats.entries, stats.expired_entries
                    );
                }
            }
        },
    }

    Ok(())
}

fn print_items(items: &[MediaItem], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(items)?);
        return Ok(());
    }
    for item in items {
        let rating = item
            .rating
            .map(|r| format!(" {r:.1}*"))
            .unwrap_or_default();
        let year = item
            .release_year()
            .map(|y| format!(" ({y})"))
            .unwrap_or_default();
        println!("{}{year}{rating} [{}/{}]", item.title, item.collection, item.slug);
    }
    Ok(())
}
