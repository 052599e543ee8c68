//! Harvest stage-1 entry point
//!
//! Crawls the category listings and appends every discovered article URL to
//! the configured URL list.

use anyhow::Context;
use clap::Parser;
use harvest::config::{load_config_with_hash, Config};
use harvest::crawler::run_crawl;
use harvest::logging::setup_logging;
use std::path::PathBuf;
use std::process::ExitCode;

/// Harvest: a polite article URL crawler
///
/// Walks the category pages with one worker per slot, waits between requests
/// to the same domain, and records every article link it finds.
#[derive(Parser, Debug)]
#[command(name = "harvest")]
#[command(version)]
#[command(about = "Discover article URLs with a polite crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,
}

/// Errors are reported once, through the log, before a non-zero exit
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    let config = match load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };

    if cli.dry_run {
        print_dry_run(&config);
        return ExitCode::SUCCESS;
    }

    let url_list = config.writer.url_list_path.clone();
    match run_crawl(config).await {
        Ok(stats) => {
            tracing::info!(
                "Done: {} links from {} pages appended to {}",
                stats.links,
                stats.pages,
                url_list.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        tracing::info!("No configuration file given, using defaults");
        return Ok(Config::default());
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);
    Ok(config)
}

/// Handles --dry-run: shows the effective settings
fn print_dry_run(config: &Config) {
    println!("=== Harvest Dry Run ===\n");

    println!("Crawler:");
    println!("  Workers: {}", config.crawler.workers);
    println!("  Politeness delay: {}ms", config.crawler.politeness_delay_ms);
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Follow links: {}", config.crawler.follow_links);
    println!("  Link selector: {}", config.crawler.link_selector);

    println!("\nSeeds:");
    if config.seed.categories_url.is_empty() {
        println!("  Category discovery: disabled");
    } else {
        println!("  Categories from: {}", config.seed.categories_url);
    }
    for url in &config.seed.urls {
        println!("    * {}", url);
    }

    println!("\nOutput:");
    println!("  URL list: {}", config.writer.url_list_path.display());
    println!(
        "  Batch: {} entries or {}ms",
        config.writer.batch_size, config.writer.flush_interval_ms
    );

    println!("\n✓ Configuration is valid");
}
