//! Harvest stage-2 entry point
//!
//! Reads a URL list produced by `harvest`, fetches every article and writes
//! the results table plus one text file per article.

use anyhow::Context;
use clap::Parser;
use harvest::config::{load_config_with_hash, FetchConfig};
use harvest::fetch::{read_url_list, run_pipeline};
use harvest::logging::setup_logging;
use std::path::PathBuf;
use std::process::ExitCode;

/// Fetch and extract the articles listed in INPUT into the table OUTPUT
#[derive(Parser, Debug)]
#[command(name = "harvest-extract")]
#[command(version)]
#[command(about = "Fetch articles from a URL list", long_about = None)]
struct Cli {
    /// Newline-delimited list of article URLs
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Results table to create (CSV)
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Path to TOML configuration file; only the [fetch] section is used
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Missing or extra positionals make clap print usage and exit non-zero
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => {
            let (config, hash) = load_config_with_hash(path).with_context(|| {
                format!("Failed to load configuration from {}", path.display())
            })?;
            tracing::info!("Configuration loaded (hash: {})", hash);
            config.fetch
        }
        None => FetchConfig::default(),
    };

    let urls = read_url_list(&cli.input)
        .await
        .with_context(|| format!("Failed to read URL list {}", cli.input.display()))?;
    tracing::info!("Read {} URLs from {}", urls.len(), cli.input.display());

    let stats = run_pipeline(&config, urls, &cli.output)
        .await
        .with_context(|| format!("Failed to write results to {}", cli.output.display()))?;

    tracing::info!(
        "Done: {} rows in {}, {} failed URLs, {} files in {}",
        stats.rows,
        cli.output.display(),
        stats.failed,
        stats.files.written,
        config.content_dir.display()
    );
    Ok(())
}
