//! Paper-Harvest main entry point
//!
//! This is the command-line interface for the Paper-Harvest proceedings harvester.

use anyhow::Context;
use clap::Parser;
use paper_harvest::config::{load_config_with_hash, validate, Config};
use paper_harvest::crawler::harvest;
use paper_harvest::output::print_summary;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Paper-Harvest: a year-partitioned proceedings harvester
///
/// Paper-Harvest walks a proceedings site year by year, downloads every
/// paper's PDF into a per-year directory and records title, authors and page
/// URL of each paper in a CSV ledger.
#[derive(Parser, Debug)]
#[command(name = "paper-harvest")]
#[command(version)]
#[command(about = "A year-partitioned proceedings harvester", long_about = None)]
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

    /// Validate config and show what would be harvested without fetching anything
    #[arg(long)]
    dry_run: bool,

    /// Override the root index URL
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Override the directory receiving the per-year PDF folders
    #[arg(long, value_name = "DIR")]
    output_dir: Option<String>,

    /// Override the CSV ledger path
    #[arg(long, value_name = "FILE")]
    ledger: Option<String>,

    /// Override the number of concurrent workers
    #[arg(long, value_name = "N")]
    workers: Option<usize>,

    /// Only harvest these years (repeatable)
    #[arg(long = "year", value_name = "YEAR")]
    years: Vec<String>,
}

impl Cli {
    /// Applies command-line overrides on top of a loaded configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(base_url) = &self.base_url {
            config.site.base_url = base_url.clone();
        }
        if let Some(output_dir) = &self.output_dir {
            config.output.root_dir = output_dir.clone();
        }
        if let Some(ledger) = &self.ledger {
            config.output.ledger_path = ledger.clone();
        }
        if let Some(workers) = self.workers {
            config.crawler.workers = workers;
        }
        if !self.years.is_empty() {
            config.site.years = self.years.clone();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    cli.apply_overrides(&mut config);
    validate(&config).context("invalid configuration")?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_harvest(config, cli.quiet).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("paper_harvest=info,warn"),
            1 => EnvFilter::new("paper_harvest=debug,info"),
            2 => EnvFilter::new("paper_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Paper-Harvest Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Year links: {}", config.site.year_link_selector);
    println!("  Paper links: {}", config.site.item_link_selector);
    println!("  PDF links: {}", config.site.binary_link_selector);
    println!("  Authors: {}", config.site.author_selector);
    println!("  Title: {}", config.site.title_selector);
    if config.site.years.is_empty() {
        println!("  Years: all");
    } else {
        println!("  Years: {}", config.site.years.join(", "));
    }

    println!("\nCrawler:");
    println!("  Workers: {}", config.crawler.workers);
    println!("  Queue capacity: {}", config.crawler.queue_capacity);
    println!("  Max attempts: {}", config.crawler.max_attempts);
    println!("  Request timeout: {}ms", config.crawler.request_timeout_ms);
    println!("  Connect timeout: {}ms", config.crawler.connect_timeout_ms);
    println!("  User agent: {}", config.crawler.user_agent);

    println!("\nOutput:");
    println!("  PDF root: {}", config.output.root_dir);
    println!("  Ledger: {}", config.output.ledger_path);
    println!(
        "  Record failed downloads: {}",
        config.output.record_failed_downloads
    );
    println!(
        "  Record unreachable papers: {}",
        config.output.record_exhausted_items
    );

    println!("\n✓ Configuration is valid");
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config, quiet: bool) -> anyhow::Result<()> {
    tracing::info!(
        "Harvesting {} with {} workers into {}",
        config.site.base_url,
        config.crawler.workers,
        config.output.root_dir
    );

    let ledger_path = config.output.ledger_path.clone();
    match harvest(config).await {
        Ok(summary) => {
            if !quiet {
                print_summary(&summary);
            }
            tracing::info!("Harvest complete! Metadata saved to {}", ledger_path);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
