//! Popcrawl main entry point
//!
//! Command-line interface for the pop-report hierarchy crawler. A TOML
//! config file is optional; every flag overrides its config counterpart.

use clap::Parser;
use popcrawl::config::{hash_str, load_config_with_hash, validate, Config};
use popcrawl::crawler::{run_crawl, RunOptions};
use popcrawl::model::Level;
use popcrawl::storage::{SqliteStorage, Storage};
use popcrawl::ConfigError;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Popcrawl: a hierarchical pop-report crawler
///
/// Walks the Category → Year → Set → Card → GradeRow hierarchy of a
/// pop-report site, persisting records by natural key and routing TOTALS
/// rows into a separate rollup store.
#[derive(Parser, Debug)]
#[command(name = "popcrawl")]
#[command(version)]
#[command(about = "Hierarchical pop-report crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Restrict the seed set to these sports (comma-separated)
    #[arg(long, value_delimiter = ',', value_name = "SPORT")]
    sports: Vec<String>,

    /// Global bound on simultaneous in-flight HTTP requests
    #[arg(long, value_name = "N")]
    max_concurrency: Option<u32>,

    /// Bound on nodes of one level processed at once
    #[arg(long, value_name = "N")]
    level_concurrency: Option<u32>,

    /// Minimum delay between requests to the same host
    #[arg(long, value_name = "MS")]
    request_delay_ms: Option<u64>,

    /// Retries for transient fetch failures
    #[arg(long, value_name = "N")]
    max_retries: Option<u32>,

    /// Base delay for exponential retry backoff
    #[arg(long, value_name = "MS")]
    retry_base_ms: Option<u64>,

    /// Bypass the page cache entirely
    #[arg(long)]
    no_cache: bool,

    /// Directory for the on-disk page cache
    #[arg(long, value_name = "DIR")]
    cache_dir: Option<String>,

    /// Records buffered per level before a flush is forced
    #[arg(long, value_name = "N")]
    batch_size: Option<usize>,

    /// SQLite database path
    #[arg(long, value_name = "PATH")]
    database: Option<String>,

    /// Resume from this level using already-persisted parent rows
    #[arg(long, value_name = "LEVEL")]
    start_from: Option<String>,

    /// Run traversal and extraction but skip persistence writes
    #[arg(long)]
    dry_run: bool,

    /// Cancel the run after this many seconds, keeping partial results
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Print per-level row counts from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "start_from"])]
    stats: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config_with_hash(path)?
        }
        None => (Config::default(), hash_str("builtin-defaults")),
    };

    apply_overrides(&mut config, &cli);
    validate(&config)?;

    let start_from = match &cli.start_from {
        Some(value) => match Level::parse(value) {
            Some(level) => Some(level),
            None => return Err(ConfigError::InvalidLevel(value.clone()).into()),
        },
        None => None,
    };

    if cli.stats {
        return handle_stats(&config);
    }

    let options = RunOptions {
        start_from,
        dry_run: cli.dry_run,
    };

    match run_crawl(config, &config_hash, options).await {
        Ok(summary) => {
            summary.print();
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("popcrawl=info,warn"),
            1 => EnvFilter::new("popcrawl=debug,info"),
            2 => EnvFilter::new("popcrawl=trace,debug"),
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

/// Applies CLI flags over the loaded configuration
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if !cli.sports.is_empty() {
        config.seeds.sports = cli.sports.clone();
    }
    if let Some(n) = cli.max_concurrency {
        config.crawler.max_concurrency = n;
    }
    if let Some(n) = cli.level_concurrency {
        config.crawler.level_concurrency = n;
    }
    if let Some(ms) = cli.request_delay_ms {
        config.crawler.request_delay_ms = ms;
    }
    if let Some(n) = cli.max_retries {
        config.crawler.max_retries = n;
    }
    if let Some(ms) = cli.retry_base_ms {
        config.crawler.retry_base_ms = ms;
    }
    if cli.no_cache {
        config.cache.enabled = false;
    }
    if let Some(dir) = &cli.cache_dir {
        config.cache.directory = Some(dir.clone());
    }
    if let Some(n) = cli.batch_size {
        config.storage.batch_size = n;
    }
    if let Some(path) = &cli.database {
        config.storage.database_path = path.clone();
    }
    if let Some(secs) = cli.timeout_secs {
        config.crawler.run_timeout_secs = Some(secs);
    }
}

/// Handles the --stats mode: prints per-level row counts and exits
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let storage = SqliteStorage::new(std::path::Path::new(&config.storage.database_path))?;

    println!("{:<12} {:>10}", "Level", "Rows");
    for level in Level::ALL {
        println!("{:<12} {:>10}", level.as_str(), storage.count_records(level)?);
    }
    println!("{:<12} {:>10}", "totals", storage.count_totals()?);

    Ok(())
}
