//! partselect-ingest main entry point
//!
//! This is the command-line interface for the PartSelect ingestion pipeline.

use anyhow::Context;
use clap::Parser;
use partselect_ingest::config::{load_config_with_hash, Config};
use partselect_ingest::crawler::{run_ingestion, HttpFetcher};
use partselect_ingest::output::{load_progress, print_progress};
use partselect_ingest::storage::SqliteStorage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// partselect-ingest: crawl PartSelect into a structured SQLite catalog
///
/// Walks the allow-listed model, part and repair pages of the site, extracts
/// models, parts, compatibility, symptoms, media and Q&A, and upserts them
/// idempotently. Interrupted runs resume from the frontier table.
#[derive(Parser, Debug)]
#[command(name = "partselect-ingest")]
#[command(version = "1.0.0")]
#[command(about = "Resumable PartSelect catalog ingestion", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show progress of the latest run from the database and exit
    #[arg(long)]
    stats: bool,

    /// Report on this run instead of the latest one
    #[arg(long, value_name = "N", requires = "stats")]
    run_id: Option<i64>,

    /// Repeat the report every SECS seconds until the run finishes
    #[arg(long, value_name = "SECS", requires = "stats")]
    watch: Option<u64>,

    /// Force seed URLs back into the queue even if already done
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    requeue_seeds: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.requeue_seeds {
        config.crawler.requeue_seeds_on_start = true;
    }

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config, cli.run_id, cli.watch).await?;
    } else {
        handle_crawl(config, config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("partselect_ingest=info,warn"),
            1 => EnvFilter::new("partselect_ingest=debug,info"),
            2 => EnvFilter::new("partselect_ingest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Handles the --dry-run mode: shows the resolved configuration
fn handle_dry_run(config: &Config) {
    println!("=== partselect-ingest Dry Run ===\n");

    let crawler = &config.crawler;
    println!("Crawler Configuration:");
    println!("  Concurrency: {}", crawler.concurrency);
    println!("  Max runtime: {}h", crawler.max_runtime_hours);
    println!("  Max pages: {}", crawler.max_pages);
    println!("  Requeue seeds on start: {}", crawler.requeue_seeds_on_start);
    println!("  Save markdown: {}", crawler.save_markdown);
    println!(
        "  Idle polling: {} x {}ms",
        crawler.max_idle_polls, crawler.idle_poll_ms
    );
    println!("  Fetch timeout: {}s", crawler.fetch_timeout_secs);
    match crawler.retry_limit {
        Some(limit) => println!("  Retry limit: {} attempts", limit),
        None => println!("  Retry limit: none"),
    }

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    let site = &config.site;
    println!("\nSite:");
    println!("  Host: {}", site.host);
    if !site.apex_alias.is_empty() {
        println!("  Apex alias: {}", site.apex_alias);
    }
    println!("  Allowed paths: {}", site.allowed_paths.join(", "));

    println!("\nSeeds ({}):", site.seeds.len());
    for seed in &site.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling with {} seed URLs", site.seeds.len());
}

/// Handles the --stats mode: shows run progress from the database
async fn handle_stats(config: &Config, run_id: Option<i64>, watch: Option<u64>) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);
    let storage = SqliteStorage::open(Path::new(&config.output.database_path))?;

    loop {
        let Some(report) = load_progress(&storage, run_id)? else {
            println!("No crawl runs recorded yet");
            return Ok(());
        };
        print_progress(&report);

        match watch {
            Some(secs) if !report.is_finished() => {
                println!();
                tokio::time::sleep(Duration::from_secs(secs.max(1))).await;
            }
            _ => return Ok(()),
        }
    }
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: String) -> anyhow::Result<()> {
    tracing::info!(
        "Crawling {} with {} workers, {} seeds",
        config.site.host,
        config.crawler.concurrency,
        config.site.seeds.len()
    );

    let fetcher = HttpFetcher::new(
        &config.user_agent,
        Duration::from_secs(config.crawler.fetch_timeout_secs),
    )?;

    let summary = run_ingestion(config, config_hash, Arc::new(fetcher)).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
