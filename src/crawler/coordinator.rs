//! Run coordinator - main ingestion orchestration logic
//!
//! This module drives one crawl run from start to finish:
//! - Opening the run record
//! - Reconciling the frontier left behind by earlier runs
//! - Seeding the frontier
//! - Spawning the worker pool and waiting for it
//! - Closing the run as `done` or `failed`

use crate::config::Config;
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::strategy::{default_strategies, FetchStrategy};
use crate::crawler::worker::{run_worker, RunContext};
use crate::output::CrawlStatsSnapshot;
use crate::storage::{FrontierStore, RunStatus, RunStore, SqliteStorage};
use crate::IngestError;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Mode label recorded on every run this coordinator opens
pub const RUN_MODE: &str = "prefetch";

/// Outcome of a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub run_id: i64,
    #[serde(flatten)]
    pub stats: CrawlStatsSnapshot,
}

/// Main run coordinator structure
pub struct Coordinator {
    config: Config,
    config_hash: String,
    fetcher: Arc<dyn PageFetcher>,
    strategies: Vec<FetchStrategy>,
}

impl Coordinator {
    /// Creates a new coordinator using the default fetch strategies
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `config_hash` - Hash of the configuration file, stored on the run
    /// * `fetcher` - The fetch collaborator shared by all workers
    pub fn new(config: Config, config_hash: impl Into<String>, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            config,
            config_hash: config_hash.into(),
            fetcher,
            strategies: default_strategies(),
        }
    }

    /// Replaces the fetch strategies tried for every page
    pub fn with_strategies(mut self, strategies: Vec<FetchStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Runs one crawl to completion
    ///
    /// The run record is closed `done` when every worker stops normally and
    /// `failed` otherwise. Frontier rows a failed run leaves in `processing`
    /// are picked up by the next run's reconciliation.
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` - The run finished
    /// * `Err(IngestError)` - The run could not start, or a worker hit a
    ///   storage error or panicked
    pub async fn run(&self) -> crate::Result<RunSummary> {
        let mut storage = SqliteStorage::open(Path::new(&self.config.output.database_path))?;

        let crawler = &self.config.crawler;
        let notes = format!(
            "parallel={} runtime_hours={}",
            crawler.concurrency, crawler.max_runtime_hours
        );
        let run_id = storage.begin_run(RUN_MODE, &notes, &self.config_hash)?;
        info!("Starting run {} ({})", run_id, notes);

        let result = self.crawl(run_id, &mut storage).await;

        let status = if result.is_ok() {
            RunStatus::Done
        } else {
            RunStatus::Failed
        };
        if let Err(e) = storage.end_run(run_id, status) {
            error!("Failed to close run {}: {}", run_id, e);
            if result.is_ok() {
                return Err(e.into());
            }
        }

        match &result {
            Ok(summary) => info!(
                "Run {} done: {} fetched, {} parsed, {} failed",
                run_id, summary.stats.fetched, summary.stats.parsed, summary.stats.failed
            ),
            Err(e) => error!("Run {} failed: {}", run_id, e),
        }

        result
    }

    async fn crawl(&self, run_id: i64, storage: &mut SqliteStorage) -> crate::Result<RunSummary> {
        let crawler = &self.config.crawler;

        let reset = storage.reconcile_for_resume(crawler.retry_limit)?;
        if reset > 0 {
            info!("Returned {} unfinished URLs to the queue", reset);
        }

        let ctx = Arc::new(RunContext::new(
            run_id,
            &self.config,
            self.strategies.clone(),
        ));

        let site = ctx.extractor.site();
        let mut seeded = 0;
        for seed in &self.config.site.seeds {
            let canonical = site.canonicalize(seed);
            if canonical.is_empty() {
                warn!("Skipping malformed seed URL: {}", seed);
                continue;
            }
            if !site.is_in_scope(&canonical) {
                warn!("Skipping out-of-scope seed URL: {}", seed);
                continue;
            }
            storage.enqueue(
                &canonical,
                run_id,
                "",
                crawler.requeue_seeds_on_start,
                crawler.retry_limit,
            )?;
            ctx.stats.record_queued();
            seeded += 1;
        }
        info!("Seeded {} URLs, {} pending", seeded, storage.count_pending()?);

        let mut workers = JoinSet::new();
        for id in 0..crawler.concurrency as usize {
            let ctx = Arc::clone(&ctx);
            let fetcher = Arc::clone(&self.fetcher);
            workers.spawn(async move { (id, run_worker(id, ctx, fetcher).await) });
        }

        let mut failure: Option<IngestError> = None;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((id, Ok(reason))) => debug!("Worker {} stopped: {:?}", id, reason),
                Ok((id, Err(e))) => {
                    error!("Worker {} failed: {}", id, e);
                    ctx.cancel();
                    failure.get_or_insert(e);
                }
                Err(e) => {
                    error!("Worker task aborted: {}", e);
                    ctx.cancel();
                    failure.get_or_insert(IngestError::Worker(e.to_string()));
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(RunSummary {
                run_id,
                stats: ctx.stats.snapshot(),
            }),
        }
    }
}

/// Runs one ingestion pass with the default strategies
///
/// # Example
///
/// ```no_run
/// use partselect_ingest::config::load_config_with_hash;
/// use partselect_ingest::crawler::{run_ingestion, HttpFetcher};
/// use std::path::Path;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("config.toml"))?;
/// let fetcher = HttpFetcher::new(&config.user_agent, Duration::from_secs(60))?;
/// let summary = run_ingestion(config, hash, Arc::new(fetcher)).await?;
/// println!("{} pages parsed", summary.stats.parsed);
/// # Ok(())
/// # }
/// ```
pub async fn run_ingestion(
    config: Config,
    config_hash: impl Into<String>,
    fetcher: Arc<dyn PageFetcher>,
) -> crate::Result<RunSummary> {
    Coordinator::new(config, config_hash, fetcher).run().await
}
