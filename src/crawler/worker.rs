//! Crawl workers
//!
//! Each worker owns its own database connection and runs an explicit state
//! loop: reserve a page slot, claim a URL, fetch it with every strategy,
//! extract, persist, then enqueue what it discovered. Workers never talk to
//! each other; the frontier table is the only coordination point.
//!
//! rusqlite is synchronous and a busy connection may wait out the busy
//! timeout, so every storage call runs on tokio's blocking pool.

use crate::config::Config;
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::strategy::{fetch_best, FetchAttempt, FetchStrategy};
use crate::extract::Extractor;
use crate::output::CrawlStats;
use crate::state::PageStatus;
use crate::storage::{
    CrawledPage, EntityStore, FrontierStore, SqliteStorage, StorageResult,
};
use crate::url::classify;
use crate::IngestError;
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Shared state of one crawl run
///
/// Built once by the coordinator and handed to every worker behind an `Arc`.
#[derive(Debug)]
pub struct RunContext {
    pub run_id: i64,
    pub db_path: PathBuf,
    pub extractor: Extractor,
    pub strategies: Vec<FetchStrategy>,
    /// `None` when the runtime budget does not fit in an `Instant`
    pub deadline: Option<Instant>,
    pub max_pages: u64,
    pub save_markdown: bool,
    pub idle_poll: Duration,
    pub max_idle_polls: u32,
    pub fetch_timeout: Duration,
    /// Attempts after which a rediscovered failure stays failed
    pub retry_limit: Option<u32>,
    pub stats: CrawlStats,
    reserved: AtomicU64,
    cancelled: AtomicBool,
}

impl RunContext {
    /// Builds the context for `run_id` from the crawler and site settings
    pub fn new(run_id: i64, config: &Config, strategies: Vec<FetchStrategy>) -> Self {
        let crawler = &config.crawler;
        let runtime = Duration::try_from_secs_f64(crawler.max_runtime_hours * 3600.0)
            .unwrap_or(Duration::MAX);

        Self {
            run_id,
            db_path: PathBuf::from(&config.output.database_path),
            extractor: Extractor::new(config.site.scope()),
            strategies,
            deadline: Instant::now().checked_add(runtime),
            max_pages: crawler.max_pages,
            save_markdown: crawler.save_markdown,
            idle_poll: Duration::from_millis(crawler.idle_poll_ms),
            max_idle_polls: crawler.max_idle_polls,
            fetch_timeout: Duration::from_secs(crawler.fetch_timeout_secs),
            retry_limit: crawler.retry_limit,
            stats: CrawlStats::new(),
            reserved: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Takes one page-fetch slot, or returns false once the cap is reached
    pub fn try_reserve_page(&self) -> bool {
        self.reserved
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < self.max_pages).then_some(n + 1)
            })
            .is_ok()
    }

    /// Gives back a slot whose claim came back empty
    pub fn release_page(&self) {
        let _ = self
            .reserved
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    pub fn pages_reserved(&self) -> u64 {
        self.reserved.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Why a worker stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    Deadline,
    PageBudget,
    Cancelled,
    /// The frontier stayed empty for `max_idle_polls` polls
    Drained,
}

enum WorkerState {
    Reserve,
    Claim,
    Idle,
    Process(String),
    Exit(WorkerExit),
}

/// A worker's connection, shared with the blocking tasks that use it
type WorkerStorage = Arc<Mutex<SqliteStorage>>;

/// Runs `op` against the worker's connection on the blocking pool
async fn with_storage<T, F>(storage: &WorkerStorage, op: F) -> crate::Result<T>
where
    T: Send + 'static,
    F: FnOnce(&mut SqliteStorage) -> StorageResult<T> + Send + 'static,
{
    let storage = Arc::clone(storage);
    tokio::task::spawn_blocking(move || {
        let mut guard = storage
            .lock()
            .map_err(|_| IngestError::Worker("storage lock poisoned".to_string()))?;
        op(&mut *guard).map_err(IngestError::from)
    })
    .await
    .map_err(|e| IngestError::Worker(e.to_string()))?
}

/// Runs one worker until the run ends for it
///
/// # Arguments
///
/// * `id` - Worker index, for logging
/// * `ctx` - The shared run context
/// * `fetcher` - The fetch collaborator
///
/// # Returns
///
/// * `Ok(WorkerExit)` - The worker stopped normally
/// * `Err(IngestError)` - A storage operation failed; the run must fail
pub async fn run_worker(
    id: usize,
    ctx: Arc<RunContext>,
    fetcher: Arc<dyn PageFetcher>,
) -> crate::Result<WorkerExit> {
    let db_path = ctx.db_path.clone();
    let storage = tokio::task::spawn_blocking(move || SqliteStorage::open(&db_path))
        .await
        .map_err(|e| IngestError::Worker(e.to_string()))??;
    let storage: WorkerStorage = Arc::new(Mutex::new(storage));

    let mut idle_polls: u32 = 0;
    let mut state = WorkerState::Reserve;

    loop {
        state = match state {
            WorkerState::Reserve => {
                if ctx.is_cancelled() {
                    WorkerState::Exit(WorkerExit::Cancelled)
                } else if ctx.deadline_passed() {
                    WorkerState::Exit(WorkerExit::Deadline)
                } else if !ctx.try_reserve_page() {
                    WorkerState::Exit(WorkerExit::PageBudget)
                } else {
                    WorkerState::Claim
                }
            }

            WorkerState::Claim => {
                let run_id = ctx.run_id;
                match with_storage(&storage, move |s| s.claim_next(run_id)).await {
                    Ok(Some(url)) => {
                        idle_polls = 0;
                        WorkerState::Process(url)
                    }
                    Ok(None) => {
                        ctx.release_page();
                        WorkerState::Idle
                    }
                    Err(e) => {
                        ctx.release_page();
                        return Err(e);
                    }
                }
            }

            WorkerState::Idle => {
                // Other workers may still be discovering URLs
                if with_storage(&storage, |s| s.count_pending()).await? == 0 {
                    idle_polls += 1;
                } else {
                    idle_polls = 0;
                }

                if idle_polls >= ctx.max_idle_polls {
                    WorkerState::Exit(WorkerExit::Drained)
                } else {
                    tokio::time::sleep(ctx.idle_poll).await;
                    WorkerState::Reserve
                }
            }

            WorkerState::Process(url) => {
                process_url(id, &ctx, fetcher.as_ref(), &storage, url).await?;
                WorkerState::Reserve
            }

            WorkerState::Exit(reason) => {
                debug!(worker = id, ?reason, "worker exiting");
                return Ok(reason);
            }
        };
    }
}

/// Fetches, records and persists one claimed URL
///
/// `url` is the frontier key, so it is both the fetched URL and the
/// canonical key of the page record.
async fn process_url(
    id: usize,
    ctx: &RunContext,
    fetcher: &dyn PageFetcher,
    storage: &WorkerStorage,
    url: String,
) -> crate::Result<()> {
    debug!(worker = id, url = %url, "processing");

    let attempt = fetch_best(fetcher, &url, &ctx.strategies, ctx.fetch_timeout).await;
    ctx.stats.record_fetched();
    let metadata = page_metadata(&attempt);
    let run_id = ctx.run_id;
    let save_markdown = ctx.save_markdown;

    if !attempt.success {
        let error = attempt
            .error
            .clone()
            .unwrap_or_else(|| "fetch failed".to_string());
        warn!(worker = id, url = %url, strategy = %attempt.strategy, error = %error, "fetch failed");

        with_storage(storage, move |s| {
            s.upsert_crawled_page(&CrawledPage {
                run_id,
                url: &url,
                url_canonical: &url,
                page_kind: classify(&url),
                status: PageStatus::Failed,
                content: &attempt.content,
                save_markdown,
                title: &attempt.title,
                metadata,
                error: Some(error.as_str()),
            })?;
            s.mark_failed(&url, run_id, &error)
        })
        .await?;
        ctx.stats.record_failed();
        return Ok(());
    }

    let parsed = ctx.extractor.extract(&url, &attempt.content, &attempt.title);
    let site = ctx.extractor.site();
    let discovered: Vec<String> = parsed
        .discovered_urls
        .iter()
        .filter(|u| site.is_in_scope(u))
        .cloned()
        .collect();
    let discovered_count = discovered.len();
    let kind = parsed.page_kind;
    let strategy = attempt.strategy.clone();
    let words = attempt.word_count;
    let retry_limit = ctx.retry_limit;

    let page_url = url.clone();
    with_storage(storage, move |s| {
        s.upsert_crawled_page(&CrawledPage {
            run_id,
            url: &page_url,
            url_canonical: &page_url,
            page_kind: parsed.page_kind,
            status: PageStatus::Parsed,
            content: &attempt.content,
            save_markdown,
            title: &attempt.title,
            metadata,
            error: None,
        })?;
        s.persist_parsed_page(&parsed, &page_url)?;
        s.mark_done(&page_url, run_id)?;
        for link in &discovered {
            s.enqueue(link, run_id, &page_url, false, retry_limit)?;
        }
        Ok(())
    })
    .await?;

    ctx.stats.record_parsed();
    for _ in 0..discovered_count {
        ctx.stats.record_discovered();
        ctx.stats.record_queued();
    }

    debug!(
        worker = id,
        url = %url,
        kind = %kind.to_db_string(),
        strategy = %strategy,
        words,
        "parsed"
    );
    Ok(())
}

/// Fetch metadata plus the winning strategy, for `crawled_pages.metadata_json`
fn page_metadata(attempt: &FetchAttempt) -> Value {
    let mut map: Map<String, Value> = attempt
        .metadata
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    map.insert("strategy".to_string(), json!(attempt.strategy));
    map.insert("word_count".to_string(), json!(attempt.word_count));
    Value::Object(map)
}
