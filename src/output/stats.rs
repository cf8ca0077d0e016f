//! Run statistics and progress reports
//!
//! This module provides the live counters shared by workers during a run and
//! the progress report read back from the database for `--stats`.

use crate::state::FrontierStatus;
use crate::storage::{FrontierStore, PageCounts, RunRecord, RunStore, StorageResult};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters for one run, shared by every worker
#[derive(Debug, Default)]
pub struct CrawlStats {
    queued: AtomicU64,
    fetched: AtomicU64,
    parsed: AtomicU64,
    failed: AtomicU64,
    discovered: AtomicU64,
}

/// Point-in-time copy of `CrawlStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStatsSnapshot {
    /// URLs enqueued (seeds plus in-scope discoveries)
    pub queued: u64,
    /// URLs claimed and fetched
    pub fetched: u64,
    pub parsed: u64,
    pub failed: u64,
    /// In-scope links found on parsed pages
    pub discovered: u64,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_queued(&self) {
        self.queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetched(&self) {
        self.fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_parsed(&self) {
        self.parsed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_discovered(&self) {
        self.discovered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CrawlStatsSnapshot {
        CrawlStatsSnapshot {
            queued: self.queued.load(Ordering::Relaxed),
            fetched: self.fetched.load(Ordering::Relaxed),
            parsed: self.parsed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            discovered: self.discovered.load(Ordering::Relaxed),
        }
    }
}

/// Progress of one run as recorded in the database
#[derive(Debug, Clone, Serialize)]
pub struct ProgressReport {
    pub run: RunRecord,
    pub pages: PageCounts,
    /// Frontier totals in lifecycle order
    pub frontier: Vec<(FrontierStatus, u64)>,
}

impl ProgressReport {
    /// Returns true once the run has been closed
    pub fn is_finished(&self) -> bool {
        self.run.status.is_finished()
    }

    pub fn frontier_count(&self, status: FrontierStatus) -> u64 {
        self.frontier
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }
}

/// Loads a progress report from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `run_id` - Run to report on; the latest run when `None`
///
/// # Returns
///
/// * `Ok(Some(report))` - The run exists
/// * `Ok(None)` - No run has been recorded yet
/// * `Err(StorageError)` - Query failed or `run_id` is unknown
pub fn load_progress<S>(storage: &S, run_id: Option<i64>) -> StorageResult<Option<ProgressReport>>
where
    S: RunStore + FrontierStore,
{
    let run = match run_id {
        Some(id) => storage.get_run(id)?,
        None => match storage.get_latest_run()? {
            Some(run) => run,
            None => return Ok(None),
        },
    };

    let pages = storage.count_crawled_pages(run.id)?;
    let by_status = storage.count_by_status()?;
    let frontier = FrontierStatus::all_states()
        .into_iter()
        .map(|status| (status, by_status.get(&status).copied().unwrap_or(0)))
        .collect();

    Ok(Some(ProgressReport {
        run,
        pages,
        frontier,
    }))
}

/// Prints a progress report to stdout in a formatted manner
pub fn print_progress(report: &ProgressReport) {
    let run = &report.run;
    println!("=== Run {} ({}) ===\n", run.id, run.mode);

    println!("Run:");
    println!("  Status: {}", run.status.to_db_string());
    println!("  Started: {}", run.started_at);
    println!(
        "  Finished: {}",
        run.finished_at.as_deref().unwrap_or("-")
    );
    if !run.notes.is_empty() {
        println!("  Notes: {}", run.notes);
    }
    println!();

    let pages = &report.pages;
    println!("Crawled Pages:");
    println!("  Total: {}", pages.total);
    println!("  Parsed: {}", pages.parsed);
    println!("  Failed: {}", pages.failed);
    for (kind, count) in &pages.by_kind {
        let percentage = if pages.total > 0 {
            (*count as f64 / pages.total as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", kind, count, percentage);
    }
    println!(
        "  Last fetch: {}",
        pages.last_fetch.as_deref().unwrap_or("-")
    );
    println!();

    println!("Frontier:");
    for (status, count) in &report.frontier {
        println!("  {}: {}", status.to_db_string(), count);
    }
    println!();

    let success_rate = if pages.total > 0 {
        (pages.parsed as f64 / pages.total as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "Success Rate: {:.1}% ({} / {} pages parsed)",
        success_rate, pages.parsed, pages.total
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FrontierStore, RunStatus, SqliteStorage};

    #[test]
    fn test_counters_and_snapshot() {
        let stats = CrawlStats::new();
        stats.record_queued();
        stats.record_queued();
        stats.record_fetched();
        stats.record_parsed();
        stats.record_discovered();

        assert_eq!(
            stats.snapshot(),
            CrawlStatsSnapshot {
                queued: 2,
                fetched: 1,
                parsed: 1,
                failed: 0,
                discovered: 1,
            }
        );
    }

    #[test]
    fn test_snapshot_serializes_to_json() {
        let snapshot = CrawlStatsSnapshot {
            queued: 3,
            fetched: 2,
            parsed: 1,
            failed: 1,
            discovered: 4,
        };
        let json = serde_json::to_value(snapshot).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "queued": 3, "fetched": 2, "parsed": 1, "failed": 1, "discovered": 4
            })
        );
    }

    #[test]
    fn test_load_progress_without_runs() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        assert!(load_progress(&storage, None).unwrap().is_none());
    }

    #[test]
    fn test_load_progress_latest_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.begin_run("prefetch", "parallel=2", "hash").unwrap();
        storage
            .enqueue("https://www.partselect.com/Models/A1", run_id, "", false, None)
            .unwrap();
        storage
            .enqueue("https://www.partselect.com/Models/B2", run_id, "", false, None)
            .unwrap();
        storage.claim_next(run_id).unwrap();

        let report = load_progress(&storage, None).unwrap().unwrap();
        assert_eq!(report.run.id, run_id);
        assert!(!report.is_finished());
        assert_eq!(report.frontier_count(FrontierStatus::Queued), 1);
        assert_eq!(report.frontier_count(FrontierStatus::Processing), 1);
        assert_eq!(report.frontier_count(FrontierStatus::Done), 0);
        assert_eq!(report.pages.total, 0);

        storage.end_run(run_id, RunStatus::Done).unwrap();
        let report = load_progress(&storage, Some(run_id)).unwrap().unwrap();
        assert!(report.is_finished());
    }

    #[test]
    fn test_load_progress_unknown_run() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        assert!(load_progress(&storage, Some(42)).is_err());
    }
}
