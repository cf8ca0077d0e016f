//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the pipeline, including:
//! - SQLite database initialization and schema management
//! - Crawl run bookkeeping
//! - The durable frontier queue and its claim protocol
//! - Crawled page records
//! - Idempotent upserts of extracted entities

mod entities;
mod frontier;
mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{EntityStore, FrontierStore, RunStore, StorageError, StorageResult};

use crate::state::{FrontierStatus, PageKind, PageStatus};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

/// Current UTC time as RFC 3339 with fixed microsecond precision
///
/// Fixed precision keeps stored timestamps lexically ordered.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// A row of the frontier queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url_canonical: String,
    pub status: FrontierStatus,
    pub attempts: u32,
    pub source_url: String,
    pub discovered_at: String,
    pub updated_at: String,
    pub last_run_id: Option<i64>,
    pub last_error: Option<String>,
}

/// Represents a crawl run
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub id: i64,
    pub mode: String,
    pub status: RunStatus,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub notes: String,
    pub config_hash: String,
}

/// A page fetch outcome to be written to `crawled_pages`
#[derive(Debug, Clone)]
pub struct CrawledPage<'a> {
    pub run_id: i64,
    /// URL as fetched
    pub url: &'a str,
    /// Frontier key of the page, shared with `crawl_frontier`
    pub url_canonical: &'a str,
    pub page_kind: PageKind,
    pub status: PageStatus,
    /// Fetched Markdown, hashed into `content_hash`
    pub content: &'a str,
    /// Store `content` as `cleaned_markdown`
    pub save_markdown: bool,
    pub title: &'a str,
    pub metadata: serde_json::Value,
    pub error: Option<&'a str>,
}

/// Crawled page totals for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageCounts {
    pub total: u64,
    pub parsed: u64,
    pub failed: u64,
    /// Counts per page kind, largest first
    pub by_kind: Vec<(String, u64)>,
    pub last_fetch: Option<String>,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Done,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "done" => Some(Self::Done),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns true once the run has been closed
    pub fn is_finished(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_roundtrip() {
        for status in &[RunStatus::Running, RunStatus::Done, RunStatus::Failed] {
            let db_str = status.to_db_string();
            let parsed = RunStatus::from_db_string(db_str);
            assert_eq!(Some(*status), parsed);
        }
    }

    #[test]
    fn test_run_status_invalid() {
        assert_eq!(RunStatus::from_db_string("completed"), None);
    }

    #[test]
    fn test_run_status_finished() {
        assert!(!RunStatus::Running.is_finished());
        assert!(RunStatus::Done.is_finished());
        assert!(RunStatus::Failed.is_finished());
    }

    #[test]
    fn test_timestamps_order_lexically() {
        let first = now_timestamp();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = now_timestamp();
        assert!(first < second);
        assert!(first.ends_with('Z'));
        // 2024-01-01T00:00:00.000000Z
        assert_eq!(first.len(), 27);
    }
}
