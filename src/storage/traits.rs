//! Storage traits and error types
//!
//! This module defines the trait interfaces for storage backends and
//! associated error types. The pipeline talks to three stores: run
//! bookkeeping, the frontier queue, and the entity tables.

use crate::extract::{ModelMedia, ParsedModel, ParsedPage, ParsedPart, QaPair};
use crate::state::FrontierStatus;
use crate::storage::{CrawledPage, FrontierEntry, PageCounts, RunRecord, RunStatus};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Crawl run bookkeeping
pub trait RunStore {
    /// Opens a new run in `running` status
    ///
    /// # Arguments
    ///
    /// * `mode` - Run mode label, e.g. `prefetch`
    /// * `notes` - Free-form notes (concurrency, runtime budget)
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn begin_run(&mut self, mode: &str, notes: &str, config_hash: &str) -> StorageResult<i64>;

    /// Closes a run with its final status and a finish timestamp
    fn end_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Counts crawled pages recorded by a run
    fn count_crawled_pages(&self, run_id: i64) -> StorageResult<PageCounts>;
}

/// Durable work queue keyed by canonical URL
///
/// Every operation is a single transaction. `claim_next` and `enqueue` read
/// before they write, so both hold the write lock for their whole transaction.
pub trait FrontierStore {
    // ===== Queue Mutation =====

    /// Adds a URL to the frontier or refreshes its discovery metadata
    ///
    /// Without `force_requeue`, `done` and `processing` entries keep their
    /// status, as do failed entries that already used `retry_limit` attempts;
    /// anything else becomes `queued` with its error cleared. With
    /// `force_requeue`, the entry is reset to `queued` with zero attempts.
    ///
    /// # Arguments
    ///
    /// * `url_canonical` - Canonical URL (the queue key)
    /// * `run_id` - Run doing the discovery
    /// * `source_url` - Page that linked to it, empty for seeds
    /// * `force_requeue` - Reset even finished entries
    /// * `retry_limit` - Attempts after which a failure stays failed
    fn enqueue(
        &mut self,
        url_canonical: &str,
        run_id: i64,
        source_url: &str,
        force_requeue: bool,
        retry_limit: Option<u32>,
    ) -> StorageResult<()>;

    /// Atomically claims the oldest queued URL
    ///
    /// Flips it to `processing` and increments `attempts`. Concurrent
    /// claimants never receive the same URL.
    ///
    /// # Returns
    ///
    /// * `Some(url)` - The claimed canonical URL
    /// * `None` - Nothing is queued
    fn claim_next(&mut self, run_id: i64) -> StorageResult<Option<String>>;

    /// Marks a URL as done and clears its error
    fn mark_done(&mut self, url_canonical: &str, run_id: i64) -> StorageResult<()>;

    /// Marks a URL as failed; never downgrades a `done` entry
    fn mark_failed(&mut self, url_canonical: &str, run_id: i64, error: &str) -> StorageResult<()>;

    /// Returns interrupted and failed URLs to the queue
    ///
    /// With `retry_limit`, failed entries that already used that many
    /// attempts stay failed.
    ///
    /// # Returns
    ///
    /// The number of entries requeued
    fn reconcile_for_resume(&mut self, retry_limit: Option<u32>) -> StorageResult<usize>;

    // ===== Inspection =====

    /// Counts entries that are queued or processing
    fn count_pending(&self) -> StorageResult<u64>;

    /// Gets a frontier entry by canonical URL
    fn get_entry(&self, url_canonical: &str) -> StorageResult<Option<FrontierEntry>>;

    /// Counts entries per status
    fn count_by_status(&self) -> StorageResult<HashMap<FrontierStatus, u64>>;
}

/// Idempotent writes of extracted entities and crawled page records
pub trait EntityStore {
    // ===== Entities =====

    /// Upserts a model by model number
    ///
    /// # Returns
    ///
    /// The model row ID
    fn upsert_model(&mut self, model: &ParsedModel, source_url: &str) -> StorageResult<i64>;

    /// Upserts a part by part number
    ///
    /// # Returns
    ///
    /// The part row ID
    fn upsert_part(&mut self, part: &ParsedPart, source_url: &str) -> StorageResult<i64>;

    /// Links a model to a compatible part
    fn upsert_model_part(&mut self, model_id: i64, part_id: i64, source_url: &str)
        -> StorageResult<()>;

    fn upsert_model_symptom(&mut self, model_id: i64, symptom: &str, source_url: &str)
        -> StorageResult<()>;

    fn upsert_model_media(
        &mut self,
        model_id: i64,
        media: &ModelMedia,
        source_url: &str,
    ) -> StorageResult<()>;

    fn upsert_model_qa(&mut self, model_id: i64, qa: &QaPair, source_url: &str)
        -> StorageResult<()>;

    /// Persists everything extracted from one page in a single transaction
    fn persist_parsed_page(&mut self, page: &ParsedPage, source_url: &str) -> StorageResult<()>;

    // ===== Page Records =====

    /// Writes the per-URL page record, replacing any earlier fetch
    fn upsert_crawled_page(&mut self, page: &CrawledPage<'_>) -> StorageResult<()>;
}
