//! SQLite storage implementation
//!
//! This module provides the SQLite backend and its run bookkeeping. The
//! frontier and entity stores are implemented for the same type in
//! `frontier.rs` and `entities.rs`.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{RunStore, StorageError, StorageResult};
use crate::storage::{now_timestamp, PageCounts, RunRecord, RunStatus};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::time::Duration;

/// How long a connection waits on another connection's write lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// SQLite storage backend
///
/// Each worker opens its own instance; WAL mode lets readers proceed while
/// a writer holds the lock.
pub struct SqliteStorage {
    pub(super) conn: Connection,
}

impl SqliteStorage {
    /// Opens (or creates) the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        // Configure SQLite for concurrent writers
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        // Initialize schema
        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        mode: row.get(1)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(2)?)
            .unwrap_or(RunStatus::Running),
        started_at: row.get(3)?,
        finished_at: row.get(4)?,
        notes: row.get(5)?,
        config_hash: row.get(6)?,
    })
}

const RUN_COLUMNS: &str = "id, mode, status, started_at, finished_at, notes, config_hash";

impl RunStore for SqliteStorage {
    fn begin_run(&mut self, mode: &str, notes: &str, config_hash: &str) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO crawl_runs (mode, status, started_at, notes, config_hash)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                mode,
                RunStatus::Running.to_db_string(),
                now_timestamp(),
                notes,
                config_hash
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn end_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE crawl_runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now_timestamp(), run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let query = format!("SELECT {} FROM crawl_runs WHERE id = ?1", RUN_COLUMNS);
        self.conn
            .query_row(&query, params![run_id], run_from_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let query = format!(
            "SELECT {} FROM crawl_runs ORDER BY id DESC LIMIT 1",
            RUN_COLUMNS
        );
        let run = self.conn.query_row(&query, [], run_from_row).optional()?;
        Ok(run)
    }

    fn count_crawled_pages(&self, run_id: i64) -> StorageResult<PageCounts> {
        let (total, parsed, failed, last_fetch) = self.conn.query_row(
            "SELECT
               COUNT(*),
               COALESCE(SUM(status = 'parsed'), 0),
               COALESCE(SUM(status = 'failed'), 0),
               MAX(fetched_at)
             FROM crawled_pages
             WHERE run_id = ?1",
            params![run_id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            },
        )?;

        let mut stmt = self.conn.prepare(
            "SELECT page_kind, COUNT(*) AS n
             FROM crawled_pages
             WHERE run_id = ?1
             GROUP BY page_kind
             ORDER BY n DESC, page_kind",
        )?;
        let by_kind = stmt
            .query_map(params![run_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PageCounts {
            total: total as u64,
            parsed: parsed as u64,
            failed: failed as u64,
            by_kind,
            last_fetch,
        })
    }
}
