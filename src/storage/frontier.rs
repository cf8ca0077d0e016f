//! Frontier queue operations
//!
//! The frontier is a table keyed by canonical URL. Claiming takes SQLite's
//! write lock up front (`BEGIN IMMEDIATE`) and flips the oldest queued row in
//! a single `UPDATE ... RETURNING`, so two connections can never claim the
//! same row. Enqueue reads the existing row under the same lock and lets
//! [`FrontierStatus::on_enqueue`] decide whether it goes back to the queue.

use crate::extract::truncate_chars;
use crate::state::FrontierStatus;
use crate::storage::traits::{FrontierStore, StorageResult};
use crate::storage::{now_timestamp, FrontierEntry, SqliteStorage};
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use std::collections::HashMap;

/// Longest error message kept on a frontier row
const MAX_ERROR_CHARS: usize = 1_000;

impl FrontierStore for SqliteStorage {
    fn enqueue(
        &mut self,
        url_canonical: &str,
        run_id: i64,
        source_url: &str,
        force_requeue: bool,
        retry_limit: Option<u32>,
    ) -> StorageResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = now_timestamp();

        let existing: Option<(String, u32)> = tx
            .query_row(
                "SELECT status, attempts FROM crawl_frontier WHERE url_canonical = ?1",
                params![url_canonical],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match existing {
            None => {
                tx.execute(
                    "INSERT INTO crawl_frontier (
                       url_canonical, status, attempts, source_url, discovered_at, updated_at,
                       last_run_id, last_error
                     )
                     VALUES (?1, 'queued', 0, ?2, ?3, ?3, ?4, NULL)",
                    params![url_canonical, source_url, now, run_id],
                )?;
            }
            Some((status, attempts)) => {
                let status =
                    FrontierStatus::from_db_string(&status).unwrap_or(FrontierStatus::Failed);
                match status.on_enqueue(attempts, force_requeue, retry_limit) {
                    Some(next) => {
                        tx.execute(
                            "UPDATE crawl_frontier
                             SET status = ?1,
                                 attempts = CASE WHEN ?2 THEN 0 ELSE attempts END,
                                 source_url = ?3, updated_at = ?4, last_run_id = ?5,
                                 last_error = NULL
                             WHERE url_canonical = ?6",
                            params![
                                next.to_db_string(),
                                force_requeue,
                                source_url,
                                now,
                                run_id,
                                url_canonical
                            ],
                        )?;
                    }
                    None => {
                        tx.execute(
                            "UPDATE crawl_frontier
                             SET source_url = ?1, updated_at = ?2, last_run_id = ?3
                             WHERE url_canonical = ?4",
                            params![source_url, now, run_id, url_canonical],
                        )?;
                    }
                }
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn claim_next(&mut self, run_id: i64) -> StorageResult<Option<String>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let claimed: Option<String> = tx
            .query_row(
                "UPDATE crawl_frontier
                 SET status = 'processing', attempts = attempts + 1, updated_at = ?1, last_run_id = ?2
                 WHERE url_canonical = (
                   SELECT url_canonical
                   FROM crawl_frontier
                   WHERE status = 'queued'
                   ORDER BY updated_at, rowid
                   LIMIT 1
                 )
                 RETURNING url_canonical",
                params![now_timestamp(), run_id],
                |row| row.get(0),
            )
            .optional()?;

        tx.commit()?;
        Ok(claimed)
    }

    fn mark_done(&mut self, url_canonical: &str, run_id: i64) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE crawl_frontier
             SET status = 'done', updated_at = ?1, last_run_id = ?2, last_error = NULL
             WHERE url_canonical = ?3",
            params![now_timestamp(), run_id, url_canonical],
        )?;
        Ok(())
    }

    fn mark_failed(&mut self, url_canonical: &str, run_id: i64, error: &str) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE crawl_frontier
             SET status = 'failed', updated_at = ?1, last_run_id = ?2, last_error = ?3
             WHERE url_canonical = ?4 AND status <> 'done'",
            params![
                now_timestamp(),
                run_id,
                truncate_chars(error, MAX_ERROR_CHARS),
                url_canonical
            ],
        )?;
        Ok(())
    }

    fn reconcile_for_resume(&mut self, retry_limit: Option<u32>) -> StorageResult<usize> {
        let requeued = self.conn.execute(
            "UPDATE crawl_frontier
             SET status = 'queued', updated_at = ?1, last_error = NULL
             WHERE status = 'processing'
                OR (status = 'failed' AND (?2 IS NULL OR attempts < ?2))",
            params![now_timestamp(), retry_limit],
        )?;
        Ok(requeued)
    }

    fn count_pending(&self) -> StorageResult<u64> {
        let pending = self
            .count_by_status()?
            .into_iter()
            .filter(|(status, _)| status.is_pending())
            .map(|(_, count)| count)
            .sum();
        Ok(pending)
    }

    fn get_entry(&self, url_canonical: &str) -> StorageResult<Option<FrontierEntry>> {
        let entry = self
            .conn
            .query_row(
                "SELECT url_canonical, status, attempts, source_url, discovered_at, updated_at,
                        last_run_id, last_error
                 FROM crawl_frontier WHERE url_canonical = ?1",
                params![url_canonical],
                |row| {
                    Ok(FrontierEntry {
                        url_canonical: row.get(0)?,
                        status: FrontierStatus::from_db_string(&row.get::<_, String>(1)?)
                            .unwrap_or(FrontierStatus::Failed),
                        attempts: row.get(2)?,
                        source_url: row.get(3)?,
                        discovered_at: row.get(4)?,
                        updated_at: row.get(5)?,
                        last_run_id: row.get(6)?,
                        last_error: row.get(7)?,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    fn count_by_status(&self) -> StorageResult<HashMap<FrontierStatus, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM crawl_frontier GROUP BY status")?;

        let rows = stmt.query_map([], |row| {
            let status: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((status, count))
        })?;

        let mut counts = HashMap::new();
        for row in rows {
            let (status, count) = row?;
            if let Some(status) = FrontierStatus::from_db_string(&status) {
                counts.insert(status, count as u64);
            }
        }

        Ok(counts)
    }
}
