//! End-to-end crawl runs over a scripted fetcher and a temporary database

use crate::common::{
    catalog, count, frontier_status, test_config, BRANDS, MODEL, RACK, SEED, WHEEL,
};
use partselect_ingest::crawler::{Coordinator, RUN_MODE};
use partselect_ingest::storage::{FrontierStore, RunStatus, RunStore, SqliteStorage};
use partselect_ingest::IngestError;
use rusqlite::Connection;
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_full_crawl_of_catalog() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("ingest.db");
    let fetcher = Arc::new(catalog());

    let summary = Coordinator::new(test_config(&db, &[SEED]), "hash-1", fetcher.clone())
        .run()
        .await
        .unwrap();

    // Only in-scope site links were followed
    assert_eq!(fetcher.fetched_urls(), vec![BRANDS, SEED, MODEL, RACK, WHEEL]);

    assert_eq!(summary.stats.fetched, 5);
    assert_eq!(summary.stats.parsed, 4);
    assert_eq!(summary.stats.failed, 1);
    assert_eq!(summary.stats.discovered, 4);
    assert_eq!(summary.stats.queued, 5);

    for url in [SEED, MODEL, RACK, WHEEL] {
        assert_eq!(frontier_status(&db, url).as_deref(), Some("done"), "{}", url);
    }
    assert_eq!(frontier_status(&db, BRANDS).as_deref(), Some("failed"));

    assert_eq!(count(&db, "models"), 1);
    assert_eq!(count(&db, "parts"), 2);
    assert_eq!(count(&db, "model_parts"), 2);
    assert_eq!(count(&db, "crawled_pages"), 5);

    let storage = SqliteStorage::open(&db).unwrap();
    let run = storage.get_run(summary.run_id).unwrap();
    assert_eq!(run.status, RunStatus::Done);
    assert_eq!(run.mode, RUN_MODE);
    assert_eq!(run.config_hash, "hash-1");
    assert!(run.notes.contains("parallel=3"));
    assert!(run.finished_at.is_some());

    let pages = storage.count_crawled_pages(summary.run_id).unwrap();
    assert_eq!(pages.parsed, 4);
    assert_eq!(pages.failed, 1);
}

#[tokio::test]
async fn test_part_rows_carry_extracted_fields() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("ingest.db");

    Coordinator::new(test_config(&db, &[SEED]), "hash", Arc::new(catalog()))
        .run()
        .await
        .unwrap();

    let conn = Connection::open(&db).unwrap();
    let (mpn, price, source): (Option<String>, Option<f64>, String) = conn
        .query_row(
            "SELECT manufacturer_part_number, price_value, source_url
             FROM parts WHERE partselect_number = 'PS3406971'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap();
    assert_eq!(mpn.as_deref(), Some("W10195416"));
    assert_eq!(price, Some(24.99));
    assert_eq!(source, RACK);

    let (status, error, metadata): (String, Option<String>, String) = conn
        .query_row(
            "SELECT status, last_error, metadata_json FROM crawled_pages WHERE url_canonical = ?1",
            [BRANDS],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap();
    assert_eq!(status, "failed");
    assert!(error.unwrap().contains("connection reset"));
    let metadata: serde_json::Value = serde_json::from_str(&metadata).unwrap();
    assert_eq!(metadata["strategy"], "baseline");
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("ingest.db");

    Coordinator::new(test_config(&db, &[SEED]), "hash", Arc::new(catalog()))
        .run()
        .await
        .unwrap();

    let mut config = test_config(&db, &[SEED]);
    config.crawler.requeue_seeds_on_start = true;
    let fetcher = Arc::new(catalog());
    let summary = Coordinator::new(config, "hash", fetcher.clone())
        .run()
        .await
        .unwrap();

    // The forced seed and the failed page come back; finished pages stay done
    assert_eq!(fetcher.fetched_urls(), vec![BRANDS, SEED]);
    assert_eq!(summary.stats.fetched, 2);

    assert_eq!(count(&db, "models"), 1);
    assert_eq!(count(&db, "parts"), 2);
    assert_eq!(count(&db, "model_parts"), 2);
    assert_eq!(count(&db, "crawl_frontier"), 5);
    assert_eq!(count(&db, "crawl_runs"), 2);
}

#[tokio::test]
async fn test_retry_limit_skips_exhausted_failures() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("ingest.db");

    Coordinator::new(test_config(&db, &[SEED]), "hash", Arc::new(catalog()))
        .run()
        .await
        .unwrap();

    let mut config = test_config(&db, &[SEED]);
    config.crawler.retry_limit = Some(1);
    let fetcher = Arc::new(catalog());
    let summary = Coordinator::new(config, "hash", fetcher.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.stats.fetched, 0);
    assert!(fetcher.fetched_urls().is_empty());
    assert_eq!(frontier_status(&db, BRANDS).as_deref(), Some("failed"));
}

#[tokio::test]
async fn test_page_cap_is_exact() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("ingest.db");

    let mut config = test_config(&db, &[SEED]);
    config.crawler.concurrency = 4;
    config.crawler.max_pages = 2;
    let summary = Coordinator::new(config, "hash", Arc::new(catalog()))
        .run()
        .await
        .unwrap();

    assert_eq!(summary.stats.fetched, 2);
    assert_eq!(count(&db, "crawled_pages"), 2);

    let storage = SqliteStorage::open(&db).unwrap();
    assert!(storage.count_pending().unwrap() > 0);
    let run = storage.get_run(summary.run_id).unwrap();
    assert_eq!(run.status, RunStatus::Done);
}

#[tokio::test]
async fn test_resume_after_crash() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("ingest.db");

    // A previous run claimed the seed and died
    {
        let mut storage = SqliteStorage::open(&db).unwrap();
        let crashed = storage.begin_run(RUN_MODE, "", "hash").unwrap();
        storage.enqueue(SEED, crashed, "", false, None).unwrap();
        assert_eq!(storage.claim_next(crashed).unwrap().as_deref(), Some(SEED));
    }

    let summary = Coordinator::new(test_config(&db, &[SEED]), "hash", Arc::new(catalog()))
        .run()
        .await
        .unwrap();

    let storage = SqliteStorage::open(&db).unwrap();
    let seed = storage.get_entry(SEED).unwrap().unwrap();
    assert_eq!(seed.attempts, 2);
    assert_eq!(seed.last_run_id, Some(summary.run_id));
    assert_eq!(frontier_status(&db, SEED).as_deref(), Some("done"));
    assert_eq!(count(&db, "models"), 1);
}

#[tokio::test]
async fn test_storage_error_fails_run() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("ingest.db");

    let hook_db = db.clone();
    let fetcher = catalog().hook(
        MODEL,
        Box::new(move || {
            let conn = Connection::open(&hook_db).unwrap();
            conn.execute_batch("DROP TABLE IF EXISTS parts").unwrap();
        }),
    );

    let mut config = test_config(&db, &[SEED]);
    config.crawler.concurrency = 1;
    let result = Coordinator::new(config, "hash", Arc::new(fetcher)).run().await;
    assert!(matches!(result, Err(IngestError::Storage(_))));

    let storage = SqliteStorage::open(&db).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.finished_at.is_some());

    // Left for the next run's reconciliation
    assert_eq!(frontier_status(&db, MODEL).as_deref(), Some("processing"));
}

#[tokio::test]
async fn test_malformed_seed_is_skipped() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("ingest.db");

    let summary = Coordinator::new(
        test_config(&db, &["not a url", RACK]),
        "hash",
        Arc::new(catalog()),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(summary.stats.queued, 1);
    assert_eq!(summary.stats.parsed, 1);
    assert_eq!(count(&db, "crawl_frontier"), 1);
}

#[tokio::test]
async fn test_out_of_scope_seed_never_reaches_frontier() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("ingest.db");
    let homepage = "https://www.partselect.com/";
    let fetcher = Arc::new(catalog());

    let summary = Coordinator::new(test_config(&db, &[homepage, SEED]), "hash", fetcher.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(frontier_status(&db, homepage), None);
    assert!(!fetcher.fetched_urls().iter().any(|u| u == homepage));
    assert_eq!(summary.stats.fetched, 5);
    assert_eq!(count(&db, "crawl_frontier"), 5);
}

#[tokio::test]
async fn test_rediscovered_failure_respects_retry_limit() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("ingest.db");

    Coordinator::new(test_config(&db, &[SEED]), "hash", Arc::new(catalog()))
        .run()
        .await
        .unwrap();

    // The forced seed links to BRANDS again
    let mut config = test_config(&db, &[SEED]);
    config.crawler.retry_limit = Some(1);
    config.crawler.requeue_seeds_on_start = true;
    let fetcher = Arc::new(catalog());
    Coordinator::new(config, "hash", fetcher.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(fetcher.fetched_urls(), vec![SEED]);
    assert_eq!(frontier_status(&db, BRANDS).as_deref(), Some("failed"));

    let storage = SqliteStorage::open(&db).unwrap();
    let brands = storage.get_entry(BRANDS).unwrap().unwrap();
    assert_eq!(brands.attempts, 1);
    assert_eq!(brands.source_url, SEED);
    assert!(brands.last_error.unwrap().contains("connection reset"));
}

#[tokio::test]
async fn test_apex_alias_links_share_one_page_key() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("ingest.db");

    // Seed and link both use the apex host
    let fetcher = catalog().page(
        SEED,
        "Dishwasher Parts",
        "# Dishwasher Parts\n[Rack](http://partselect.com/PS3406971-Whirlpool-W10195416-Lower-Rack.htm)\n",
    );
    Coordinator::new(
        test_config(&db, &["https://partselect.com/Dishwasher-Parts.htm"]),
        "hash",
        Arc::new(fetcher),
    )
    .run()
    .await
    .unwrap();

    let conn = Connection::open(&db).unwrap();
    let mut stmt = conn
        .prepare(
            "SELECT p.url_canonical FROM crawled_pages p
             LEFT JOIN crawl_frontier f ON f.url_canonical = p.url_canonical
             WHERE f.url_canonical IS NULL",
        )
        .unwrap();
    let orphans: Vec<String> = stmt
        .query_map([], |row| row.get(0))
        .unwrap()
        .map(Result::unwrap)
        .collect();
    assert!(orphans.is_empty(), "page records without a frontier row: {:?}", orphans);

    assert_eq!(count(&db, "crawled_pages"), 2);
    assert_eq!(frontier_status(&db, SEED).as_deref(), Some("done"));
    assert_eq!(frontier_status(&db, RACK).as_deref(), Some("done"));
}
