//! Claim exclusivity across independent connections to one database file

use partselect_ingest::state::FrontierStatus;
use partselect_ingest::storage::{FrontierStore, RunStore, SqliteStorage};
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

const URLS: usize = 40;
const WORKERS: usize = 8;

#[test]
fn test_concurrent_claims_never_overlap() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("frontier.db");

    let run_id = {
        let mut storage = SqliteStorage::open(&db).unwrap();
        let run_id = storage.begin_run("prefetch", "", "hash").unwrap();
        for i in 0..URLS {
            let url = format!("https://www.partselect.com/Models/M{:03}", i);
            storage.enqueue(&url, run_id, "", false, None).unwrap();
        }
        run_id
    };

    let barrier = Arc::new(Barrier::new(WORKERS));
    let handles: Vec<_> = (0..WORKERS)
        .map(|_| {
            let db = db.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut storage = SqliteStorage::open(&db).unwrap();
                barrier.wait();
                let mut claimed = Vec::new();
                while let Some(url) = storage.claim_next(run_id).unwrap() {
                    claimed.push(url);
                }
                claimed
            })
        })
        .collect();

    let mut seen = HashSet::new();
    let mut total = 0;
    for handle in handles {
        for url in handle.join().unwrap() {
            assert!(seen.insert(url.clone()), "claimed twice: {}", url);
            total += 1;
        }
    }
    assert_eq!(total, URLS);

    let storage = SqliteStorage::open(&db).unwrap();
    let counts = storage.count_by_status().unwrap();
    assert_eq!(counts.get(&FrontierStatus::Processing).copied(), Some(URLS as u64));
    assert_eq!(storage.count_pending().unwrap(), URLS as u64);

    for url in &seen {
        assert_eq!(storage.get_entry(url).unwrap().unwrap().attempts, 1);
    }
}
