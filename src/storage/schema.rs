//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the ingestion database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS crawl_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    mode TEXT NOT NULL,
    status TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    notes TEXT NOT NULL DEFAULT '',
    config_hash TEXT NOT NULL DEFAULT ''
);

-- Durable work queue, one row per canonical URL
CREATE TABLE IF NOT EXISTS crawl_frontier (
    url_canonical TEXT PRIMARY KEY,
    status TEXT NOT NULL,
    attempts INTEGER NOT NULL DEFAULT 0,
    source_url TEXT NOT NULL DEFAULT '',
    discovered_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    last_run_id INTEGER REFERENCES crawl_runs(id),
    last_error TEXT
);

CREATE INDEX IF NOT EXISTS idx_frontier_status_updated ON crawl_frontier(status, updated_at);

-- Last fetch of every page, overwritten on re-crawl
CREATE TABLE IF NOT EXISTS crawled_pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES crawl_runs(id),
    url TEXT NOT NULL,
    url_canonical TEXT NOT NULL UNIQUE,
    url_hash TEXT NOT NULL,
    content_hash TEXT,
    page_kind TEXT NOT NULL,
    status TEXT NOT NULL,
    title TEXT NOT NULL DEFAULT '',
    cleaned_markdown TEXT NOT NULL DEFAULT '',
    metadata_json TEXT NOT NULL DEFAULT '{}',
    fetched_at TEXT NOT NULL,
    parsed_at TEXT NOT NULL,
    last_error TEXT
);

CREATE INDEX IF NOT EXISTS idx_crawled_pages_run ON crawled_pages(run_id);
CREATE INDEX IF NOT EXISTS idx_crawled_pages_status ON crawled_pages(status);

CREATE TABLE IF NOT EXISTS models (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    model_number TEXT NOT NULL UNIQUE,
    brand TEXT,
    appliance_type TEXT,
    source_url TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS parts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    partselect_number TEXT NOT NULL UNIQUE,
    manufacturer_part_number TEXT,
    name TEXT,
    price_value REAL,
    source_url TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS model_parts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    model_id INTEGER NOT NULL REFERENCES models(id),
    part_id INTEGER NOT NULL REFERENCES parts(id),
    compatibility_confidence REAL NOT NULL DEFAULT 1.0,
    source_url TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(model_id, part_id)
);

CREATE INDEX IF NOT EXISTS idx_model_parts_part ON model_parts(part_id);

CREATE TABLE IF NOT EXISTS model_symptoms (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    model_id INTEGER NOT NULL REFERENCES models(id),
    symptom TEXT NOT NULL,
    source_url TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(model_id, symptom)
);

CREATE TABLE IF NOT EXISTS model_media (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    model_id INTEGER NOT NULL REFERENCES models(id),
    media_type TEXT NOT NULL,
    title TEXT NOT NULL,
    media_url TEXT NOT NULL,
    source_url TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(model_id, media_type, media_url)
);

CREATE TABLE IF NOT EXISTS model_qa (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    model_id INTEGER NOT NULL REFERENCES models(id),
    question TEXT NOT NULL,
    answer TEXT NOT NULL,
    source_url TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(model_id, question, answer)
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
