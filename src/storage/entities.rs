//! Entity tables and crawled page records
//!
//! Every write is an upsert on the entity's natural key. Scalar columns merge
//! coalesce-style: a new value wins unless it is null or empty, so a re-crawl
//! from a thinner page never erases what an earlier page captured.

use crate::extract::{ModelMedia, ParsedModel, ParsedPage, ParsedPart, QaPair};
use crate::storage::traits::{EntityStore, StorageResult};
use crate::storage::{now_timestamp, CrawledPage, SqliteStorage};
use rusqlite::{params, Connection, TransactionBehavior};
use sha2::{Digest, Sha256};

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

fn upsert_model(conn: &Connection, model: &ParsedModel, source_url: &str) -> StorageResult<i64> {
    let id = conn.query_row(
        "INSERT INTO models (model_number, brand, appliance_type, source_url, updated_at)
         VALUES (?1, NULLIF(?2, ''), ?3, ?4, ?5)
         ON CONFLICT(model_number) DO UPDATE SET
           brand = COALESCE(excluded.brand, models.brand),
           appliance_type = CASE
             WHEN excluded.appliance_type IS NULL OR excluded.appliance_type IN ('', 'unknown')
               THEN COALESCE(models.appliance_type, excluded.appliance_type)
             ELSE excluded.appliance_type
           END,
           source_url = excluded.source_url,
           updated_at = excluded.updated_at
         RETURNING id",
        params![
            model.model_number.trim().to_uppercase(),
            model.brand,
            model.appliance_type,
            source_url,
            now_timestamp()
        ],
        |row| row.get(0),
    )?;
    Ok(id)
}

fn upsert_part(conn: &Connection, part: &ParsedPart, source_url: &str) -> StorageResult<i64> {
    let id = conn.query_row(
        "INSERT INTO parts (partselect_number, manufacturer_part_number, name, price_value, source_url, updated_at)
         VALUES (?1, NULLIF(?2, ''), NULLIF(?3, ''), ?4, ?5, ?6)
         ON CONFLICT(partselect_number) DO UPDATE SET
           manufacturer_part_number = COALESCE(excluded.manufacturer_part_number, parts.manufacturer_part_number),
           name = COALESCE(excluded.name, parts.name),
           price_value = COALESCE(excluded.price_value, parts.price_value),
           source_url = excluded.source_url,
           updated_at = excluded.updated_at
         RETURNING id",
        params![
            part.partselect_number.trim().to_uppercase(),
            part.manufacturer_part_number,
            part.name,
            part.price_value,
            source_url,
            now_timestamp()
        ],
        |row| row.get(0),
    )?;
    Ok(id)
}

fn upsert_model_part(
    conn: &Connection,
    model_id: i64,
    part_id: i64,
    source_url: &str,
) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO model_parts (model_id, part_id, compatibility_confidence, source_url, updated_at)
         VALUES (?1, ?2, 1.0, ?3, ?4)
         ON CONFLICT(model_id, part_id) DO UPDATE SET
           source_url = excluded.source_url,
           updated_at = excluded.updated_at",
        params![model_id, part_id, source_url, now_timestamp()],
    )?;
    Ok(())
}

fn upsert_model_symptom(
    conn: &Connection,
    model_id: i64,
    symptom: &str,
    source_url: &str,
) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO model_symptoms (model_id, symptom, source_url, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(model_id, symptom) DO UPDATE SET
           source_url = excluded.source_url,
           updated_at = excluded.updated_at",
        params![model_id, symptom, source_url, now_timestamp()],
    )?;
    Ok(())
}

fn upsert_model_media(
    conn: &Connection,
    model_id: i64,
    media: &ModelMedia,
    source_url: &str,
) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO model_media (model_id, media_type, title, media_url, source_url, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(model_id, media_type, media_url) DO UPDATE SET
           title = CASE WHEN excluded.title = '' THEN model_media.title ELSE excluded.title END,
           source_url = excluded.source_url,
           updated_at = excluded.updated_at",
        params![
            model_id,
            media.media_type,
            media.title,
            media.url,
            source_url,
            now_timestamp()
        ],
    )?;
    Ok(())
}

fn upsert_model_qa(
    conn: &Connection,
    model_id: i64,
    qa: &QaPair,
    source_url: &str,
) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO model_qa (model_id, question, answer, source_url, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(model_id, question, answer) DO UPDATE SET
           source_url = excluded.source_url,
           updated_at = excluded.updated_at",
        params![model_id, qa.question, qa.answer, source_url, now_timestamp()],
    )?;
    Ok(())
}

/// Writes a model and everything hanging off it
fn persist_model(conn: &Connection, model: &ParsedModel, source_url: &str) -> StorageResult<()> {
    let model_id = upsert_model(conn, model, source_url)?;

    for part in &model.parts {
        let part_source = if part.part_url.is_empty() {
            source_url
        } else {
            part.part_url.as_str()
        };
        let part_id = upsert_part(conn, part, part_source)?;
        upsert_model_part(conn, model_id, part_id, source_url)?;
    }

    for symptom in &model.symptoms {
        upsert_model_symptom(conn, model_id, symptom, source_url)?;
    }

    for media in &model.media {
        upsert_model_media(conn, model_id, media, source_url)?;
    }

    for qa in &model.qa {
        upsert_model_qa(conn, model_id, qa, source_url)?;
    }

    Ok(())
}

impl EntityStore for SqliteStorage {
    fn upsert_model(&mut self, model: &ParsedModel, source_url: &str) -> StorageResult<i64> {
        upsert_model(&self.conn, model, source_url)
    }

    fn upsert_part(&mut self, part: &ParsedPart, source_url: &str) -> StorageResult<i64> {
        upsert_part(&self.conn, part, source_url)
    }

    fn upsert_model_part(
        &mut self,
        model_id: i64,
        part_id: i64,
        source_url: &str,
    ) -> StorageResult<()> {
        upsert_model_part(&self.conn, model_id, part_id, source_url)
    }

    fn upsert_model_symptom(
        &mut self,
        model_id: i64,
        symptom: &str,
        source_url: &str,
    ) -> StorageResult<()> {
        upsert_model_symptom(&self.conn, model_id, symptom, source_url)
    }

    fn upsert_model_media(
        &mut self,
        model_id: i64,
        media: &ModelMedia,
        source_url: &str,
    ) -> StorageResult<()> {
        upsert_model_media(&self.conn, model_id, media, source_url)
    }

    fn upsert_model_qa(
        &mut self,
        model_id: i64,
        qa: &QaPair,
        source_url: &str,
    ) -> StorageResult<()> {
        upsert_model_qa(&self.conn, model_id, qa, source_url)
    }

    fn persist_parsed_page(&mut self, page: &ParsedPage, source_url: &str) -> StorageResult<()> {
        if page.model.is_none() && page.part.is_none() {
            return Ok(());
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        if let Some(model) = &page.model {
            persist_model(&tx, model, source_url)?;
        }

        if let Some(part) = &page.part {
            upsert_part(&tx, part, source_url)?;
        }

        tx.commit()?;
        Ok(())
    }

    fn upsert_crawled_page(&mut self, page: &CrawledPage<'_>) -> StorageResult<()> {
        let content_hash = (!page.content.is_empty()).then(|| sha256_hex(page.content));
        let markdown = if page.save_markdown { page.content } else { "" };
        let metadata_json = serde_json::to_string(&page.metadata)?;
        let now = now_timestamp();

        self.conn.execute(
            "INSERT INTO crawled_pages (
               run_id, url, url_canonical, url_hash, content_hash, page_kind, status, title,
               cleaned_markdown, metadata_json, fetched_at, parsed_at, last_error
             )
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11, ?12)
             ON CONFLICT(url_canonical) DO UPDATE SET
               run_id = excluded.run_id,
               url = excluded.url,
               url_hash = excluded.url_hash,
               content_hash = excluded.content_hash,
               page_kind = excluded.page_kind,
               status = excluded.status,
               title = excluded.title,
               cleaned_markdown = excluded.cleaned_markdown,
               metadata_json = excluded.metadata_json,
               fetched_at = excluded.fetched_at,
               parsed_at = excluded.parsed_at,
               last_error = excluded.last_error",
            params![
                page.run_id,
                page.url,
                page.url_canonical,
                sha256_hex(page.url_canonical),
                content_hash,
                page.page_kind.to_db_string(),
                page.status.to_db_string(),
                page.title,
                markdown,
                metadata_json,
                now,
                page.error,
            ],
        )?;
        Ok(())
    }
}
