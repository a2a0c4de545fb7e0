//! SQLite-backed raw record store.

use super::models::{NewRawRecord, RawCursor, RawRecord};
use super::schema::RAW_VERSIONED_SCHEMAS;
use super::RawRecordStore;
use crate::entity_kind::EntityKind;
use crate::sqlite_persistence::open_versioned;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

pub struct SqliteRawStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRawStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let mut conn = Connection::open(path)
            .with_context(|| format!("Failed to open raw database at {:?}", path))?;
        open_versioned(&mut conn, RAW_VERSIONED_SCHEMAS, "raw")?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("Failed to set WAL mode on raw database")?;

        let pending: i64 = conn.query_row(
            "SELECT COUNT(*) FROM raw_records WHERE is_processed = 0",
            [],
            |r| r.get(0),
        )?;
        info!("Raw store ready at {:?}: {} unprocessed records", path, pending);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        open_versioned(&mut conn, RAW_VERSIONED_SCHEMAS, "raw")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<RawRecord> {
        let id: i64 = row.get("id")?;
        let kind_str: String = row.get("entity_kind")?;
        let entity_kind = EntityKind::parse(&kind_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Text,
                format!("unknown entity kind '{}'", kind_str).into(),
            )
        })?;

        // A payload that is not valid JSON is kept as a string so the
        // transformer can reject that single row instead of the whole batch.
        let payload_text: String = row.get("payload")?;
        let payload = serde_json::from_str(&payload_text).unwrap_or_else(|e| {
            warn!("Raw record {} holds malformed JSON: {}", id, e);
            serde_json::Value::String(payload_text)
        });

        Ok(RawRecord {
            id,
            entity_kind,
            external_id: row.get("external_id")?,
            payload,
            is_processed: row.get::<_, i32>("is_processed")? != 0,
            received_at: row.get("received_at")?,
            processed_at: row.get("processed_at")?,
        })
    }
}

impl RawRecordStore for SqliteRawStore {
    fn list_unprocessed(
        &self,
        kind: EntityKind,
        limit: usize,
        after: Option<RawCursor>,
    ) -> Result<Vec<RawRecord>> {
        let conn = self.conn.lock().unwrap();
        let (after_received, after_id) = after
            .map(|c| (c.received_at, c.id))
            .unwrap_or((i64::MIN, i64::MIN));
        let mut stmt = conn.prepare_cached(
            "SELECT * FROM raw_records
             WHERE entity_kind = ?1 AND is_processed = 0
               AND (received_at, id) > (?2, ?3)
             ORDER BY received_at ASC, id ASC
             LIMIT ?4",
        )?;
        let records = stmt
            .query_map(
                params![kind.as_str(), after_received, after_id, limit as i64],
                Self::row_to_record,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("Failed to list unprocessed {} records", kind))?;
        Ok(records)
    }

    fn mark_processed(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE raw_records SET is_processed = 1, processed_at = ?2
             WHERE id = ?1 AND is_processed = 0",
            params![id, chrono::Utc::now().timestamp_millis()],
        )?;
        Ok(changed > 0)
    }

    fn get_raw_record(&self, id: i64) -> Result<Option<RawRecord>> {
        let conn = self.conn.lock().unwrap();
        let record = conn
            .query_row(
                "SELECT * FROM raw_records WHERE id = ?1",
                params![id],
                Self::row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    fn count_unprocessed(&self, kind: EntityKind) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM raw_records WHERE entity_kind = ?1 AND is_processed = 0",
            params![kind.as_str()],
            |r| r.get(0),
        )?;
        Ok(count as usize)
    }

    fn external_ids_for_year(
        &self,
        kind: EntityKind,
        date_key: &str,
        year: i32,
    ) -> Result<BTreeSet<String>> {
        let conn = self.conn.lock().unwrap();
        let json_path = format!("$.{}", date_key);
        let mut stmt = conn.prepare_cached(
            "SELECT DISTINCT external_id FROM raw_records
             WHERE entity_kind = ?1 AND external_id IS NOT NULL
               AND substr(CASE WHEN json_valid(payload) THEN json_extract(payload, ?2) END, 1, 4) = ?3",
        )?;
        let ids = stmt
            .query_map(
                params![kind.as_str(), json_path, format!("{:04}", year)],
                |row| row.get::<_, String>(0),
            )?
            .collect::<rusqlite::Result<BTreeSet<_>>>()?;
        Ok(ids)
    }

    fn insert_raw_record(&self, record: &NewRawRecord) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let received_at = record
            .received_at
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());
        conn.execute(
            "INSERT INTO raw_records (entity_kind, external_id, payload, received_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.entity_kind.as_str(),
                record.external_id,
                serde_json::to_string(&record.payload)?,
                received_at,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }
}
