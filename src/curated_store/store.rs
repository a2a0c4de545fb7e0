//! SQLite-backed curated store.

use super::schema::CURATED_VERSIONED_SCHEMAS;
use super::CuratedStore;
use crate::coerce::FieldValue;
use crate::entities::spec_for;
use crate::entity_kind::EntityKind;
use crate::mapping::{CuratedRecord, FallbackSpec};
use crate::sqlite_persistence::open_versioned;
use crate::upsert::{UpsertOutcome, UpsertStatement};
use anyhow::{Context, Result};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

pub struct SqliteCuratedStore {
    pub(super) conn: Arc<Mutex<Connection>>,
}

impl SqliteCuratedStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let mut conn = Connection::open(path)
            .with_context(|| format!("Failed to open curated database at {:?}", path))?;
        open_versioned(&mut conn, CURATED_VERSIONED_SCHEMAS, "curated")?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("Failed to set WAL mode on curated database")?;
        conn.execute("PRAGMA foreign_keys = ON;", [])?;
        info!("Curated store ready at {:?}", path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        open_versioned(&mut conn, CURATED_VERSIONED_SCHEMAS, "curated")?;
        conn.execute("PRAGMA foreign_keys = ON;", [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn value_ref_to_json(value: ValueRef) -> Value {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::from(i),
            ValueRef::Real(f) => Value::from(f),
            ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::String(format!("<{} bytes>", b.len())),
        }
    }
}

impl CuratedStore for SqliteCuratedStore {
    fn find_by_external_id(&self, kind: EntityKind, external_id: &str) -> Result<Option<i64>> {
        let table = spec_for(kind).table;
        let conn = self.conn.lock().unwrap();
        let id = conn
            .prepare_cached(&format!("SELECT id FROM {} WHERE external_id = ?1", table))?
            .query_row(params![external_id], |r| r.get(0))
            .optional()?;
        Ok(id)
    }

    fn find_by_fallback(
        &self,
        kind: EntityKind,
        fallback: &FallbackSpec,
        value: &FieldValue,
    ) -> Result<Option<i64>> {
        let table = spec_for(kind).table;
        let sql = format!(
            "SELECT id FROM {table} WHERE {column} = ?1 COLLATE NOCASE
             ORDER BY updated_at DESC, id DESC LIMIT 1",
            column = fallback.column,
        );
        let conn = self.conn.lock().unwrap();
        let id = conn
            .prepare_cached(&sql)?
            .query_row(params![value], |r| r.get(0))
            .optional()?;
        Ok(id)
    }

    fn upsert(&self, statement: &UpsertStatement, record: &CuratedRecord) -> Result<UpsertOutcome> {
        let conn = self.conn.lock().unwrap();
        statement
            .execute(&conn, record)
            .with_context(|| format!("Failed to upsert into {}", statement.table()))
    }

    fn count_rows(&self, kind: EntityKind) -> Result<usize> {
        let table = spec_for(kind).table;
        let conn = self.conn.lock().unwrap();
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?;
        Ok(count as usize)
    }

    fn get_row(&self, kind: EntityKind, id: i64) -> Result<Option<Value>> {
        let table = spec_for(kind).table;
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!("SELECT * FROM {} WHERE id = ?1", table))?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let row = stmt
            .query_row(params![id], |row| {
                let mut object = Map::new();
                for (i, name) in names.iter().enumerate() {
                    object.insert(name.clone(), Self::value_ref_to_json(row.get_ref(i)?));
                }
                Ok(Value::Object(object))
            })
            .optional()?;
        Ok(row)
    }

    fn external_ids_for_year(
        &self,
        kind: EntityKind,
        date_column: &str,
        year: i32,
    ) -> Result<BTreeSet<String>> {
        let table = spec_for(kind).table;
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT DISTINCT external_id FROM {table}
             WHERE external_id IS NOT NULL AND substr({date_column}, 1, 4) = ?1"
        ))?;
        let ids = stmt
            .query_map(params![format!("{:04}", year)], |r| r.get::<_, String>(0))?
            .collect::<rusqlite::Result<BTreeSet<_>>>()?;
        Ok(ids)
    }
}
