//! Identity-keyed, idempotent writes into the curated tables.
//!
//! One `INSERT .. ON CONFLICT .. DO UPDATE` per row. Incoming non-null values
//! replace stored ones and nulls never erase. The update only happens when the
//! incoming raw record is newer than the one that last wrote the row, or is
//! the same record carrying different content, so replaying unchanged input
//! leaves the row untouched.

use crate::coerce::FieldValue;
use crate::curated_store::{CuratedStore, NATURAL_KEY_PREDICATE};
use crate::entity_kind::EntityKind;
use crate::mapping::{CuratedRecord, EntitySpec, Identity};
use crate::transform::TransformError;
use anyhow::{bail, Result};
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "id", rename_all = "snake_case")]
pub enum UpsertOutcome {
    Inserted(i64),
    Updated(i64),
    Unchanged(i64),
}

impl UpsertOutcome {
    pub fn id(&self) -> i64 {
        match self {
            UpsertOutcome::Inserted(id)
            | UpsertOutcome::Updated(id)
            | UpsertOutcome::Unchanged(id) => *id,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UpsertOutcome::Inserted(_) => "inserted",
            UpsertOutcome::Updated(_) => "updated",
            UpsertOutcome::Unchanged(_) => "unchanged",
        }
    }
}

/// Prepared SQL for one entity kind.
#[derive(Debug, Clone)]
pub struct UpsertStatement {
    kind: EntityKind,
    table: &'static str,
    columns: Vec<&'static str>,
    natural_key: Option<&'static [&'static str]>,
    upsert_sql: String,
    existing_sql: String,
}

impl UpsertStatement {
    pub fn for_spec(spec: &EntitySpec) -> Self {
        let table = spec.table;
        let columns: Vec<&'static str> = spec.value_columns().collect();
        let natural_key = spec.identity.natural_key();

        let mut insert_columns = vec!["external_id"];
        insert_columns.extend(columns.iter().copied());
        insert_columns.extend([
            "source_raw_id",
            "source_received_at",
            "content_hash",
            "created_at",
            "updated_at",
            "processed_at",
        ]);
        let placeholders: Vec<String> = (1..=insert_columns.len())
            .map(|i| format!("?{}", i))
            .collect();

        let mut assignments: Vec<String> = std::iter::once("external_id")
            .chain(columns.iter().copied())
            .map(|c| format!("{c} = COALESCE(excluded.{c}, {table}.{c})"))
            .collect();
        assignments.extend([
            "source_raw_id = excluded.source_raw_id".to_string(),
            "source_received_at = excluded.source_received_at".to_string(),
            "content_hash = excluded.content_hash".to_string(),
            "updated_at = excluded.updated_at".to_string(),
            format!("processed_at = MAX(excluded.processed_at, {table}.processed_at + 1)"),
        ]);
        let do_update = format!(
            "DO UPDATE SET {} WHERE (excluded.source_received_at, excluded.source_raw_id) > ({table}.source_received_at, {table}.source_raw_id) \
             OR ((excluded.source_received_at, excluded.source_raw_id) = ({table}.source_received_at, {table}.source_raw_id) \
             AND excluded.content_hash <> {table}.content_hash)",
            assignments.join(", ")
        );

        let mut upsert_sql = format!(
            "INSERT INTO {table} ({}) VALUES ({}) ON CONFLICT(external_id) {do_update}",
            insert_columns.join(", "),
            placeholders.join(", "),
        );
        if let Some(key) = natural_key {
            upsert_sql.push_str(&format!(
                " ON CONFLICT({}) WHERE {NATURAL_KEY_PREDICATE} {do_update}",
                key.join(", ")
            ));
        }
        upsert_sql.push_str(" RETURNING id");

        let mut existing_sql = format!("SELECT id FROM {table} WHERE external_id = ?1");
        if let Some(key) = natural_key {
            let matches: Vec<String> = key
                .iter()
                .enumerate()
                .map(|(i, c)| format!("{} = ?{}", c, i + 2))
                .collect();
            existing_sql.push_str(&format!(
                " OR (?1 IS NULL AND {NATURAL_KEY_PREDICATE} AND {})",
                matches.join(" AND ")
            ));
        }
        existing_sql.push_str(" LIMIT 1");

        Self {
            kind: spec.kind,
            table,
            columns,
            natural_key,
            upsert_sql,
            existing_sql,
        }
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn sql(&self) -> &str {
        &self.upsert_sql
    }

    /// Runs the upsert on `conn`. The caller holds the connection lock, so
    /// the existence probe and the write are not interleaved with other writers.
    pub fn execute(&self, conn: &Connection, record: &CuratedRecord) -> Result<UpsertOutcome> {
        if record.kind != self.kind {
            bail!(
                "Cannot write a {} record with the {} upsert",
                record.kind,
                self.kind
            );
        }

        let mut probe: Vec<FieldValue> = vec![record.external_id.clone().into()];
        if let Some(key) = self.natural_key {
            probe.extend(key.iter().map(|c| record.get(c).clone()));
        }
        let existing: Option<i64> = conn
            .prepare_cached(&self.existing_sql)?
            .query_row(params_from_iter(probe.iter()), |r| r.get(0))
            .optional()?;

        let now = chrono::Utc::now().timestamp_millis();
        let mut values: Vec<FieldValue> = Vec::with_capacity(self.columns.len() + 7);
        values.push(record.external_id.clone().into());
        values.extend(self.columns.iter().map(|c| record.get(c).clone()));
        values.push(FieldValue::Int(record.source_raw_id));
        values.push(FieldValue::Int(record.source_received_at));
        values.push(FieldValue::Text(record.content_hash()));
        values.extend([FieldValue::Int(now), FieldValue::Int(now), FieldValue::Int(now)]);

        let written: Option<i64> = conn
            .prepare_cached(&self.upsert_sql)?
            .query_row(params_from_iter(values.iter()), |r| r.get(0))
            .optional()?;

        match (written, existing) {
            (Some(id), None) => Ok(UpsertOutcome::Inserted(id)),
            (Some(id), Some(_)) => Ok(UpsertOutcome::Updated(id)),
            (None, Some(id)) => Ok(UpsertOutcome::Unchanged(id)),
            (None, None) => bail!("Upsert into {} neither wrote nor found a row", self.table),
        }
    }
}

/// Checks row identity and hands the write to the curated store.
pub struct UpsertEngine {
    store: Arc<dyn CuratedStore>,
    statement: UpsertStatement,
    identity: Identity,
}

impl UpsertEngine {
    pub fn new(store: Arc<dyn CuratedStore>, spec: &EntitySpec) -> Self {
        Self {
            store,
            statement: UpsertStatement::for_spec(spec),
            identity: spec.identity,
        }
    }

    pub fn upsert(&self, record: &CuratedRecord) -> Result<UpsertOutcome, TransformError> {
        if record.external_id.is_none() {
            let identified = match self.identity.natural_key() {
                Some(columns) => columns.iter().all(|c| !record.get(c).is_null()),
                None => false,
            };
            if !identified {
                return Err(TransformError::MissingIdentity {
                    keys: self.identity.keys().join(", "),
                });
            }
        }
        Ok(self.store.upsert(&self.statement, record)?)
    }
}
