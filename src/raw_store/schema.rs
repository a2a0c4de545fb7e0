//! SQLite schema for the raw layer.
//!
//! A single append-only table holds the payloads of every entity kind. The
//! engine only ever flips `is_processed` and stamps `processed_at`.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP_MS};

const RAW_RECORDS_TABLE_V0: Table = Table {
    name: "raw_records",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("entity_kind", &SqlType::Text, non_null = true),
        sqlite_column!("external_id", &SqlType::Text),
        sqlite_column!("payload", &SqlType::Text, non_null = true), // JSON
        sqlite_column!(
            "is_processed",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "received_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP_MS)
        ),
        sqlite_column!("processed_at", &SqlType::Integer),
    ],
    indices: &[
        (
            "idx_raw_records_pending",
            "entity_kind, is_processed, received_at, id",
        ),
        ("idx_raw_records_external_id", "entity_kind, external_id"),
    ],
    unique_constraints: &[],
    partial_unique_indices: &[],
};

pub const RAW_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[RAW_RECORDS_TABLE_V0],
    migration: None,
}];
