//! Raw layer accessor.
//!
//! The ingestion side appends records; the engine reads unprocessed ones in
//! receipt order and flips their processed flag after a successful upsert.

mod models;
mod schema;
mod store;

pub use models::{NewRawRecord, RawCursor, RawRecord, RawRecordState};
pub use schema::RAW_VERSIONED_SCHEMAS;
pub use store::SqliteRawStore;

use crate::entity_kind::EntityKind;
use anyhow::Result;
use std::collections::BTreeSet;

#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
pub trait RawRecordStore: Send + Sync {
    /// Unprocessed records of `kind`, oldest first, strictly after `after`.
    fn list_unprocessed(
        &self,
        kind: EntityKind,
        limit: usize,
        after: Option<RawCursor>,
    ) -> Result<Vec<RawRecord>>;

    /// Flip the processed flag. Returns false if the record was already processed.
    fn mark_processed(&self, id: i64) -> Result<bool>;

    fn get_raw_record(&self, id: i64) -> Result<Option<RawRecord>>;

    fn count_unprocessed(&self, kind: EntityKind) -> Result<usize>;

    /// Distinct external ids of `kind` whose payload `date_key` falls in `year`.
    fn external_ids_for_year(
        &self,
        kind: EntityKind,
        date_key: &str,
        year: i32,
    ) -> Result<BTreeSet<String>>;

    /// Write side owned by the ingestion collaborator. The engine never calls it.
    fn insert_raw_record(&self, record: &NewRawRecord) -> Result<i64>;
}
