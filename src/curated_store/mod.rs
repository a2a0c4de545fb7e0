//! Curated layer: one table per entity kind plus the error log.

mod error_log;
mod schema;
mod store;

pub use error_log::{ErrorCategory, ErrorEntry, ErrorLog, ErrorSummary, NewErrorEntry};
pub use schema::{CURATED_VERSIONED_SCHEMAS, NATURAL_KEY_PREDICATE};
pub use store::SqliteCuratedStore;

#[cfg(any(test, feature = "mock"))]
pub use error_log::MockErrorLog;

use crate::coerce::FieldValue;
use crate::entity_kind::EntityKind;
use crate::mapping::{CuratedRecord, FallbackSpec};
use crate::upsert::{UpsertOutcome, UpsertStatement};
use anyhow::Result;
use std::collections::BTreeSet;

#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
pub trait CuratedStore: Send + Sync {
    fn find_by_external_id(&self, kind: EntityKind, external_id: &str) -> Result<Option<i64>>;

    /// Most recently updated row of `kind` whose fallback column matches `value`.
    fn find_by_fallback(
        &self,
        kind: EntityKind,
        fallback: &FallbackSpec,
        value: &FieldValue,
    ) -> Result<Option<i64>>;

    fn upsert(&self, statement: &UpsertStatement, record: &CuratedRecord) -> Result<UpsertOutcome>;

    fn count_rows(&self, kind: EntityKind) -> Result<usize>;

    /// Full row as a JSON object keyed by column name.
    fn get_row(&self, kind: EntityKind, id: i64) -> Result<Option<serde_json::Value>>;

    fn external_ids_for_year(
        &self,
        kind: EntityKind,
        date_column: &str,
        year: i32,
    ) -> Result<BTreeSet<String>>;
}
