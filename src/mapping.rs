//! Declarative description of how a raw payload becomes a curated row.

use crate::coerce::{Coercion, FieldValue};
use crate::entity_kind::EntityKind;
use crate::transform::TransformError;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Per-entity extension point, run after coercion and resolution.
pub type RowHook = fn(&Map<String, Value>, &mut CuratedRecord) -> Result<(), TransformError>;

/// How a curated row is identified across runs.
#[derive(Debug, Clone, Copy)]
pub enum Identity {
    /// Upstream id under one of `keys`; rows without one are rejected.
    ExternalId { keys: &'static [&'static str] },
    /// Upstream id if present, otherwise the natural key `columns`, all of
    /// which must be non-null.
    ExternalIdOrNaturalKey {
        keys: &'static [&'static str],
        columns: &'static [&'static str],
    },
}

impl Identity {
    pub fn keys(&self) -> &'static [&'static str] {
        match self {
            Identity::ExternalId { keys } => keys,
            Identity::ExternalIdOrNaturalKey { keys, .. } => keys,
        }
    }

    pub fn natural_key(&self) -> Option<&'static [&'static str]> {
        match self {
            Identity::ExternalId { .. } => None,
            Identity::ExternalIdOrNaturalKey { columns, .. } => Some(columns),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub column: &'static str,
    /// Payload keys tried in order; the first non-null value wins.
    pub keys: &'static [&'static str],
    pub coercion: Coercion,
}

#[derive(Debug, Clone, Copy)]
pub struct ReferenceSpec {
    pub column: &'static str,
    pub target: EntityKind,
    /// Payload keys holding the target's upstream id.
    pub id_keys: &'static [&'static str],
    /// Payload keys holding the value matched against the target's fallback
    /// column. Only consulted when the payload carries no upstream id.
    pub fallback_keys: &'static [&'static str],
    pub required: bool,
}

/// Second resolution tier offered by a referenced kind, matched with
/// `column = ? COLLATE NOCASE`.
#[derive(Debug, Clone, Copy)]
pub struct FallbackSpec {
    pub column: &'static str,
    pub coercion: Coercion,
}

/// Date used to bucket rows by year when reconciling layers.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileDate {
    pub raw_key: &'static str,
    pub column: &'static str,
}

pub struct EntitySpec {
    pub kind: EntityKind,
    pub table: &'static str,
    pub description: &'static str,
    pub identity: Identity,
    pub fields: &'static [FieldSpec],
    pub references: &'static [ReferenceSpec],
    pub fallback: Option<FallbackSpec>,
    pub hook: Option<RowHook>,
    pub reconcile_date: Option<ReconcileDate>,
}

impl EntitySpec {
    /// Business and reference columns, in declaration order.
    pub fn value_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields
            .iter()
            .map(|f| f.column)
            .chain(self.references.iter().map(|r| r.column))
    }

    pub fn declares_column(&self, column: &str) -> bool {
        self.value_columns().any(|c| c == column)
    }
}

impl std::fmt::Debug for EntitySpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitySpec")
            .field("kind", &self.kind)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

/// First non-null value among `keys`.
pub fn first_value<'a>(payload: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| payload.get(*key))
        .find(|value| !value.is_null())
}

/// First of `keys` that coerces to non-empty text.
pub fn first_text(payload: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| payload.get(*key))
        .find_map(crate::coerce::coerce_text)
}

/// A curated row before it is written.
#[derive(Debug, Clone, PartialEq)]
pub struct CuratedRecord {
    pub kind: EntityKind,
    pub external_id: Option<String>,
    values: BTreeMap<&'static str, FieldValue>,
    pub source_raw_id: i64,
    pub source_received_at: i64,
}

impl CuratedRecord {
    pub fn new(kind: EntityKind, source_raw_id: i64, source_received_at: i64) -> Self {
        Self {
            kind,
            external_id: None,
            values: BTreeMap::new(),
            source_raw_id,
            source_received_at,
        }
    }

    pub fn set(&mut self, column: &'static str, value: impl Into<FieldValue>) {
        self.values.insert(column, value.into());
    }

    pub fn get(&self, column: &str) -> &FieldValue {
        self.values.get(column).unwrap_or(&FieldValue::Null)
    }

    pub fn values(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    /// Digest of the business content, independent of where it came from.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.kind.as_str().as_bytes());
        hasher.update(b"\n");
        hasher.update(self.external_id.as_deref().unwrap_or("").as_bytes());
        hasher.update(b"\n");
        for (column, value) in &self.values {
            hasher.update(column.as_bytes());
            hasher.update(b"=");
            hasher.update(value.canonical().as_bytes());
            hasher.update(b"\n");
        }
        format!("sha256:{:x}", hasher.finalize())
    }
}
