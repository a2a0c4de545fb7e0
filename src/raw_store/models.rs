use crate::entity_kind::EntityKind;
use serde::Serialize;

/// A payload captured verbatim from the upstream API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawRecord {
    pub id: i64,
    pub entity_kind: EntityKind,
    pub external_id: Option<String>,
    pub payload: serde_json::Value,
    pub is_processed: bool,
    /// Unix milliseconds.
    pub received_at: i64,
    /// Unix milliseconds, set when the record was last transformed successfully.
    pub processed_at: Option<i64>,
}

impl RawRecord {
    pub fn cursor(&self) -> RawCursor {
        RawCursor {
            received_at: self.received_at,
            id: self.id,
        }
    }

    /// Processing state of this record. There is no persisted in-flight state.
    pub fn state(&self) -> RawRecordState {
        if self.is_processed {
            RawRecordState::Processed
        } else {
            RawRecordState::Unprocessed
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RawRecordState {
    Unprocessed,
    Processed,
}

/// Position in receipt order, used to page through unprocessed records
/// without re-reading rows that were skipped earlier in the same pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RawCursor {
    pub received_at: i64,
    pub id: i64,
}

/// A record as written by the ingestion side.
#[derive(Debug, Clone)]
pub struct NewRawRecord {
    pub entity_kind: EntityKind,
    pub external_id: Option<String>,
    pub payload: serde_json::Value,
    /// Defaults to the current time when absent.
    pub received_at: Option<i64>,
}

impl NewRawRecord {
    pub fn new(entity_kind: EntityKind, payload: serde_json::Value) -> Self {
        Self {
            entity_kind,
            external_id: None,
            payload,
            received_at: None,
        }
    }

    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    pub fn received_at(mut self, millis: i64) -> Self {
        self.received_at = Some(millis);
        self
    }
}
