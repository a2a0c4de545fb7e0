//! Append-only log of transformation failures.

use super::SqliteCuratedStore;
use crate::entity_kind::EntityKind;
use anyhow::Result;
use rusqlite::params;
use serde::Serialize;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The row could not be validated, coerced or written.
    RowFailure,
    /// A required reference did not resolve; the row stays unprocessed.
    MissingReference,
    /// A whole transformer failed.
    Structural,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::RowFailure => "row_failure",
            ErrorCategory::MissingReference => "missing_reference",
            ErrorCategory::Structural => "structural",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "row_failure" => Some(ErrorCategory::RowFailure),
            "missing_reference" => Some(ErrorCategory::MissingReference),
            "structural" => Some(ErrorCategory::Structural),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewErrorEntry {
    pub entity_kind: EntityKind,
    pub raw_record_id: Option<i64>,
    pub category: ErrorCategory,
    pub error_message: String,
    pub payload_snapshot: Option<serde_json::Value>,
}

impl NewErrorEntry {
    pub fn for_row(
        entity_kind: EntityKind,
        raw_record_id: i64,
        category: ErrorCategory,
        error_message: impl Into<String>,
        payload: &serde_json::Value,
    ) -> Self {
        Self {
            entity_kind,
            raw_record_id: Some(raw_record_id),
            category,
            error_message: error_message.into(),
            payload_snapshot: Some(payload.clone()),
        }
    }

    pub fn structural(entity_kind: EntityKind, error_message: impl Into<String>) -> Self {
        Self {
            entity_kind,
            raw_record_id: None,
            category: ErrorCategory::Structural,
            error_message: error_message.into(),
            payload_snapshot: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEntry {
    pub id: i64,
    pub entity_kind: String,
    pub raw_record_id: Option<i64>,
    pub category: String,
    pub error_message: String,
    pub payload_snapshot: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorSummary {
    pub entity_kind: String,
    pub error_count: usize,
    pub last_error_at: i64,
    /// Newest first.
    pub sample_messages: Vec<String>,
}

#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
pub trait ErrorLog: Send + Sync {
    fn append(&self, entry: &NewErrorEntry) -> Result<()>;

    /// Like [`ErrorLog::append`] but never fails; a failed write is only traced.
    fn record(&self, entry: NewErrorEntry) {
        if let Err(e) = self.append(&entry) {
            error!(
                "Failed to record {} error for {} (raw record {:?}): {:#}",
                entry.category.as_str(),
                entry.entity_kind,
                entry.raw_record_id,
                e
            );
        }
    }

    /// One line per entity kind that has errors, ordered by kind.
    fn error_summary(&self, sample_size: usize) -> Result<Vec<ErrorSummary>>;

    fn recent_errors(&self, kind: Option<EntityKind>, limit: usize) -> Result<Vec<ErrorEntry>>;

    fn count_errors(&self, kind: EntityKind, category: Option<ErrorCategory>) -> Result<usize>;
}

impl ErrorLog for SqliteCuratedStore {
    fn append(&self, entry: &NewErrorEntry) -> Result<()> {
        let snapshot = entry
            .payload_snapshot
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO error_log (entity_kind, raw_record_id, category, error_message, payload_snapshot, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.entity_kind.as_str(),
                entry.raw_record_id,
                entry.category.as_str(),
                entry.error_message,
                snapshot,
                chrono::Utc::now().timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    fn error_summary(&self, sample_size: usize) -> Result<Vec<ErrorSummary>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT entity_kind, COUNT(*), MAX(created_at) FROM error_log
             GROUP BY entity_kind ORDER BY entity_kind",
        )?;
        let groups: Vec<(String, i64, i64)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<rusqlite::Result<_>>()?;

        let mut samples_stmt = conn.prepare(
            "SELECT error_message FROM error_log WHERE entity_kind = ?1
             ORDER BY created_at DESC, id DESC LIMIT ?2",
        )?;
        let mut summaries = Vec::with_capacity(groups.len());
        for (entity_kind, count, last_error_at) in groups {
            let sample_messages = samples_stmt
                .query_map(params![entity_kind, sample_size as i64], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            summaries.push(ErrorSummary {
                entity_kind,
                error_count: count as usize,
                last_error_at,
                sample_messages,
            });
        }
        Ok(summaries)
    }

    fn recent_errors(&self, kind: Option<EntityKind>, limit: usize) -> Result<Vec<ErrorEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM error_log WHERE ?1 IS NULL OR entity_kind = ?1
             ORDER BY created_at DESC, id DESC LIMIT ?2",
        )?;
        let entries = stmt
            .query_map(
                params![kind.map(|k| k.as_str()), limit as i64],
                |row| {
                    Ok(ErrorEntry {
                        id: row.get("id")?,
                        entity_kind: row.get("entity_kind")?,
                        raw_record_id: row.get("raw_record_id")?,
                        category: row.get("category")?,
                        error_message: row.get("error_message")?,
                        payload_snapshot: row.get("payload_snapshot")?,
                        created_at: row.get("created_at")?,
                    })
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    fn count_errors(&self, kind: EntityKind, category: Option<ErrorCategory>) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM error_log WHERE entity_kind = ?1 AND (?2 IS NULL OR category = ?2)",
            params![kind.as_str(), category.map(|c| c.as_str())],
            |r| r.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn summary_groups_by_kind_with_newest_samples() {
        let store = SqliteCuratedStore::in_memory().unwrap();
        for i in 0..5 {
            store.record(NewErrorEntry::for_row(
                EntityKind::SetlistEntry,
                i,
                ErrorCategory::RowFailure,
                format!("bad row {}", i),
                &json!({ "uniqueid": i }),
            ));
        }
        store.record(NewErrorEntry::structural(EntityKind::Venue, "venues exploded"));

        let summary = store.error_summary(3).unwrap();
        assert_eq!(summary.len(), 2);

        let setlists = &summary[0];
        assert_eq!(setlists.entity_kind, "setlist_entry");
        assert_eq!(setlists.error_count, 5);
        assert_eq!(
            setlists.sample_messages,
            vec!["bad row 4", "bad row 3", "bad row 2"]
        );

        assert_eq!(summary[1].entity_kind, "venue");
        assert_eq!(summary[1].error_count, 1);
    }

    #[test]
    fn recent_errors_keep_payload_snapshot() {
        let store = SqliteCuratedStore::in_memory().unwrap();
        store.record(NewErrorEntry::for_row(
            EntityKind::Show,
            12,
            ErrorCategory::MissingReference,
            "venue not found",
            &json!({ "showid": "1", "venueid": "404" }),
        ));
        store.record(NewErrorEntry::structural(EntityKind::Song, "boom"));

        let shows = store.recent_errors(Some(EntityKind::Show), 10).unwrap();
        assert_eq!(shows.len(), 1);
        assert_eq!(shows[0].raw_record_id, Some(12));
        assert_eq!(shows[0].category, "missing_reference");
        let snapshot: serde_json::Value =
            serde_json::from_str(shows[0].payload_snapshot.as_deref().unwrap()).unwrap();
        assert_eq!(snapshot["venueid"], "404");

        let all = store.recent_errors(None, 10).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].raw_record_id, None);

        assert_eq!(
            store
                .count_errors(EntityKind::Show, Some(ErrorCategory::MissingReference))
                .unwrap(),
            1
        );
        assert_eq!(
            store
                .count_errors(EntityKind::Show, Some(ErrorCategory::RowFailure))
                .unwrap(),
            0
        );
    }

    #[test]
    fn category_names_round_trip() {
        for category in [
            ErrorCategory::RowFailure,
            ErrorCategory::MissingReference,
            ErrorCategory::Structural,
        ] {
            assert_eq!(ErrorCategory::parse(category.as_str()), Some(category));
        }
    }
}
