use crate::entity_kind::EntityKind;
use crate::upsert::UpsertOutcome;
use serde::Serialize;

/// What happened to one raw record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    Committed(UpsertOutcome),
    /// A required reference didn't resolve; retried on a later pass.
    Skipped,
    Failed,
}

impl RowOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowOutcome::Committed(outcome) => outcome.as_str(),
            RowOutcome::Skipped => "skipped",
            RowOutcome::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformSummary {
    pub kind: EntityKind,
    pub attempted: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub elapsed_ms: u64,
}

impl TransformSummary {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            attempted: 0,
            succeeded: 0,
            skipped: 0,
            failed: 0,
            inserted: 0,
            updated: 0,
            unchanged: 0,
            elapsed_ms: 0,
        }
    }

    pub fn record(&mut self, outcome: &RowOutcome) {
        self.attempted += 1;
        match outcome {
            RowOutcome::Committed(upsert) => {
                self.succeeded += 1;
                match upsert {
                    UpsertOutcome::Inserted(_) => self.inserted += 1,
                    UpsertOutcome::Updated(_) => self.updated += 1,
                    UpsertOutcome::Unchanged(_) => self.unchanged += 1,
                }
            }
            RowOutcome::Skipped => self.skipped += 1,
            RowOutcome::Failed => self.failed += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_add_up() {
        let mut summary = TransformSummary::new(EntityKind::Song);
        for outcome in [
            RowOutcome::Committed(UpsertOutcome::Inserted(1)),
            RowOutcome::Committed(UpsertOutcome::Unchanged(1)),
            RowOutcome::Committed(UpsertOutcome::Updated(2)),
            RowOutcome::Skipped,
            RowOutcome::Failed,
        ] {
            summary.record(&outcome);
        }
        assert_eq!(summary.attempted, 5);
        assert_eq!(summary.succeeded, 3);
        assert_eq!(
            summary.inserted + summary.updated + summary.unchanged,
            summary.succeeded
        );
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
    }
}
