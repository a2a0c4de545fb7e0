//! Raw-to-curated transformation of a single entity kind.

mod summary;
mod transformer;

pub use summary::{RowOutcome, TransformSummary};
pub use transformer::EntityTransformer;

use crate::curated_store::{CuratedStore, ErrorCategory, ErrorLog};
use crate::entity_kind::EntityKind;
use crate::raw_store::RawRecordStore;
use anyhow::Result;
use std::sync::Arc;
use thiserror::Error;

/// Why a single raw record could not be turned into a curated row.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Payload is not a JSON object (got {0})")]
    InvalidPayload(&'static str),

    #[error("Record has no identity: no value under [{keys}] and no complete natural key")]
    MissingIdentity { keys: String },

    #[error("Required {target} reference {column} not found ({detail})")]
    MissingReference {
        column: &'static str,
        target: EntityKind,
        detail: String,
    },

    #[error("Rejected {column}: {reason}")]
    Rejected { column: &'static str, reason: String },

    #[error("Store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl TransformError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            TransformError::MissingReference { .. } => ErrorCategory::MissingReference,
            _ => ErrorCategory::RowFailure,
        }
    }
}

/// Batch and parallelism limits for one transformer run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformSettings {
    pub batch_size: usize,
    pub max_batches_per_kind: usize,
    /// Rayon threads per run; 1 processes rows sequentially.
    pub workers: usize,
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            batch_size: 250,
            max_batches_per_kind: 4,
            workers: 4,
        }
    }
}

/// Shared resources handed to transformers.
#[derive(Clone)]
pub struct TransformContext {
    pub raw_store: Arc<dyn RawRecordStore>,
    pub curated_store: Arc<dyn CuratedStore>,
    pub error_log: Arc<dyn ErrorLog>,
    pub settings: TransformSettings,
}

impl TransformContext {
    pub fn new(
        raw_store: Arc<dyn RawRecordStore>,
        curated_store: Arc<dyn CuratedStore>,
        error_log: Arc<dyn ErrorLog>,
        settings: TransformSettings,
    ) -> Self {
        Self {
            raw_store,
            curated_store,
            error_log,
            settings,
        }
    }
}

/// A unit of work the orchestrator can run.
pub trait Transformer: Send + Sync {
    fn kind(&self) -> EntityKind;

    fn description(&self) -> &'static str;

    /// Processes up to `max_batches_per_kind` batches of unprocessed records.
    ///
    /// Row-level problems are counted in the summary and written to the
    /// error log. An `Err` means the transformer as a whole could not run.
    fn run(&self, ctx: &TransformContext) -> Result<TransformSummary>;
}
