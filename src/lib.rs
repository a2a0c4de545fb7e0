//! Setlist Curator Library
//!
//! Turns raw upstream API payloads into typed, deduplicated, cross-referenced
//! curated tables. The binary is a thin CLI over these modules.

pub mod coerce;
pub mod config;
pub mod curated_store;
pub mod entities;
pub mod entity_kind;
pub mod load;
pub mod mapping;
pub mod metrics;
pub mod orchestrator;
pub mod raw_store;
pub mod reconcile;
pub mod resolver;
pub mod sqlite_persistence;
pub mod transform;
pub mod upsert;

// Re-export commonly used types for convenience
pub use curated_store::{CuratedStore, ErrorLog, SqliteCuratedStore};
pub use entity_kind::EntityKind;
pub use orchestrator::{Orchestrator, RunReport};
pub use raw_store::{RawRecordStore, SqliteRawStore};
pub use transform::{TransformContext, TransformSettings, TransformSummary};
