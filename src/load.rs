//! Development loader that appends exported API snapshots to the raw store.

use crate::entities::spec_for;
use crate::entity_kind::EntityKind;
use crate::mapping::first_text;
use crate::raw_store::{NewRawRecord, RawRecordStore};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub read: usize,
    pub loaded: usize,
    pub without_external_id: usize,
}

/// Reads the `data` array of a `{"data": [...]}` file. A leading UTF-8 BOM is ignored.
pub fn read_data_file(path: &Path) -> Result<Vec<Value>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
    let document: Value = serde_json::from_str(text)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;
    match document {
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            _ => bail!(
                "Unexpected JSON structure in {}: expected an object with a 'data' array",
                path.display()
            ),
        },
        _ => bail!(
            "Unexpected JSON structure in {}: expected an object with a 'data' array",
            path.display()
        ),
    }
}

/// Appends every element of `path` as an unprocessed raw record of `kind`.
pub fn load_file(store: &dyn RawRecordStore, kind: EntityKind, path: &Path) -> Result<LoadSummary> {
    let items = read_data_file(path)?;
    let keys = spec_for(kind).identity.keys();
    let mut summary = LoadSummary {
        read: items.len(),
        ..Default::default()
    };

    for payload in items {
        let external_id = payload.as_object().and_then(|map| first_text(map, keys));
        let mut record = NewRawRecord::new(kind, payload);
        match external_id {
            Some(id) => record = record.with_external_id(id),
            None => summary.without_external_id += 1,
        }
        store
            .insert_raw_record(&record)
            .with_context(|| format!("Failed to store {} record from {}", kind, path.display()))?;
        summary.loaded += 1;
    }

    if summary.without_external_id > 0 {
        warn!(
            "{} of {} {} records in {} carry no external id",
            summary.without_external_id,
            summary.read,
            kind,
            path.display()
        );
    }
    info!("Loaded {} {} records from {}", summary.loaded, kind, path.display());
    Ok(summary)
}
