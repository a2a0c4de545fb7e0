//! Year-by-year comparison of external ids across the raw and curated layers,
//! optionally against the exported JSON snapshots the raw layer was fed from.

use crate::curated_store::CuratedStore;
use crate::entities::spec_for;
use crate::entity_kind::EntityKind;
use crate::load::read_data_file;
use crate::mapping::first_text;
use crate::raw_store::RawRecordStore;
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearReconciliation {
    pub raw_count: usize,
    pub curated_count: usize,
    pub raw_minus_curated: Vec<String>,
    pub curated_minus_raw: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_minus_raw: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_minus_json: Option<Vec<String>>,
}

impl YearReconciliation {
    pub fn is_consistent(&self) -> bool {
        self.raw_minus_curated.is_empty()
            && self.curated_minus_raw.is_empty()
            && self.json_minus_raw.as_ref().map_or(true, Vec::is_empty)
            && self.raw_minus_json.as_ref().map_or(true, Vec::is_empty)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub kind: EntityKind,
    /// Keyed by year.
    pub years: BTreeMap<String, YearReconciliation>,
}

pub struct Reconciler {
    raw_store: Arc<dyn RawRecordStore>,
    curated_store: Arc<dyn CuratedStore>,
    sample_size: usize,
    json_dir: Option<PathBuf>,
}

impl Reconciler {
    pub fn new(
        raw_store: Arc<dyn RawRecordStore>,
        curated_store: Arc<dyn CuratedStore>,
        sample_size: usize,
    ) -> Self {
        Self {
            raw_store,
            curated_store,
            sample_size,
            json_dir: None,
        }
    }

    /// Also compare against `<dir>/<stem>_<year>.json` snapshot files.
    pub fn with_json_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.json_dir = Some(dir.into());
        self
    }

    pub fn reconcile(&self, kind: EntityKind, years: &[i32]) -> Result<ReconcileReport> {
        let spec = spec_for(kind);
        let date = spec
            .reconcile_date
            .ok_or_else(|| anyhow!("{} has no date to reconcile by", kind))?;

        let mut report = ReconcileReport {
            kind,
            years: BTreeMap::new(),
        };
        for &year in years {
            let raw = self
                .raw_store
                .external_ids_for_year(kind, date.raw_key, year)
                .with_context(|| format!("Failed to read raw {} ids for {}", kind, year))?;
            let curated = self
                .curated_store
                .external_ids_for_year(kind, date.column, year)
                .with_context(|| format!("Failed to read curated {} ids for {}", kind, year))?;

            let mut entry = YearReconciliation {
                raw_count: raw.len(),
                curated_count: curated.len(),
                raw_minus_curated: self.sample(raw.difference(&curated)),
                curated_minus_raw: self.sample(curated.difference(&raw)),
                json_count: None,
                json_minus_raw: None,
                raw_minus_json: None,
            };
            if let Some(dir) = &self.json_dir {
                let json = snapshot_ids(&snapshot_path(dir, kind, year), kind)?;
                entry.json_count = Some(json.len());
                entry.json_minus_raw = Some(self.sample(json.difference(&raw)));
                entry.raw_minus_json = Some(self.sample(raw.difference(&json)));
            }

            info!(
                "Reconcile {} {}: raw={} curated={}{}",
                kind,
                year,
                entry.raw_count,
                entry.curated_count,
                entry
                    .json_count
                    .map(|n| format!(" json={}", n))
                    .unwrap_or_default()
            );
            report.years.insert(year.to_string(), entry);
        }
        Ok(report)
    }

    fn sample<'a>(&self, ids: impl Iterator<Item = &'a String>) -> Vec<String> {
        ids.take(self.sample_size).cloned().collect()
    }
}

fn snapshot_path(dir: &Path, kind: EntityKind, year: i32) -> PathBuf {
    let stem = match kind {
        EntityKind::SetlistEntry => "setlists",
        EntityKind::JamAnnotation => "jamcharts",
        other => spec_for(other).table,
    };
    dir.join(format!("{}_{}.json", stem, year))
}

fn snapshot_ids(path: &Path, kind: EntityKind) -> Result<BTreeSet<String>> {
    let keys = spec_for(kind).identity.keys();
    let ids = read_data_file(path)?
        .iter()
        .filter_map(|item| item.as_object())
        .filter_map(|map| first_text(map, keys))
        .collect();
    Ok(ids)
}
