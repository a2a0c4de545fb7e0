//! Runs every transformer once, dimensions before the facts that reference them.

use crate::curated_store::NewErrorEntry;
use crate::entities::spec_for;
use crate::entity_kind::EntityKind;
use crate::metrics;
use crate::transform::{EntityTransformer, TransformContext, TransformSummary, Transformer};
use anyhow::{anyhow, Result};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{error, info, warn};

/// Result of one transformer within a pass.
#[derive(Debug, Clone, Serialize)]
pub struct EntityRunResult {
    pub kind: EntityKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<TransformSummary>,
    /// Set when the transformer could not run at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EntityRunResult {
    pub fn is_structural_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Per-kind counts in the shape downstream consumers read. A kind that
/// failed structurally has zero counts and carries its error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindCounts {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: String,
    pub entities: Vec<EntityRunResult>,
    pub total_attempted: usize,
    pub total_succeeded: usize,
    pub total_skipped: usize,
    pub total_failed: usize,
    pub total_elapsed_ms: u64,
}

impl RunReport {
    fn new() -> Self {
        Self {
            started_at: Utc::now().to_rfc3339(),
            entities: Vec::new(),
            total_attempted: 0,
            total_succeeded: 0,
            total_skipped: 0,
            total_failed: 0,
            total_elapsed_ms: 0,
        }
    }

    fn push(&mut self, result: EntityRunResult) {
        if let Some(summary) = &result.summary {
            self.total_attempted += summary.attempted;
            self.total_succeeded += summary.succeeded;
            self.total_skipped += summary.skipped;
            self.total_failed += summary.failed;
        }
        self.entities.push(result);
    }

    pub fn structural_failures(&self) -> impl Iterator<Item = &EntityRunResult> {
        self.entities.iter().filter(|r| r.is_structural_failure())
    }

    /// `{entity_kind: {succeeded, skipped, failed, elapsed_ms[, error]}}`, one
    /// entry per kind in the pass.
    pub fn by_kind(&self) -> BTreeMap<EntityKind, KindCounts> {
        self.entities
            .iter()
            .map(|r| {
                let counts = match &r.summary {
                    Some(s) => KindCounts {
                        succeeded: s.succeeded,
                        skipped: s.skipped,
                        failed: s.failed,
                        elapsed_ms: s.elapsed_ms,
                        error: None,
                    },
                    None => KindCounts {
                        succeeded: 0,
                        skipped: 0,
                        failed: 0,
                        elapsed_ms: 0,
                        error: r.error.clone(),
                    },
                };
                (r.kind, counts)
            })
            .collect()
    }
}

pub struct Orchestrator {
    ctx: TransformContext,
    transformers: Vec<Box<dyn Transformer>>,
}

impl Orchestrator {
    /// One spec-driven transformer per kind, in dependency order.
    pub fn new(ctx: TransformContext) -> Self {
        let transformers = EntityKind::DEPENDENCY_ORDER
            .iter()
            .map(|kind| Box::new(EntityTransformer::new(spec_for(*kind))) as Box<dyn Transformer>)
            .collect();
        Self::with_transformers(ctx, transformers)
    }

    /// Transformers run in the order given.
    pub fn with_transformers(ctx: TransformContext, transformers: Vec<Box<dyn Transformer>>) -> Self {
        for transformer in &transformers {
            info!(
                "Registered transformer {}: {}",
                transformer.kind(),
                transformer.description()
            );
        }
        Self { ctx, transformers }
    }

    pub fn kinds(&self) -> Vec<EntityKind> {
        self.transformers.iter().map(|t| t.kind()).collect()
    }

    /// Runs every transformer once. Structural failures are reported and the
    /// pass moves on to the next kind.
    pub fn run_full_pass(&self) -> RunReport {
        let started = Instant::now();
        let mut report = RunReport::new();
        info!("Starting full pass over {} entity kinds", self.transformers.len());

        for transformer in &self.transformers {
            report.push(self.run_transformer(transformer.as_ref()));
        }

        report.total_elapsed_ms = started.elapsed().as_millis() as u64;
        let failures = report.structural_failures().count();
        if failures > 0 {
            warn!(
                "Full pass finished with {} structural failure(s) in {}ms",
                failures, report.total_elapsed_ms
            );
        } else {
            info!(
                "Full pass finished in {}ms: {} attempted, {} succeeded, {} skipped, {} failed",
                report.total_elapsed_ms,
                report.total_attempted,
                report.total_succeeded,
                report.total_skipped,
                report.total_failed
            );
        }
        report
    }

    /// Runs a single kind's transformer. A structural failure is logged like
    /// in a full pass and then returned.
    pub fn run_kind(&self, kind: EntityKind) -> Result<TransformSummary> {
        let transformer = self
            .transformers
            .iter()
            .find(|t| t.kind() == kind)
            .ok_or_else(|| anyhow!("No transformer registered for {}", kind))?;
        let result = self.run_transformer(transformer.as_ref());
        match (result.summary, result.error) {
            (Some(summary), _) => Ok(summary),
            (None, Some(message)) => Err(anyhow!(message)),
            (None, None) => Err(anyhow!("{} produced no result", kind)),
        }
    }

    fn run_transformer(&self, transformer: &dyn Transformer) -> EntityRunResult {
        let kind = transformer.kind();
        let result = match transformer.run(&self.ctx) {
            Ok(summary) => {
                info!(
                    "{}: {} attempted, {} succeeded ({} new, {} updated, {} unchanged), {} skipped, {} failed in {}ms",
                    kind,
                    summary.attempted,
                    summary.succeeded,
                    summary.inserted,
                    summary.updated,
                    summary.unchanged,
                    summary.skipped,
                    summary.failed,
                    summary.elapsed_ms
                );
                EntityRunResult {
                    kind,
                    summary: Some(summary),
                    error: None,
                }
            }
            Err(e) => {
                let message = format!("{:#}", e);
                error!("Transformer {} failed: {}", kind, message);
                metrics::record_structural_failure(kind);
                self.ctx
                    .error_log
                    .record(NewErrorEntry::structural(kind, message.clone()));
                EntityRunResult {
                    kind,
                    summary: None,
                    error: Some(message),
                }
            }
        };

        match self.ctx.curated_store.count_rows(kind) {
            Ok(count) => metrics::set_curated_rows(kind, count),
            Err(e) => warn!("Failed to count curated {} rows: {:#}", kind, e),
        }
        result
    }
}
