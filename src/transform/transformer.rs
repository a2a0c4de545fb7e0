use super::{RowOutcome, TransformContext, TransformError, TransformSummary, Transformer};
use crate::coerce::FieldValue;
use crate::curated_store::{ErrorCategory, NewErrorEntry};
use crate::entity_kind::EntityKind;
use crate::mapping::{first_text, first_value, CuratedRecord, EntitySpec};
use crate::metrics;
use crate::raw_store::{RawCursor, RawRecord};
use crate::resolver::{EntityResolver, Resolution};
use crate::upsert::UpsertEngine;
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Transformer driven entirely by an [`EntitySpec`].
pub struct EntityTransformer {
    spec: &'static EntitySpec,
}

impl EntityTransformer {
    pub fn new(spec: &'static EntitySpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &'static EntitySpec {
        self.spec
    }

    /// Payload to curated record: shape check, identity, field coercion,
    /// reference resolution and the per-entity hook, in that order.
    pub fn build_record(
        &self,
        raw: &RawRecord,
        resolver: &EntityResolver,
    ) -> Result<CuratedRecord, TransformError> {
        let payload = match &raw.payload {
            Value::Object(map) => map,
            other => return Err(TransformError::InvalidPayload(json_type_name(other))),
        };

        let mut record = CuratedRecord::new(self.spec.kind, raw.id, raw.received_at);
        record.external_id =
            first_text(payload, self.spec.identity.keys()).or_else(|| raw.external_id.clone());

        for field in self.spec.fields {
            let value = first_value(payload, field.keys)
                .map(|v| field.coercion.apply(v))
                .unwrap_or(FieldValue::Null);
            record.set(field.column, value);
        }

        for reference in self.spec.references {
            let resolution = resolver.resolve(reference, payload)?;
            match (resolution, reference.required) {
                (Resolution::Resolved(id), _) => record.set(reference.column, id),
                (Resolution::Unresolved, true) | (Resolution::Absent, true) => {
                    let detail = match resolution {
                        Resolution::Absent => "payload has no reference".to_string(),
                        _ => format!(
                            "id {:?}",
                            first_text(payload, reference.id_keys)
                                .or_else(|| first_text(payload, reference.fallback_keys))
                        ),
                    };
                    return Err(TransformError::MissingReference {
                        column: reference.column,
                        target: reference.target,
                        detail,
                    });
                }
                (Resolution::Unresolved, false) | (Resolution::Absent, false) => {
                    record.set(reference.column, FieldValue::Null)
                }
            }
        }

        if let Some(hook) = self.spec.hook {
            hook(payload, &mut record)?;
        }
        Ok(record)
    }

    fn process_row(
        &self,
        raw: &RawRecord,
        resolver: &EntityResolver,
        engine: &UpsertEngine,
        ctx: &TransformContext,
    ) -> RowOutcome {
        let kind = self.spec.kind;
        let result = self
            .build_record(raw, resolver)
            .and_then(|record| engine.upsert(&record));

        let outcome = match result {
            Ok(upsert) => match ctx.raw_store.mark_processed(raw.id) {
                Ok(_) => RowOutcome::Committed(upsert),
                Err(e) => {
                    // The row is written; leaving the raw record unprocessed
                    // only means it is replayed as a no-op next time.
                    warn!("Failed to mark {} raw record {} processed: {:#}", kind, raw.id, e);
                    ctx.error_log.record(NewErrorEntry::for_row(
                        kind,
                        raw.id,
                        ErrorCategory::RowFailure,
                        format!("Failed to mark processed: {:#}", e),
                        &raw.payload,
                    ));
                    RowOutcome::Failed
                }
            },
            Err(e) => {
                let category = e.category();
                if matches!(e, TransformError::MissingReference { .. }) {
                    debug!("Skipping {} raw record {}: {}", kind, raw.id, e);
                } else {
                    warn!("Failed to transform {} raw record {}: {}", kind, raw.id, e);
                }
                ctx.error_log.record(NewErrorEntry::for_row(
                    kind,
                    raw.id,
                    category,
                    e.to_string(),
                    &raw.payload,
                ));
                match e {
                    TransformError::MissingReference { .. } => RowOutcome::Skipped,
                    _ => RowOutcome::Failed,
                }
            }
        };
        metrics::record_row(kind, outcome.as_str());
        outcome
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl Transformer for EntityTransformer {
    fn kind(&self) -> EntityKind {
        self.spec.kind
    }

    fn description(&self) -> &'static str {
        self.spec.description
    }

    fn run(&self, ctx: &TransformContext) -> Result<TransformSummary> {
        let kind = self.spec.kind;
        let settings = ctx.settings;
        let started = Instant::now();
        let resolver = EntityResolver::new(ctx.curated_store.clone());
        let engine = UpsertEngine::new(ctx.curated_store.clone(), self.spec);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(settings.workers.max(1))
            .thread_name(move |i| format!("{}-worker-{}", kind, i))
            .build()
            .with_context(|| format!("Failed to build worker pool for {}", kind))?;

        let mut summary = TransformSummary::new(kind);
        let mut cursor: Option<RawCursor> = None;
        for batch_number in 1..=settings.max_batches_per_kind {
            let batch = ctx
                .raw_store
                .list_unprocessed(kind, settings.batch_size, cursor)
                .with_context(|| format!("Failed to read unprocessed {} records", kind))?;
            if batch.is_empty() {
                break;
            }
            cursor = batch.last().map(RawRecord::cursor);

            let outcomes: Vec<RowOutcome> = if settings.workers <= 1 {
                batch
                    .iter()
                    .map(|raw| self.process_row(raw, &resolver, &engine, ctx))
                    .collect()
            } else {
                pool.install(|| {
                    batch
                        .par_iter()
                        .map(|raw| self.process_row(raw, &resolver, &engine, ctx))
                        .collect()
                })
            };
            for outcome in &outcomes {
                summary.record(outcome);
            }
            info!(
                "{} batch {}: {} rows, {} committed so far",
                kind,
                batch_number,
                batch.len(),
                summary.succeeded
            );

            if batch.len() < settings.batch_size {
                break;
            }
        }

        let elapsed = started.elapsed();
        summary.elapsed_ms = elapsed.as_millis() as u64;
        metrics::record_transform_run(kind, elapsed);
        Ok(summary)
    }
}
