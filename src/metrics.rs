use crate::entity_kind::EntityKind;
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all curator metrics
const PREFIX: &str = "setlist_curator";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref ROWS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_rows_total"), "Raw records processed, by outcome"),
        &["entity_kind", "outcome"]
    ).expect("Failed to create rows_total metric");

    pub static ref TRANSFORM_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_transform_duration_seconds"),
            "Duration of one transformer run in seconds"
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0]),
        &["entity_kind"]
    ).expect("Failed to create transform_duration_seconds metric");

    pub static ref STRUCTURAL_FAILURES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            format!("{PREFIX}_structural_failures_total"),
            "Transformer runs that failed as a whole"
        ),
        &["entity_kind"]
    ).expect("Failed to create structural_failures_total metric");

    pub static ref CURATED_ROWS: GaugeVec = GaugeVec::new(
        Opts::new(format!("{PREFIX}_curated_rows"), "Rows currently in each curated table"),
        &["entity_kind"]
    ).expect("Failed to create curated_rows metric");
}

/// Register all metrics with the registry. Safe to call more than once.
pub fn init_metrics() {
    let _ = REGISTRY.register(Box::new(ROWS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(TRANSFORM_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(STRUCTURAL_FAILURES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(CURATED_ROWS.clone()));
}

pub fn record_row(kind: EntityKind, outcome: &str) {
    ROWS_TOTAL
        .with_label_values(&[kind.as_str(), outcome])
        .inc();
}

pub fn record_transform_run(kind: EntityKind, duration: Duration) {
    TRANSFORM_DURATION_SECONDS
        .with_label_values(&[kind.as_str()])
        .observe(duration.as_secs_f64());
}

pub fn record_structural_failure(kind: EntityKind) {
    STRUCTURAL_FAILURES_TOTAL
        .with_label_values(&[kind.as_str()])
        .inc();
}

pub fn set_curated_rows(kind: EntityKind, count: usize) {
    CURATED_ROWS
        .with_label_values(&[kind.as_str()])
        .set(count as f64);
}

/// Text exposition of everything in the registry.
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
