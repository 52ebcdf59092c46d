//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Task queue (depth, executed/failed work items)
//! - Batch processing (per-file results, batch durations)
//! - File moves (durations)
//! - Failure triage (classified error kinds)

use once_cell::sync::Lazy;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
};

/// Current task queue depth.
pub static QUEUE_DEPTH: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("shelver_queue_depth", "Current task queue depth").unwrap()
});

/// Work items executed, by result.
pub static WORK_ITEMS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("shelver_work_items_total", "Total work items executed"),
        &["result"], // "ok", "failed", "panicked"
    )
    .unwrap()
});

/// Batch files processed, by result.
pub static BATCH_FILES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "shelver_batch_files_total",
            "Total files processed in batches",
        ),
        &["result"], // "succeeded", "failed"
    )
    .unwrap()
});

/// Batch duration in seconds.
pub static BATCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("shelver_batch_duration_seconds", "Duration of a batch")
            .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0, 900.0]),
        &["outcome"], // "completed", "aborted", "cancelled"
    )
    .unwrap()
});

/// File move duration in seconds.
pub static MOVE_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("shelver_move_duration_seconds", "Duration of a file move")
            .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0, 120.0]),
    )
    .unwrap()
});

/// Triage outcomes by error kind.
pub static TRIAGED_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("shelver_triaged_errors_total", "Failures by triage kind"),
        &["kind"], // "transient", "permission", "space", "path", "unknown"
    )
    .unwrap()
});

/// Files discovered by the scanner.
pub static FILES_DISCOVERED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "shelver_files_discovered_total",
            "Files seen by the discovery scanner",
        ),
        &["result"], // "new", "known", "skipped"
    )
    .unwrap()
});

/// Registers all core metrics on the given registry.
///
/// Collectors are process-global; registering twice on the same registry
/// returns an error from prometheus, so call this once at startup.
pub fn register_metrics(registry: &Registry) -> Result<(), prometheus::Error> {
    registry.register(Box::new(QUEUE_DEPTH.clone()))?;
    registry.register(Box::new(WORK_ITEMS.clone()))?;
    registry.register(Box::new(BATCH_FILES.clone()))?;
    registry.register(Box::new(BATCH_DURATION.clone()))?;
    registry.register(Box::new(MOVE_DURATION.clone()))?;
    registry.register(Box::new(TRIAGED_ERRORS.clone()))?;
    registry.register(Box::new(FILES_DISCOVERED.clone()))?;
    Ok(())
}
