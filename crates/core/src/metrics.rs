//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Queue consumers (jobs by outcome, handling duration)
//! - Fulfilment pipeline (duration, assets downloaded)
//! - Workspace (temp files removed)
//! - Email (messages sent)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGaugeVec, Opts};

// =============================================================================
// Queue Consumers
// =============================================================================

/// Jobs settled by queue and outcome.
pub static JOBS_PROCESSED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("fulfillment_jobs_processed_total", "Total jobs settled"),
        &["queue", "outcome"], // "acknowledged", "requeued", "exhausted", "discarded"
    )
    .unwrap()
});

/// Time spent handling one job.
pub static JOB_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "fulfillment_job_duration_seconds",
            "Duration of job handling",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
        &["queue"],
    )
    .unwrap()
});

/// Jobs per queue and state, refreshed when the status endpoint is scraped.
pub static QUEUE_JOBS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("fulfillment_queue_jobs", "Jobs per queue and state"),
        &["queue", "state"],
    )
    .unwrap()
});

// =============================================================================
// Fulfilment Pipeline
// =============================================================================

/// End-to-end fulfilment duration by result.
pub static FULFILLMENT_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "fulfillment_order_duration_seconds",
            "Duration of one fulfilment attempt",
        )
        .buckets(vec![1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
        &["result"], // "success", "failure"
    )
    .unwrap()
});

/// Source PDFs downloaded from object storage.
pub static ASSETS_DOWNLOADED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "fulfillment_assets_downloaded_total",
        "Total source PDFs downloaded",
    )
    .unwrap()
});

// =============================================================================
// Workspace
// =============================================================================

/// Temp files deleted, by who deleted them.
pub static TEMP_FILES_REMOVED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "fulfillment_temp_files_removed_total",
            "Total temporary files removed",
        ),
        &["source"], // "attempt", "sweep"
    )
    .unwrap()
});

// =============================================================================
// Email
// =============================================================================

/// Emails handed to the provider, by template.
pub static EMAILS_SENT: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("fulfillment_emails_sent_total", "Total emails sent"),
        &["template"], // "download_ready", "order_confirmation"
    )
    .unwrap()
});

/// Register all core metrics with the given registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Queue consumers
        Box::new(JOBS_PROCESSED.clone()),
        Box::new(JOB_DURATION.clone()),
        Box::new(QUEUE_JOBS.clone()),
        // Fulfilment
        Box::new(FULFILLMENT_DURATION.clone()),
        Box::new(ASSETS_DOWNLOADED.clone()),
        // Workspace
        Box::new(TEMP_FILES_REMOVED.clone()),
        // Email
        Box::new(EMAILS_SENT.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_metrics_register_cleanly() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
        JOBS_PROCESSED
            .with_label_values(&["orders", "acknowledged"])
            .inc();
        let families = registry.gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "fulfillment_jobs_processed_total"));
    }
}
