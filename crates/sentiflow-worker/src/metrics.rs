//! Prometheus metrics for the worker.
//!
//! Counters live in a process-global registry rather than in pipeline
//! state, so recording an observation never contends with processing.

use lazy_static::lazy_static;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};
use std::sync::Once;

static INIT: Once = Once::new();

lazy_static! {
    /// Global Prometheus metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Entries classified, persisted, and acknowledged
    pub static ref ENTRIES_PROCESSED_TOTAL: IntCounter = IntCounter::new(
        "sentiflow_entries_processed_total",
        "Total entries fully processed and acknowledged"
    ).expect("metric can be created");

    /// Malformed entries acknowledged without processing
    pub static ref ENTRIES_DISCARDED_TOTAL: IntCounter = IntCounter::new(
        "sentiflow_entries_discarded_total",
        "Total malformed entries discarded"
    ).expect("metric can be created");

    /// Entries left unacknowledged for redelivery, by failing stage
    pub static ref ENTRIES_FAILED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("sentiflow_entries_failed_total", "Total entry failures"),
        &["stage"] // classify, persist
    ).expect("metric can be created");

    /// Results produced by a non-primary classifier backend
    pub static ref CLASSIFIER_FALLBACKS_TOTAL: IntCounter = IntCounter::new(
        "sentiflow_classifier_fallbacks_total",
        "Total classifications served by a fallback backend"
    ).expect("metric can be created");

    /// Failed polls of the append log
    pub static ref POLL_ERRORS_TOTAL: IntCounter = IntCounter::new(
        "sentiflow_poll_errors_total",
        "Total failed reads from the append log"
    ).expect("metric can be created");

    /// End-to-end latency from read to acknowledgement
    pub static ref PROCESSING_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new("sentiflow_processing_latency_seconds", "Per-entry processing latency in seconds")
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0])
    ).expect("metric can be created");
}

/// Initialize the metrics registry
/// Can be called multiple times safely (idempotent)
pub fn init() {
    INIT.call_once(|| {
        REGISTRY
            .register(Box::new(ENTRIES_PROCESSED_TOTAL.clone()))
            .expect("entries_processed_total can be registered");
        REGISTRY
            .register(Box::new(ENTRIES_DISCARDED_TOTAL.clone()))
            .expect("entries_discarded_total can be registered");
        REGISTRY
            .register(Box::new(ENTRIES_FAILED_TOTAL.clone()))
            .expect("entries_failed_total can be registered");
        REGISTRY
            .register(Box::new(CLASSIFIER_FALLBACKS_TOTAL.clone()))
            .expect("classifier_fallbacks_total can be registered");
        REGISTRY
            .register(Box::new(POLL_ERRORS_TOTAL.clone()))
            .expect("poll_errors_total can be registered");
        REGISTRY
            .register(Box::new(PROCESSING_LATENCY.clone()))
            .expect("processing_latency can be registered");
    });
}
