//! Operational metrics with Prometheus
//!
//! Exposes the signals worth alerting on:
//! - Rebuild rates, failures, and durations per component
//! - Recommendation query rates and latencies per strategy
//! - Cache effectiveness
//! - Model and stats table sizes
//!
//! NOTE: product and user IDs never appear in labels; they are unbounded
//! and would blow up Prometheus cardinality.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry};

lazy_static! {
    /// Global metrics registry
    pub static ref METRICS_REGISTRY: Registry = Registry::new();

    // ============================================================================
    // Rebuild Metrics
    // ============================================================================

    /// Model/stats rebuilds by component and result
    pub static ref REBUILD_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("shoprec_rebuild_total", "Total rebuilds by component and result"),
        &["component", "result"]  // result: "success" or "error"
    ).unwrap();

    /// Rebuild duration in seconds
    pub static ref REBUILD_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "shoprec_rebuild_duration_seconds",
            "Rebuild duration in seconds"
        )
        .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["component"]
    ).unwrap();

    // ============================================================================
    // Query Metrics
    // ============================================================================

    /// Recommendation queries by strategy and result
    pub static ref RECOMMEND_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("shoprec_recommendations_total", "Total recommendation queries"),
        &["strategy", "result"]
    ).unwrap();

    /// Recommendation query duration (in-memory, so sub-millisecond buckets)
    pub static ref RECOMMEND_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "shoprec_recommendation_duration_seconds",
            "Recommendation query duration"
        )
        .buckets(vec![0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1]),
        &["strategy"]
    ).unwrap();

    /// Personalized-recommendation cache hits and misses
    pub static ref CACHE_EVENTS: IntCounterVec = IntCounterVec::new(
        Opts::new("shoprec_cache_events_total", "Recommendation cache events"),
        &["event"]  // event: "hit" or "miss"
    ).unwrap();

    // ============================================================================
    // Size Metrics (aggregate)
    // ============================================================================

    /// Entities in the most recent model snapshot per component
    pub static ref MODEL_ENTITIES: IntGaugeVec = IntGaugeVec::new(
        Opts::new("shoprec_model_entities", "Entities in the current model snapshot"),
        &["component", "entity"]  // entity: "products", "users", "sessions"
    ).unwrap();

    /// Rows written by the last stats pass
    pub static ref STATS_ROWS: IntGaugeVec = IntGaugeVec::new(
        Opts::new("shoprec_stats_rows", "Rows written by the last stats aggregation"),
        &["kind"]  // kind: "product" or a category dimension name
    ).unwrap();
}

/// Register all metrics with the global registry
pub fn register_metrics() -> Result<(), prometheus::Error> {
    // Rebuild metrics
    METRICS_REGISTRY.register(Box::new(REBUILD_TOTAL.clone()))?;
    METRICS_REGISTRY.register(Box::new(REBUILD_DURATION.clone()))?;

    // Query metrics
    METRICS_REGISTRY.register(Box::new(RECOMMEND_TOTAL.clone()))?;
    METRICS_REGISTRY.register(Box::new(RECOMMEND_DURATION.clone()))?;
    METRICS_REGISTRY.register(Box::new(CACHE_EVENTS.clone()))?;

    // Size metrics
    METRICS_REGISTRY.register(Box::new(MODEL_ENTITIES.clone()))?;
    METRICS_REGISTRY.register(Box::new(STATS_ROWS.clone()))?;

    Ok(())
}
