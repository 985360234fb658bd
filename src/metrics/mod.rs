//! Prometheus metrics for the notification router.
//!
//! - Event intake (received by source, suppressed by quiet hours or rules)
//! - Channel attempts by channel and outcome, send latency
//! - Dispatch duration and record write failures
//! - Template and storage health

mod helpers;

pub use helpers::{encode_metrics, DispatchMetrics, StorageMetrics, TemplateMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge, Histogram, HistogramVec, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "notify";

lazy_static! {
    // ============================================================================
    // Event Metrics
    // ============================================================================

    /// Events accepted for dispatch by source
    pub static ref EVENTS_RECEIVED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_events_received_total", METRIC_PREFIX),
        "Total events accepted for dispatch",
        &["source"]
    ).unwrap();

    /// Events for which no channel qualified
    pub static ref EVENTS_SUPPRESSED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_events_suppressed_total", METRIC_PREFIX),
        "Total events with no qualifying channel",
        &["reason"]
    ).unwrap();

    /// Events rejected at intake (bad envelope, unknown priority)
    pub static ref EVENTS_REJECTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_events_rejected_total", METRIC_PREFIX),
        "Total events rejected before dispatch",
        &["source"]
    ).unwrap();

    // ============================================================================
    // Channel Metrics
    // ============================================================================

    /// Channel delivery attempts by channel and outcome
    pub static ref CHANNEL_ATTEMPTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_channel_attempts_total", METRIC_PREFIX),
        "Total channel delivery attempts",
        &["channel", "outcome"]
    ).unwrap();

    /// Provider send latency per channel
    pub static ref CHANNEL_SEND_LATENCY: HistogramVec = register_histogram_vec!(
        format!("{}_channel_send_latency_seconds", METRIC_PREFIX),
        "Provider send latency in seconds",
        &["channel"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    ).unwrap();

    // ============================================================================
    // Dispatch Metrics
    // ============================================================================

    /// End-to-end dispatch duration
    pub static ref DISPATCH_DURATION: Histogram = register_histogram!(
        format!("{}_dispatch_duration_seconds", METRIC_PREFIX),
        "Dispatch duration in seconds",
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]
    ).unwrap();

    /// Delivery records that could not be persisted
    pub static ref RECORD_WRITE_FAILURES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_record_write_failures_total", METRIC_PREFIX),
        "Total notification records that failed to persist"
    ).unwrap();

    // ============================================================================
    // Template Metrics
    // ============================================================================

    /// Qualifying channels without a template
    pub static ref TEMPLATES_MISSING_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_templates_missing_total", METRIC_PREFIX),
        "Total channel attempts without a matching template",
        &["channel"]
    ).unwrap();

    /// Templates currently registered
    pub static ref TEMPLATES_REGISTERED: IntGauge = register_int_gauge!(
        format!("{}_templates_registered", METRIC_PREFIX),
        "Number of registered templates"
    ).unwrap();

    // ============================================================================
    // Storage Metrics
    // ============================================================================

    /// PostgreSQL circuit breaker state (0=closed, 1=open, 2=half-open)
    pub static ref STORAGE_CIRCUIT_BREAKER_STATE: IntGauge = register_int_gauge!(
        format!("{}_storage_circuit_breaker_state", METRIC_PREFIX),
        "PostgreSQL circuit breaker state (0=closed, 1=open, 2=half-open)"
    ).unwrap();

    /// Redis trigger messages received
    pub static ref REDIS_MESSAGES_RECEIVED: IntCounter = register_int_counter!(
        format!("{}_redis_messages_received_total", METRIC_PREFIX),
        "Total messages received from Redis pub/sub"
    ).unwrap();

    /// Redis trigger reconnections
    pub static ref REDIS_RECONNECTIONS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_redis_reconnections_total", METRIC_PREFIX),
        "Total Redis subscriber reconnection attempts"
    ).unwrap();
}
