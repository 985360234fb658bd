//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    CHANNEL_ATTEMPTS_TOTAL, CHANNEL_SEND_LATENCY, DISPATCH_DURATION, EVENTS_RECEIVED_TOTAL,
    EVENTS_REJECTED_TOTAL, EVENTS_SUPPRESSED_TOTAL, RECORD_WRITE_FAILURES_TOTAL,
    REDIS_MESSAGES_RECEIVED, REDIS_RECONNECTIONS_TOTAL, STORAGE_CIRCUIT_BREAKER_STATE,
    TEMPLATES_MISSING_TOTAL, TEMPLATES_REGISTERED,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording dispatch metrics
pub struct DispatchMetrics;

impl DispatchMetrics {
    pub fn record_received(source: &str) {
        EVENTS_RECEIVED_TOTAL.with_label_values(&[source]).inc();
    }

    pub fn record_rejected(source: &str) {
        EVENTS_REJECTED_TOTAL.with_label_values(&[source]).inc();
    }

    /// Record an event where no channel qualified
    pub fn record_suppressed(reason: &str) {
        EVENTS_SUPPRESSED_TOTAL.with_label_values(&[reason]).inc();
    }

    /// Record one channel attempt and, when a send happened, its latency
    pub fn record_attempt(channel: &str, outcome: &str, send_seconds: f64) {
        CHANNEL_ATTEMPTS_TOTAL
            .with_label_values(&[channel, outcome])
            .inc();
        CHANNEL_SEND_LATENCY
            .with_label_values(&[channel])
            .observe(send_seconds);
    }

    pub fn record_record_write_failed() {
        RECORD_WRITE_FAILURES_TOTAL.inc();
    }

    pub fn observe_dispatch(seconds: f64) {
        DISPATCH_DURATION.observe(seconds);
    }
}

/// Helper struct for template metrics
pub struct TemplateMetrics;

impl TemplateMetrics {
    pub fn record_missing(channel: &str) {
        TEMPLATES_MISSING_TOTAL.with_label_values(&[channel]).inc();
    }

    pub fn set_registered(count: usize) {
        TEMPLATES_REGISTERED.set(count as i64);
    }
}

/// Helper struct for storage and trigger health
pub struct StorageMetrics;

impl StorageMetrics {
    /// Set circuit breaker state (0=closed, 1=open, 2=half-open)
    pub fn set_circuit_state(state: i64) {
        STORAGE_CIRCUIT_BREAKER_STATE.set(state);
    }

    pub fn record_redis_message() {
        REDIS_MESSAGES_RECEIVED.inc();
    }

    pub fn record_redis_reconnection() {
        REDIS_RECONNECTIONS_TOTAL.inc();
    }
}
