//! Logging and distributed tracing.
//!
//! Logs go through a `tracing-subscriber` registry (text or JSON lines). When
//! enabled, spans are also exported over OTLP. Every dispatch opens a
//! `dispatcher.dispatch` span carrying the event id, type and source; the
//! outcome is written onto it with [`record_dispatch`] once the fan-out ends,
//! and each provider send runs under a child [`channel_send_span`].
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `NOTIFY_OTEL__ENABLED` | Enable OpenTelemetry tracing | `false` |
//! | `NOTIFY_OTEL__ENDPOINT` | OTLP gRPC endpoint | `http://localhost:4317` |
//! | `NOTIFY_OTEL__SERVICE_NAME` | Service name in traces | `notification-router` |
//! | `NOTIFY_OTEL__SAMPLING_RATIO` | Trace sampling ratio (0.0-1.0) | `1.0` |
//! | `NOTIFY_OTEL__JSON_LOGS` | Emit logs as JSON lines | `false` |
//! | `RUST_LOG` | Log filter | `info` |

use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    runtime,
    trace::{RandomIdGenerator, Sampler, TracerProvider as SdkTracerProvider},
    Resource,
};
use tracing::Span;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::OtelConfig;
use crate::notification::Channel;

/// Result type for telemetry operations
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Telemetry-specific error type
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Failed to initialize OpenTelemetry tracer: {0}")]
    TracerInit(String),
    #[error("Failed to build OTLP exporter: {0}")]
    ExporterBuild(String),
}

/// Telemetry guard that ensures proper shutdown of OpenTelemetry on drop.
pub struct TelemetryGuard {
    _provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if self._provider.is_some() {
            // Shutdown is handled automatically by TracerProvider drop
            tracing::info!("Shutting down OpenTelemetry tracer provider");
        }
    }
}

/// Install the global subscriber.
///
/// Keep the returned guard alive for the lifetime of the process; dropping it
/// shuts the OTLP pipeline down.
pub fn init_telemetry(config: &OtelConfig) -> TelemetryResult<TelemetryGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // Exactly one of the two is Some
    let text_logs = (!config.json_logs).then(tracing_subscriber::fmt::layer);
    let json_logs = config
        .json_logs
        .then(|| tracing_subscriber::fmt::layer().json());

    if config.enabled {
        let provider = init_otel_tracer(config)?;
        let tracer = provider.tracer(config.service_name.clone());
        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(text_logs)
            .with(json_logs)
            .with(otel_layer)
            .init();

        tracing::info!(
            endpoint = %config.endpoint,
            service_name = %config.service_name,
            sampling_ratio = %config.sampling_ratio,
            "OpenTelemetry tracing initialized"
        );

        Ok(TelemetryGuard {
            _provider: Some(provider),
        })
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(text_logs)
            .with(json_logs)
            .init();

        tracing::info!("Tracing initialized (OpenTelemetry disabled)");

        Ok(TelemetryGuard { _provider: None })
    }
}

/// Outcome label of a dispatch as written on its span
pub fn dispatch_outcome(suppressed: bool, succeeded: u64, failed: u64) -> &'static str {
    match (suppressed, succeeded, failed) {
        (true, _, _) => "suppressed",
        (false, _, 0) => "delivered",
        (false, 0, _) => "failed",
        _ => "partial",
    }
}

/// Write the result of a dispatch onto its span.
///
/// The span must declare `dispatch.outcome`, `dispatch.succeeded` and
/// `dispatch.failed` as empty fields; otherwise the values are dropped.
pub fn record_dispatch(span: &Span, suppressed: bool, succeeded: u64, failed: u64) {
    span.record("dispatch.outcome", dispatch_outcome(suppressed, succeeded, failed));
    span.record("dispatch.succeeded", succeeded);
    span.record("dispatch.failed", failed);
}

/// Span for one provider send. Created inside the dispatch span so the
/// spawned send task stays attached to it.
pub fn channel_send_span(channel: Channel) -> Span {
    tracing::info_span!("dispatcher.channel_send", channel = channel.as_str())
}

/// Map a sampling ratio onto a sampler; out of range values clamp.
fn sampler_for(ratio: f64) -> Sampler {
    if ratio >= 1.0 {
        Sampler::AlwaysOn
    } else if ratio <= 0.0 {
        Sampler::AlwaysOff
    } else {
        Sampler::TraceIdRatioBased(ratio)
    }
}

/// Initialize the OpenTelemetry tracer with OTLP exporter.
fn init_otel_tracer(config: &OtelConfig) -> TelemetryResult<SdkTracerProvider> {
    use opentelemetry::KeyValue;

    // Create OTLP exporter
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&config.endpoint)
        .build()
        .map_err(|e| TelemetryError::ExporterBuild(e.to_string()))?;

    let sampler = sampler_for(config.sampling_ratio);

    // Build the tracer provider
    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_sampler(sampler)
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(Resource::new(vec![
            KeyValue::new(
                opentelemetry_semantic_conventions::resource::SERVICE_NAME,
                config.service_name.clone(),
            ),
            KeyValue::new(
                opentelemetry_semantic_conventions::resource::SERVICE_VERSION,
                env!("CARGO_PKG_VERSION"),
            ),
        ]))
        .build();

    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OtelConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.endpoint, "http://localhost:4317");
        assert_eq!(config.service_name, "notification-router");
        assert_eq!(config.sampling_ratio, 1.0);
        assert!(!config.json_logs);
    }

    #[test]
    fn test_sampler_clamps_ratio() {
        assert!(matches!(sampler_for(1.5), Sampler::AlwaysOn));
        assert!(matches!(sampler_for(-0.1), Sampler::AlwaysOff));
        assert!(matches!(sampler_for(0.25), Sampler::TraceIdRatioBased(r) if r == 0.25));
    }

    #[test]
    fn test_dispatch_outcome_labels() {
        assert_eq!(dispatch_outcome(true, 0, 0), "suppressed");
        assert_eq!(dispatch_outcome(false, 3, 0), "delivered");
        assert_eq!(dispatch_outcome(false, 0, 2), "failed");
        assert_eq!(dispatch_outcome(false, 1, 1), "partial");
    }

    #[test]
    fn test_record_dispatch_without_subscriber() {
        // No subscriber installed: the span is disabled and recording is a no-op
        let span = channel_send_span(Channel::Email);
        record_dispatch(&span, false, 1, 0);
        assert!(span.is_disabled());
    }

    #[test]
    fn test_telemetry_guard_creation() {
        let guard = TelemetryGuard { _provider: None };
        drop(guard); // Should not panic
    }
}
