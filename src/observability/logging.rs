//! Structured logging.
//!
//! # Responsibilities
//! - Build the stdout fmt layer (JSON for Loki, pretty for local runs)
//! - Build the OTLP log bridge for SigNoz
//! - Resolve the log level from config and `RUST_LOG`

use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::{LogExporter, WithExportConfig};
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::Resource;
use tracing::Subscriber;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::{LogFormat, TelemetryConfig};
use crate::observability::TelemetryError;

/// Targets whose events must not be fed back into the OTLP log exporter,
/// which itself logs through them.
const EXPORTER_TARGETS: &[&str] = &["opentelemetry", "tonic", "h2", "hyper"];

/// `RUST_LOG` when set, otherwise `level` for this crate and HTTP middleware.
pub fn env_filter(level: &str) -> Result<EnvFilter, TelemetryError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(format!(
            "info,obs_compare={level},tower_http={level}"
        ))?),
    }
}

/// Log layer in the configured format, writing to `writer` (stdout in the app).
///
/// JSON events carry the current span's fields, so the `trace_id` and
/// `span_id` recorded on `http_request` reach Loki with every line.
pub fn fmt_layer<S, W>(format: LogFormat, writer: W) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().with_writer(writer).boxed(),
    }
}

/// OTLP log pipeline: gRPC exporter behind a batch processor.
pub fn build_logger_provider(
    config: &TelemetryConfig,
    resource: Resource,
) -> Result<SdkLoggerProvider, TelemetryError> {
    let exporter = LogExporter::builder()
        .with_tonic()
        .with_endpoint(config.otlp_endpoint.clone())
        .build()?;

    Ok(SdkLoggerProvider::builder()
        .with_resource(resource)
        .with_batch_exporter(exporter)
        .build())
}

/// Bridge `tracing` events into OpenTelemetry log records.
pub fn otel_log_layer<S>(provider: &SdkLoggerProvider) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    OpenTelemetryTracingBridge::new(provider)
        .with_filter(filter_fn(|meta| {
            !EXPORTER_TARGETS
                .iter()
                .any(|target| meta.target().starts_with(target))
        }))
        .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        // RUST_LOG may be set by the test runner; either way a filter comes back.
        assert!(env_filter("debug").is_ok());
    }
}
