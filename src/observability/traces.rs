//! Distributed tracing support.
//!
//! # Responsibilities
//! - Export `tracing` spans as OpenTelemetry spans over OTLP
//! - Expose the current trace/span ids for log correlation
//!
//! # Design Decisions
//! - W3C Trace Context propagation
//! - Batch span processor; spans are flushed on shutdown

use opentelemetry::trace::TraceContextExt;
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::config::TelemetryConfig;
use crate::observability::TelemetryError;

/// OTLP trace pipeline: gRPC exporter behind a batch span processor.
pub fn build_tracer_provider(
    config: &TelemetryConfig,
    resource: Resource,
) -> Result<SdkTracerProvider, TelemetryError> {
    let exporter = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(config.otlp_endpoint.clone())
        .build()?;

    Ok(SdkTracerProvider::builder()
        .with_resource(resource)
        .with_batch_exporter(exporter)
        .build())
}

/// Trace id (32 hex) and span id (16 hex) of the current span.
///
/// `None` outside a span or when no OpenTelemetry layer is installed.
pub fn current_trace_ids() -> Option<(String, String)> {
    let context = tracing::Span::current().context();
    let span = context.span();
    let span_context = span.span_context();

    if span_context.is_valid() {
        Some((
            span_context.trace_id().to_string(),
            span_context.span_id().to_string(),
        ))
    } else {
        None
    }
}
