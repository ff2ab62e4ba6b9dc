//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Handlers and middleware produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!     → traces.rs  (spans with trace/span ids)
//!
//! Consumers, by backend:
//!     signoz     → OTLP/gRPC collector (traces, metrics, logs)
//!     prometheus → /metrics scrape + JSON stdout for promtail/Loki
//! ```
//!
//! # Design Decisions
//! - One `init` call per process; repeated calls are no-ops
//! - The same instruments feed both stacks, only the exporters differ
//! - Providers are flushed on shutdown so short runs still reach the backend

pub mod logging;
pub mod metrics;
pub mod traces;

use std::sync::atomic::{AtomicBool, Ordering};

use metrics_exporter_prometheus::PrometheusHandle;
use opentelemetry::global;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry};

use crate::config::{ObservabilityBackend, TelemetryConfig};

pub use self::metrics::{install_prometheus_recorder, RequestMetrics};
pub use self::traces::current_trace_ids;

static CONFIGURED: AtomicBool = AtomicBool::new(false);

/// Errors raised while initializing telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to build OTLP exporter: {0}")]
    OtlpExporter(#[from] opentelemetry_otlp::ExporterBuildError),

    #[error("failed to initialize tracing subscriber: {0}")]
    TracingSubscriber(#[from] tracing_subscriber::util::TryInitError),

    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("failed to install Prometheus recorder: {0}")]
    Prometheus(#[from] metrics_exporter_prometheus::BuildError),

    #[error("{0} lock poisoned")]
    Poisoned(&'static str),
}

/// Owns the telemetry providers; flushes them on shutdown or drop.
#[derive(Default)]
pub struct TelemetryGuard {
    tracer_provider: Option<SdkTracerProvider>,
    meter_provider: Option<SdkMeterProvider>,
    logger_provider: Option<SdkLoggerProvider>,
    prometheus: Option<PrometheusHandle>,
}

impl TelemetryGuard {
    /// Handle for `/metrics`, present when the Prometheus backend is selected.
    pub fn prometheus_handle(&self) -> Option<PrometheusHandle> {
        self.prometheus.clone()
    }

    /// Flush and stop every provider. Errors are logged, not returned.
    pub fn shutdown(&mut self) {
        if let Some(provider) = self.meter_provider.take() {
            if let Err(e) = provider.shutdown() {
                tracing::warn!(error = %e, "Meter provider shutdown failed");
            }
        }
        if let Some(provider) = self.tracer_provider.take() {
            if let Err(e) = provider.shutdown() {
                tracing::warn!(error = %e, "Tracer provider shutdown failed");
            }
        }
        if let Some(provider) = self.logger_provider.take() {
            if let Err(e) = provider.shutdown() {
                tracing::warn!(error = %e, "Logger provider shutdown failed");
            }
        }
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Configure tracing, logging and metrics for the selected backend.
pub fn init(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let prometheus = match config.backend {
        ObservabilityBackend::Prometheus => Some(install_prometheus_recorder()?),
        ObservabilityBackend::Signoz => None,
    };

    let mut guard = TelemetryGuard {
        tracer_provider: None,
        meter_provider: None,
        logger_provider: None,
        prometheus,
    };

    if CONFIGURED.load(Ordering::SeqCst) {
        return Ok(guard);
    }

    let resource = Resource::builder()
        .with_service_name(config.service_name.clone())
        .build();

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = vec![logging::fmt_layer(config.log_format, std::io::stdout)];
    if config.otlp_enabled {
        let tracer_provider = traces::build_tracer_provider(config, resource.clone())?;
        let meter_provider = metrics::build_meter_provider(config, resource.clone())?;
        let logger_provider = logging::build_logger_provider(config, resource)?;

        global::set_text_map_propagator(TraceContextPropagator::new());
        global::set_tracer_provider(tracer_provider.clone());
        global::set_meter_provider(meter_provider.clone());

        let tracer = tracer_provider.tracer(config.service_name.clone());
        layers.push(tracing_opentelemetry::layer().with_tracer(tracer).boxed());
        layers.push(logging::otel_log_layer(&logger_provider));

        guard.tracer_provider = Some(tracer_provider);
        guard.meter_provider = Some(meter_provider);
        guard.logger_provider = Some(logger_provider);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(logging::env_filter(&config.log_level)?)
        .try_init()?;

    CONFIGURED.store(true, Ordering::SeqCst);

    tracing::debug!(
        service_name = %config.service_name,
        backend = %config.backend,
        otlp_enabled = config.otlp_enabled,
        otlp_endpoint = %config.otlp_endpoint,
        "Configured application telemetry"
    );

    Ok(guard)
}
