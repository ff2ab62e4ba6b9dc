//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, path, status code
//! - `http_request_duration_seconds` (histogram): latency distribution
//! - `active_users` (gauge): requests currently in flight
//!
//! Every instrument records twice: into the OpenTelemetry meter (pushed over
//! OTLP) and into the `metrics` facade (rendered on `/metrics` once the
//! Prometheus recorder is installed, a no-op before that). Call sites stay
//! identical for both stacks.

use std::sync::Mutex;
use std::time::Duration;

use metrics::Unit;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use opentelemetry::metrics::{Counter, Gauge, Histogram};
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::{MetricExporter, WithExportConfig};
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::Resource;

use crate::config::TelemetryConfig;
use crate::observability::TelemetryError;

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const ACTIVE_USERS: &str = "active_users";

const METER_NAME: &str = "rust_app_metrics";

/// Covers the 2 s slow route with room on both sides.
const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 2.5, 5.0, 10.0,
];

static PROMETHEUS: Mutex<Option<PrometheusHandle>> = Mutex::new(None);

/// Build the OTLP metric pipeline: gRPC exporter behind a periodic reader.
pub fn build_meter_provider(
    config: &TelemetryConfig,
    resource: Resource,
) -> Result<SdkMeterProvider, TelemetryError> {
    let exporter = MetricExporter::builder()
        .with_tonic()
        .with_endpoint(config.otlp_endpoint.clone())
        .build()?;

    let reader = PeriodicReader::builder(exporter)
        .with_interval(Duration::from_secs(config.metric_export_interval_secs))
        .build();

    Ok(SdkMeterProvider::builder()
        .with_resource(resource)
        .with_reader(reader)
        .build())
}

/// Install the process-wide Prometheus recorder.
///
/// Safe to call repeatedly: later calls return the handle of the first.
pub fn install_prometheus_recorder() -> Result<PrometheusHandle, TelemetryError> {
    let mut slot = PROMETHEUS
        .lock()
        .map_err(|_| TelemetryError::Poisoned("prometheus recorder"))?;

    if let Some(handle) = slot.as_ref() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(HTTP_REQUEST_DURATION_SECONDS.to_string()),
            LATENCY_BUCKETS,
        )?
        .install_recorder()?;

    metrics::describe_counter!(HTTP_REQUESTS_TOTAL, Unit::Count, "Total number of HTTP requests");
    metrics::describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        Unit::Seconds,
        "Duration of HTTP requests"
    );
    metrics::describe_gauge!(ACTIVE_USERS, Unit::Count, "Number of active users");

    tracing::debug!("Configured Prometheus metric recorder");
    *slot = Some(handle.clone());
    Ok(handle)
}

/// Request instruments shared by every handler.
#[derive(Clone)]
pub struct RequestMetrics {
    requests: Counter<u64>,
    duration: Histogram<f64>,
    active_users: Gauge<i64>,
    prometheus: Option<PrometheusHandle>,
}

impl RequestMetrics {
    /// Create instruments from the global meter provider.
    ///
    /// Must run after the provider is installed; instruments created earlier
    /// stay bound to the no-op meter.
    pub fn new(prometheus: Option<PrometheusHandle>) -> Self {
        let meter = global::meter(METER_NAME);

        let requests = meter
            .u64_counter(HTTP_REQUESTS_TOTAL)
            .with_unit("1")
            .with_description("Total number of HTTP requests")
            .build();
        let duration = meter
            .f64_histogram(HTTP_REQUEST_DURATION_SECONDS)
            .with_unit("s")
            .with_description("Duration of HTTP requests")
            .build();
        let active_users = meter
            .i64_gauge(ACTIVE_USERS)
            .with_unit("1")
            .with_description("Number of active users")
            .build();

        Self {
            requests,
            duration,
            active_users,
            prometheus,
        }
    }

    /// Count a finished request and record its latency.
    pub fn record_request(&self, method: &str, path: &str, status: u16, elapsed: Duration) {
        let seconds = elapsed.as_secs_f64();
        let attrs = [
            KeyValue::new("method", method.to_owned()),
            KeyValue::new("path", path.to_owned()),
            KeyValue::new("status_code", i64::from(status)),
        ];
        self.requests.add(1, &attrs);
        self.duration.record(seconds, &attrs);

        let status = status.to_string();
        metrics::counter!(
            HTTP_REQUESTS_TOTAL,
            "method" => method.to_owned(),
            "path" => path.to_owned(),
            "status_code" => status.clone()
        )
        .increment(1);
        metrics::histogram!(
            HTTP_REQUEST_DURATION_SECONDS,
            "method" => method.to_owned(),
            "path" => path.to_owned(),
            "status_code" => status
        )
        .record(seconds);
    }

    /// Publish the current number of in-flight requests.
    pub fn set_active_users(&self, value: i64, method: &str, path: &str) {
        self.active_users.record(
            value,
            &[
                KeyValue::new("method", method.to_owned()),
                KeyValue::new("path", path.to_owned()),
            ],
        );
        metrics::gauge!(ACTIVE_USERS, "method" => method.to_owned(), "path" => path.to_owned())
            .set(value as f64);
    }

    /// Prometheus text exposition, when the Prometheus stack is selected.
    pub fn render_prometheus(&self) -> Option<String> {
        self.prometheus.as_ref().map(PrometheusHandle::render)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_is_idempotent() {
        let first = install_prometheus_recorder().unwrap();
        let second = install_prometheus_recorder().unwrap();

        metrics::counter!("recorder_reinstall_total").increment(3);
        assert!(first.render().contains("recorder_reinstall_total 3"));
        assert!(second.render().contains("recorder_reinstall_total 3"));
    }

    #[test]
    fn test_recorded_request_is_rendered() {
        let handle = install_prometheus_recorder().unwrap();
        let metrics = RequestMetrics::new(Some(handle));

        metrics.record_request("GET", "/unit-test", 200, Duration::from_millis(30));
        metrics.set_active_users(1, "GET", "/unit-test");

        let text = metrics.render_prometheus().unwrap();
        assert!(text.contains("# HELP http_requests_total"));
        assert!(text.contains(r#"path="/unit-test""#));
        assert!(text.contains("http_request_duration_seconds_bucket"));
        assert!(text.contains(r#"active_users{method="GET",path="/unit-test"}"#));
    }

    #[test]
    fn test_no_exposition_without_prometheus() {
        let metrics = RequestMetrics::new(None);
        metrics.record_request("GET", "/fast", 200, Duration::from_millis(1));
        assert!(metrics.render_prometheus().is_none());
    }
}
