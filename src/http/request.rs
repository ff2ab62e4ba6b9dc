//! Per-request instrumentation.
//!
//! # Responsibilities
//! - Open the `http_request` span exported as the request's trace
//! - Count in-flight requests (`active_users`)
//! - Record request count and latency for both backends
//! - Stamp `X-Process-Time` on the response
//! - Log request start and completion with trace correlation ids
//!
//! # Design Decisions
//! - A user is considered active only for the duration of its request
//! - The in-flight count is released by a drop guard, so cancelled
//!   requests do not leak it
//! - Routes are labelled by their template when matched, raw path otherwise

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{MatchedPath, Request, State},
    http::{HeaderValue, Response},
    middleware::Next,
};
use tracing::Span;

use crate::http::server::AppState;
use crate::observability::{current_trace_ids, RequestMetrics};

pub const X_REQUEST_ID: &str = "x-request-id";
pub const X_PROCESS_TIME: &str = "x-process-time";

/// Route label for metrics and logs.
pub fn route_label<B>(request: &axum::http::Request<B>) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned())
}

/// Span for `TraceLayer`; bridged to an OpenTelemetry span when OTLP is on.
pub fn make_request_span(request: &axum::http::Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        otel.name = %format!("{} {}", request.method(), route_label(request)),
        http.method = %request.method(),
        http.route = %route_label(request),
        http.status_code = tracing::field::Empty,
        request_id = %request_id,
        trace_id = tracing::field::Empty,
        span_id = tracing::field::Empty,
    )
}

pub fn record_response_status(response: &Response<Body>, _latency: Duration, span: &Span) {
    span.record("http.status_code", response.status().as_u16());
}

/// Holds one slot of the in-flight count; releases it on drop.
struct ActiveUserGuard {
    active: Arc<AtomicI64>,
    metrics: RequestMetrics,
    method: String,
    path: String,
}

impl ActiveUserGuard {
    fn acquire(active: Arc<AtomicI64>, metrics: RequestMetrics, method: String, path: String) -> Self {
        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
        metrics.set_active_users(now, &method, &path);
        Self {
            active,
            metrics,
            method,
            path,
        }
    }
}

impl Drop for ActiveUserGuard {
    fn drop(&mut self) {
        let now = self.active.fetch_sub(1, Ordering::SeqCst) - 1;
        self.metrics.set_active_users(now, &self.method, &self.path);
    }
}

/// Telemetry middleware applied to every route.
pub async fn track_request(State(state): State<AppState>, request: Request, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = route_label(&request);

    let guard = ActiveUserGuard::acquire(
        state.active_users.clone(),
        state.metrics.clone(),
        method.clone(),
        path.clone(),
    );

    // The OpenTelemetry context exists once the span is entered; recording the
    // ids here puts them on every event logged while handling the request.
    let (trace_id, span_id) = current_trace_ids().unwrap_or_default();
    if !trace_id.is_empty() {
        let span = Span::current();
        span.record("trace_id", trace_id.as_str());
        span.record("span_id", span_id.as_str());
    }

    tracing::debug!(method = %method, path = %path, "Request received");
    let start = Instant::now();

    let mut response = next.run(request).await;

    let elapsed = start.elapsed();
    let process_time = elapsed.as_secs_f64();
    if let Ok(value) = HeaderValue::from_str(&format!("{:.2}", process_time)) {
        response.headers_mut().insert(X_PROCESS_TIME, value);
    }

    let status = response.status().as_u16();
    state.metrics.record_request(&method, &path, status, elapsed);
    drop(guard);

    tracing::debug!(
        method = %method,
        path = %path,
        status_code = status,
        process_time = %format!("{:.6}", process_time),
        trace_id = %trace_id,
        span_id = %span_id,
        "Request processed"
    );

    response
}
