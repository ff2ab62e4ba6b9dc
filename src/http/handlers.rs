//! Demo route handlers.
//!
//! Three routes with distinct latency/outcome profiles give both stacks
//! something to show: `/fast`, `/slow` and `/error`.

use std::time::Duration;

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::AppError;
use crate::http::server::AppState;

/// Content type of the Prometheus text exposition format.
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: String,
    pub backend: &'static str,
    pub version: &'static str,
}

pub async fn fast_response() -> Json<Message> {
    Json(Message {
        message: "fast_response",
    })
}

pub async fn slow_response(State(state): State<AppState>) -> Json<Message> {
    tokio::time::sleep(Duration::from_millis(state.config.demo.slow_delay_ms)).await;
    Json(Message {
        message: "slow_response",
    })
}

pub async fn error_response() -> Result<Json<Message>, AppError> {
    tracing::error!("Mocking an application error");
    Err(AppError::Simulated)
}

/// Application metrics in Prometheus text format.
pub async fn metrics(State(state): State<AppState>) -> Result<Response, AppError> {
    let body = state
        .metrics
        .render_prometheus()
        .ok_or(AppError::PrometheusNotConfigured)?;

    Ok(([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], body).into_response())
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: state.config.telemetry.service_name.clone(),
        backend: state.config.telemetry.backend.as_str(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn not_found() -> AppError {
    AppError::NotFound
}
