//! Errors surfaced to HTTP clients.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Handler error, rendered as `{"detail": "..."}` with a matching status.
#[derive(Debug, Error)]
pub enum AppError {
    /// Raised on purpose by `/error` so both stacks have failures to show.
    #[error("error_response")]
    Simulated,

    #[error("Prometheus observability platform not configured")]
    PrometheusNotConfigured,

    #[error("Not Found")]
    NotFound,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Simulated => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::PrometheusNotConfigured => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
