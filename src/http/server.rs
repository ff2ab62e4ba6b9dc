//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the demo routes
//! - Wire up middleware (request ID, tracing span, timeout, telemetry)
//! - Bind server to listener
//! - Serve until the shutdown signal fires

use std::sync::atomic::AtomicI64;
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::http::handlers;
use crate::http::request::{make_request_span, record_response_status, track_request};
use crate::observability::RequestMetrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub metrics: RequestMetrics,
    /// Requests currently in flight.
    pub active_users: Arc<AtomicI64>,
}

/// HTTP server for the demo app.
pub struct HttpServer {
    router: Router,
    config: Arc<AppConfig>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: AppConfig, metrics: RequestMetrics) -> Self {
        let config = Arc::new(config);
        let state = AppState {
            config: config.clone(),
            metrics,
            active_users: Arc::new(AtomicI64::new(0)),
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Outermost first: request id, span, telemetry, timeout, handler.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState) -> Router {
        Router::new()
            .route("/fast", get(handlers::fast_response))
            .route("/slow", get(handlers::slow_response))
            .route("/error", get(handlers::error_response))
            .route("/metrics", get(handlers::metrics))
            .route("/health", get(handlers::health))
            .fallback(handlers::not_found)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.server.request_timeout_secs,
            )))
            .layer(middleware::from_fn_with_state(state.clone(), track_request))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(make_request_span)
                    .on_response(record_response_status),
            )
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .with_state(state)
    }

    /// The configured router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backend = %self.config.telemetry.backend,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
