//! Instrumented demo app for comparing observability stacks.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────── obs-compare ─────────────────────────┐
//!                 │                                                               │
//!   loadgen ──────┼─▶ request id ─▶ http_request span ─▶ telemetry ─▶ handlers    │
//!                 │                        │                 │                    │
//!                 │                        ▼                 ▼                    │
//!                 │                 tracing-opentelemetry  RequestMetrics         │
//!                 │                        │              │        │              │
//!                 └────────────────────────┼──────────────┼────────┼──────────────┘
//!                                          │              │        │
//!              OBSERVABILITY_BACKEND=signoz│              │        │=prometheus
//!                                          ▼              ▼        ▼
//!                                 SigNoz collector :4317 (OTLP)   GET /metrics ◀── Prometheus :9090
//!                                                                 stdout JSON ──▶ promtail ─▶ Loki :3100
//! ```
//!
//! Configuration comes from an optional TOML file (`--config`), `.env`, and
//! the environment, in increasing priority.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use obs_compare::config::{load_dotenv, load_with_env, ProcessEnv};
use obs_compare::lifecycle::Shutdown;
use obs_compare::observability::{self, RequestMetrics};
use obs_compare::HttpServer;

#[derive(Parser)]
#[command(name = "obs-compare")]
#[command(about = "Demo app instrumented for SigNoz or Prometheus + Grafana + Loki", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // A missing .env is fine; the environment may be set by compose.
    load_dotenv(None)?;

    let config = load_with_env(cli.config.as_deref(), &ProcessEnv)?;
    let mut telemetry = observability::init(&config.telemetry)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.server.bind_address,
        backend = %config.telemetry.backend,
        otlp_enabled = config.telemetry.otlp_enabled,
        "obs-compare starting"
    );

    let metrics = RequestMetrics::new(telemetry.prometheus_handle());

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let server = HttpServer::new(config, metrics);
    server.run(listener, shutdown.subscribe()).await?;

    telemetry.shutdown();
    tracing::info!("Shutdown complete");
    Ok(())
}
