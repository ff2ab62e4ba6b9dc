//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the demo app.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Root configuration for the demo app.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server settings.
    pub server: ServerConfig,

    /// Telemetry wiring (backend selection, exporters, logging).
    pub telemetry: TelemetryConfig,

    /// Behaviour of the demo routes.
    pub demo: DemoConfig,
}

/// Which observability stack the app reports to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObservabilityBackend {
    /// SigNoz: every signal over OTLP/gRPC.
    #[default]
    Signoz,
    /// Prometheus + Grafana + Loki: metrics scraped from `/metrics`.
    Prometheus,
}

impl ObservabilityBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObservabilityBackend::Signoz => "signoz",
            ObservabilityBackend::Prometheus => "prometheus",
        }
    }
}

impl fmt::Display for ObservabilityBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObservabilityBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "signoz" => Ok(ObservabilityBackend::Signoz),
            "prometheus" => Ok(ObservabilityBackend::Prometheus),
            other => Err(format!(
                "unknown observability backend '{}' (expected 'signoz' or 'prometheus')",
                other
            )),
        }
    }
}

/// Output format of the stdout log layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line; what promtail ships to Loki.
    #[default]
    Json,
    /// Human-readable output for local runs.
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// `service.name` resource attribute.
    pub service_name: String,

    /// Target observability stack.
    pub backend: ObservabilityBackend,

    /// OTLP/gRPC collector endpoint.
    pub otlp_endpoint: String,

    /// Build OTLP exporters at all. Collector-less stacks turn this off.
    pub otlp_enabled: bool,

    /// Periodic metric export interval in seconds.
    pub metric_export_interval_secs: u64,

    /// Log level for this crate (trace, debug, info, warn, error).
    pub log_level: String,

    /// Stdout log format.
    pub log_format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "rust_app".to_string(),
            backend: ObservabilityBackend::Signoz,
            otlp_endpoint: "http://localhost:4317".to_string(),
            otlp_enabled: true,
            metric_export_interval_secs: 60,
            log_level: "debug".to_string(),
            log_format: LogFormat::Json,
        }
    }
}

/// Demo route behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DemoConfig {
    /// How long `/slow` takes to answer, in milliseconds.
    pub slow_delay_ms: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self { slow_delay_ms: 2000 }
    }
}
