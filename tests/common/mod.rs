//! Shared utilities for integration and load testing.

use std::net::SocketAddr;
use std::time::Duration;

use obs_compare::config::{AppConfig, ObservabilityBackend};
use obs_compare::lifecycle::Shutdown;
use obs_compare::observability::{install_prometheus_recorder, RequestMetrics};
use obs_compare::HttpServer;
use tokio::net::TcpListener;

/// A demo app bound to an ephemeral loopback port.
pub struct TestApp {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Config tuned for tests: short slow route, no OTLP.
pub fn test_config(backend: ObservabilityBackend) -> AppConfig {
    let mut config = AppConfig::default();
    config.server.bind_address = "127.0.0.1:0".to_string();
    config.telemetry.backend = backend;
    config.telemetry.otlp_enabled = false;
    config.demo.slow_delay_ms = 50;
    config
}

/// Start the demo app and wait until it accepts connections.
pub async fn start_app(config: AppConfig) -> TestApp {
    let prometheus = match config.telemetry.backend {
        ObservabilityBackend::Prometheus => Some(install_prometheus_recorder().unwrap()),
        ObservabilityBackend::Signoz => None,
    };

    let listener = TcpListener::bind(&config.server.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, RequestMetrics::new(prometheus));
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    wait_until_ready(addr).await;
    TestApp { addr, shutdown }
}

async fn wait_until_ready(addr: SocketAddr) {
    let client = reqwest::Client::new();
    for _ in 0..50 {
        if client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .is_ok()
        {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("demo app at {} never became ready", addr);
}
