//! Observability comparison harness library.
//!
//! The demo app (`obs-compare` binary) and the load generator (`loadgen`
//! binary) are thin wrappers around these modules.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod loadgen;
pub mod observability;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
