//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     broadcast → HTTP server drains → load generator stops users
//!     → telemetry providers flush
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
