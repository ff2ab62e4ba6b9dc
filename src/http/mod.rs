//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, span, in-flight count, timing)
//!     → handlers.rs (/fast, /slow, /error, /metrics, /health)
//!     → request.rs (X-Process-Time, metrics, completion log)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod server;

pub use request::{X_PROCESS_TIME, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
