//! Synthetic traffic generator.
//!
//! # Data Flow
//! ```text
//! LoadConfig
//!     → task.rs   (weighted pick: /fast 3, /slow 2, /error 1)
//!     → runner.rs (ramped users, think time, reqwest GETs)
//!     → stats.rs  (per-task counts, failures, latency percentiles)
//!     → LoadReport (table or JSON)
//! ```
//!
//! Non-2xx responses count as failures, so `/error` always shows up as
//! failing traffic in both the report and the observability backends.

pub mod runner;
pub mod stats;
pub mod task;

use thiserror::Error;

pub use runner::{run, LoadConfig};
pub use stats::{LoadReport, ReportSummary, TaskStats};
pub use task::{default_tasks, pick_task, Task, TaskPicker};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no tasks configured")]
    NoTasks,

    #[error("invalid task weights: {0}")]
    Weights(#[from] rand::distributions::WeightedError),

    #[error("invalid host {0}")]
    InvalidHost(String),

    #[error("invalid load configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}
