//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! .env (optional, dotenvy)
//!     → process environment
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (environment overrides, env beats file)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults, so the app runs with no file at all
//! - `OBSERVABILITY_BACKEND` is the single switch between the two stacks
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{
    apply_env_overrides, load_config, load_dotenv, load_with_env, ConfigError, EnvSource, ProcessEnv,
};
pub use schema::{AppConfig, DemoConfig, LogFormat, ObservabilityBackend, ServerConfig, TelemetryConfig};
pub use validation::{validate_config, ValidationError};
