//! Configuration loading from disk and the environment.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {message}")]
    Env { key: &'static str, message: String },

    #[error("Invalid .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Source of environment variables.
///
/// The process environment in production, a map in tests.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads from `std::env`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Load `.env` into the process environment.
///
/// `path` defaults to `.env` searched upwards from the working directory. A
/// missing file is fine; a malformed one is an error.
pub fn load_dotenv(path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path).map(|()| path.to_path_buf()),
        None => dotenvy::dotenv(),
    };

    match loaded {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let config = read_config(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Build the effective configuration: file (or defaults), then environment
/// overrides, then validation.
pub fn load_with_env<E: EnvSource>(path: Option<&Path>, env: &E) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_config(path)?,
        None => AppConfig::default(),
    };

    apply_env_overrides(&mut config, env)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Apply environment-variable overrides (highest priority).
pub fn apply_env_overrides<E: EnvSource>(config: &mut AppConfig, env: &E) -> Result<(), ConfigError> {
    // OBSERVABILITY_BACKEND wins over its older alias.
    if let Some(backend) = parse_env(env, "OBSERVABILITY_BACKEND")? {
        config.telemetry.backend = backend;
    } else if let Some(backend) = parse_env(env, "OPENTELEMETRY_BACKEND")? {
        config.telemetry.backend = backend;
    }

    if let Some(endpoint) = get_env_string(env, "OTEL_BACKEND_ENDPOINT") {
        config.telemetry.otlp_endpoint = endpoint;
    }
    if let Some(enabled) = get_env_bool(env, "OTEL_EXPORT_ENABLED")? {
        config.telemetry.otlp_enabled = enabled;
    }
    if let Some(name) = get_env_string(env, "OTEL_SERVICE_NAME") {
        config.telemetry.service_name = name;
    }
    if let Some(format) = parse_env(env, "APP_LOG_FORMAT")? {
        config.telemetry.log_format = format;
    }

    if let Some(addr) = get_env_string(env, "APP_BIND_ADDRESS") {
        config.server.bind_address = addr;
    }
    if let Some(delay) = parse_env(env, "APP_SLOW_DELAY_MS")? {
        config.demo.slow_delay_ms = delay;
    }

    Ok(())
}

fn get_env_string<E: EnvSource>(env: &E, key: &str) -> Option<String> {
    env.get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<E, T>(env: &E, key: &'static str) -> Result<Option<T>, ConfigError>
where
    E: EnvSource,
    T: FromStr,
    T::Err: ToString,
{
    get_env_string(env, key)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| ConfigError::Env {
                key,
                message: e.to_string(),
            })
        })
        .transpose()
}

fn get_env_bool<E: EnvSource>(env: &E, key: &'static str) -> Result<Option<bool>, ConfigError> {
    get_env_string(env, key)
        .map(|raw| match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Env {
                key,
                message: format!("'{}' is not a boolean", raw),
            }),
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{LogFormat, ObservabilityBackend};

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_backend_from_env() {
        let mut config = AppConfig::default();
        apply_env_overrides(&mut config, &env(&[("OBSERVABILITY_BACKEND", "prometheus")])).unwrap();
        assert_eq!(config.telemetry.backend, ObservabilityBackend::Prometheus);
    }

    #[test]
    fn test_backend_alias_and_precedence() {
        let mut config = AppConfig::default();
        apply_env_overrides(&mut config, &env(&[("OPENTELEMETRY_BACKEND", "prometheus")])).unwrap();
        assert_eq!(config.telemetry.backend, ObservabilityBackend::Prometheus);

        let mut config = AppConfig::default();
        apply_env_overrides(
            &mut config,
            &env(&[
                ("OBSERVABILITY_BACKEND", "signoz"),
                ("OPENTELEMETRY_BACKEND", "prometheus"),
            ]),
        )
        .unwrap();
        assert_eq!(config.telemetry.backend, ObservabilityBackend::Signoz);
    }

    #[test]
    fn test_all_overrides() {
        let mut config = AppConfig::default();
        apply_env_overrides(
            &mut config,
            &env(&[
                ("OTEL_BACKEND_ENDPOINT", "http://otel-collector:4317"),
                ("OTEL_EXPORT_ENABLED", "false"),
                ("OTEL_SERVICE_NAME", "demo"),
                ("APP_LOG_FORMAT", "pretty"),
                ("APP_BIND_ADDRESS", "127.0.0.1:9000"),
                ("APP_SLOW_DELAY_MS", "150"),
            ]),
        )
        .unwrap();

        assert_eq!(config.telemetry.otlp_endpoint, "http://otel-collector:4317");
        assert!(!config.telemetry.otlp_enabled);
        assert_eq!(config.telemetry.service_name, "demo");
        assert_eq!(config.telemetry.log_format, LogFormat::Pretty);
        assert_eq!(config.server.bind_address, "127.0.0.1:9000");
        assert_eq!(config.demo.slow_delay_ms, 150);
    }

    #[test]
    fn test_malformed_values_are_errors() {
        let mut config = AppConfig::default();
        let err = apply_env_overrides(&mut config, &env(&[("OBSERVABILITY_BACKEND", "jaeger")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { key: "OBSERVABILITY_BACKEND", .. }));

        let err = apply_env_overrides(&mut config, &env(&[("APP_SLOW_DELAY_MS", "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { key: "APP_SLOW_DELAY_MS", .. }));

        let err = apply_env_overrides(&mut config, &env(&[("OTEL_EXPORT_ENABLED", "maybe")])).unwrap_err();
        assert!(err.to_string().contains("OTEL_EXPORT_ENABLED"));
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let mut config = AppConfig::default();
        apply_env_overrides(&mut config, &env(&[("OBSERVABILITY_BACKEND", "  ")])).unwrap();
        assert_eq!(config.telemetry.backend, ObservabilityBackend::Signoz);
    }

    #[test]
    fn test_load_with_env_validates_merged_result() {
        let err = load_with_env(None, &env(&[("APP_BIND_ADDRESS", "not-an-addr")])).unwrap_err();
        match err {
            ConfigError::Validation(errors) => assert_eq!(errors[0].field, "server.bind_address"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_config_from_file() {
        let path = std::env::temp_dir().join(format!("obs-compare-{}.toml", uuid::Uuid::new_v4()));
        fs::write(
            &path,
            "[server]\nbind_address = \"127.0.0.1:8001\"\n[demo]\nslow_delay_ms = 10\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.server.bind_address, "127.0.0.1:8001");
        assert_eq!(config.demo.slow_delay_ms, 10);
    }

    #[test]
    fn test_dotenv_missing_is_ignored() {
        let loaded = load_dotenv(Some(Path::new("/definitely/not/here.env"))).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_dotenv_malformed_is_error() {
        let path = std::env::temp_dir().join(format!("obs-compare-{}.env", uuid::Uuid::new_v4()));
        fs::write(&path, "OBS_COMPARE_BROKEN LINE\n").unwrap();

        let result = load_dotenv(Some(&path));
        fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(ConfigError::Dotenv(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
