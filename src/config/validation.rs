//! Configuration validation.
//!
//! Serde handles syntax; this checks values. All problems are collected so a
//! bad deployment reports everything at once.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::AppConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a fully merged configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("'{}' is not a socket address", config.server.bind_address),
        ));
    }

    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "server.request_timeout_secs",
            "must be greater than zero",
        ));
    }

    if config.telemetry.service_name.trim().is_empty() {
        errors.push(ValidationError::new("telemetry.service_name", "must not be empty"));
    }

    if config.telemetry.otlp_enabled {
        match url::Url::parse(&config.telemetry.otlp_endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(ValidationError::new(
                "telemetry.otlp_endpoint",
                format!("unsupported scheme '{}'", url.scheme()),
            )),
            Err(e) => errors.push(ValidationError::new(
                "telemetry.otlp_endpoint",
                format!("'{}' is not a URL: {}", config.telemetry.otlp_endpoint, e),
            )),
        }
    }

    if config.telemetry.metric_export_interval_secs == 0 {
        errors.push(ValidationError::new(
            "telemetry.metric_export_interval_secs",
            "must be greater than zero",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = AppConfig::default();
        config.server.bind_address = "localhost".into();
        config.telemetry.service_name = " ".into();
        config.telemetry.otlp_endpoint = "otel-collector:4317".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["server.bind_address", "telemetry.service_name", "telemetry.otlp_endpoint"]
        );
    }

    #[test]
    fn test_endpoint_ignored_when_otlp_disabled() {
        let mut config = AppConfig::default();
        config.telemetry.otlp_enabled = false;
        config.telemetry.otlp_endpoint = String::new();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_zero_export_interval_rejected_without_otlp() {
        let mut config = AppConfig::default();
        config.telemetry.otlp_enabled = false;
        config.telemetry.metric_export_interval_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "telemetry.metric_export_interval_secs");
    }
}
