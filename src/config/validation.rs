//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and cross-field
//! constraints. All problems are reported at once.

use std::fmt;

use url::Url;

use crate::config::schema::{ReloadMode, WardenConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
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

/// Validate a parsed configuration.
pub fn validate_config(config: &WardenConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if Url::parse(&config.directory.url).is_err() {
        errors.push(ValidationError::new("directory.url", "not a valid URL"));
    }
    if config.directory.protocol.trim().is_empty() {
        errors.push(ValidationError::new("directory.protocol", "must not be empty"));
    }
    if config.directory.timeout_secs == 0 {
        errors.push(ValidationError::new("directory.timeout_secs", "must be > 0"));
    }

    if Url::parse(&config.probe.target_url).is_err() {
        errors.push(ValidationError::new("probe.target_url", "not a valid URL"));
    }
    if !matches!(
        config.probe.proxy_scheme.as_str(),
        "socks5" | "socks5h" | "http" | "https"
    ) {
        errors.push(ValidationError::new(
            "probe.proxy_scheme",
            format!("unsupported scheme '{}'", config.probe.proxy_scheme),
        ));
    }
    if config.probe.request_timeout_secs == 0 {
        errors.push(ValidationError::new("probe.request_timeout_secs", "must be > 0"));
    }
    if config.probe.connect_timeout_secs == 0 {
        errors.push(ValidationError::new("probe.connect_timeout_secs", "must be > 0"));
    }
    if config.probe.max_concurrency == Some(0) {
        errors.push(ValidationError::new("probe.max_concurrency", "must be > 0 when set"));
    }

    if config.health.max_duration_ms == 0 {
        errors.push(ValidationError::new("health.max_duration_ms", "must be > 0"));
    }

    let schedule = &config.schedule;
    if schedule.health_interval_secs == 0 {
        errors.push(ValidationError::new("schedule.health_interval_secs", "must be > 0"));
    }
    if schedule.health_interval_secs >= schedule.discovery_interval_secs {
        errors.push(ValidationError::new(
            "schedule.health_interval_secs",
            format!(
                "must be shorter than discovery_interval_secs ({} >= {})",
                schedule.health_interval_secs, schedule.discovery_interval_secs
            ),
        ));
    }

    if Url::parse(&config.registry.url).is_err() {
        errors.push(ValidationError::new("registry.url", "not a valid URL"));
    }
    if config.registry.backend.is_empty() {
        errors.push(ValidationError::new("registry.backend", "must not be empty"));
    }
    if config.registry.startup_attempts == 0 {
        errors.push(ValidationError::new("registry.startup_attempts", "must be > 0"));
    }

    match config.process.mode {
        ReloadMode::MasterWorker => {
            if config.process.binary.is_empty() {
                errors.push(ValidationError::new("process.binary", "required in master_worker mode"));
            }
            if config.process.config_file.is_empty() {
                errors.push(ValidationError::new(
                    "process.config_file",
                    "required in master_worker mode",
                ));
            }
        }
        ReloadMode::Command => {
            if config.process.reload_command.is_empty() {
                errors.push(ValidationError::new(
                    "process.reload_command",
                    "required in command mode",
                ));
            }
        }
        ReloadMode::None => {}
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "not a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
