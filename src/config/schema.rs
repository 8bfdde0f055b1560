//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the controller.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the pool controller.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct WardenConfig {
    /// Candidate directory settings.
    pub directory: DirectoryConfig,

    /// Probe settings (target, timeouts, concurrency).
    pub probe: ProbeConfig,

    /// Health decision thresholds.
    pub health: HealthConfig,

    /// Cycle intervals.
    pub schedule: ScheduleConfig,

    /// Load balancer registry connection.
    pub registry: RegistryConfig,

    /// Load balancer process control.
    pub process: ProcessConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Candidate directory configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Directory listing URL returning a JSON array of proxies.
    pub url: String,

    /// Required transport protocol tag (exact match).
    pub protocol: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            url: "https://api.firexproxy.com/v1/proxy".to_string(),
            protocol: "SOCKS5".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Endpoint probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// URL fetched through each endpoint.
    pub target_url: String,

    /// Proxy URL scheme used to reach an endpoint (socks5, socks5h, http).
    pub proxy_scheme: String,

    /// Whole-request budget in seconds.
    pub request_timeout_secs: u64,

    /// TCP connect budget in seconds.
    pub connect_timeout_secs: u64,

    /// TCP keepalive interval in seconds.
    pub keepalive_secs: u64,

    /// Upper bound on concurrent probes per cycle. Unbounded when absent.
    pub max_concurrency: Option<usize>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            target_url: "https://httpbin.org/anything".to_string(),
            proxy_scheme: "socks5".to_string(),
            request_timeout_secs: 5,
            connect_timeout_secs: 30,
            keepalive_secs: 30,
            max_concurrency: None,
        }
    }
}

/// Health decision thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Slowest acceptable probe, in milliseconds.
    pub max_duration_ms: u64,

    /// Status code a healthy probe must return.
    pub expected_status: u16,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            max_duration_ms: 2_000,
            expected_status: 200,
        }
    }
}

/// Cycle intervals.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Seconds between discovery cycles.
    pub discovery_interval_secs: u64,

    /// Seconds between health-check cycles. Must be shorter than discovery.
    pub health_interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            discovery_interval_secs: 60,
            health_interval_secs: 30,
        }
    }
}

/// Which registry implementation backs the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryKind {
    /// HAProxy Data Plane API.
    Dataplane,
    /// In-process registry, nothing leaves the controller.
    Memory,
}

/// Registry connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub kind: RegistryKind,

    /// Data Plane API base URL.
    pub url: String,

    pub username: String,

    pub password: String,

    /// Backend whose servers are managed.
    pub backend: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Connection attempts at startup before giving up.
    pub startup_attempts: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            kind: RegistryKind::Dataplane,
            url: "http://127.0.0.1:5555".to_string(),
            username: "admin".to_string(),
            password: String::new(),
            backend: "sk-backend".to_string(),
            timeout_secs: 10,
            startup_attempts: 5,
        }
    }
}

/// How the load balancer is told to pick up committed changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadMode {
    /// Spawn HAProxy in master-worker mode and signal it.
    MasterWorker,
    /// Run an external reload command.
    Command,
    /// Registry reloads on commit; do nothing.
    None,
}

/// Load balancer process settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProcessConfig {
    pub mode: ReloadMode,

    /// HAProxy binary (master_worker mode).
    pub binary: String,

    /// HAProxy configuration file (master_worker mode).
    pub config_file: String,

    /// Program and arguments (command mode).
    pub reload_command: Vec<String>,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            mode: ReloadMode::MasterWorker,
            binary: "haproxy-stuff/bin/haproxy".to_string(),
            config_file: "haproxy-stuff/conf/haproxy.cfg".to_string(),
            reload_command: Vec::new(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
