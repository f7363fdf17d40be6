//! Configuration for the execution queue.
//!
//! Typed serde structs with per-field defaults. The binary applies
//! environment-variable overrides on top of the defaults.

use serde::{Deserialize, Serialize};

/// Worker loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Polling interval between cycles (milliseconds).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Ceiling on how long `drain` waits for an in-flight cycle (seconds).
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            drain_timeout_secs: default_drain_timeout_secs(),
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Default attempt ceiling for items that do not specify one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Whether to start the Prometheus exporter.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
    /// Port for the Prometheus scrape endpoint.
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: default_metrics_enabled(),
            metrics_port: default_metrics_port(),
        }
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Worker loop configuration.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Retry configuration.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

const fn default_poll_interval_ms() -> u64 {
    5_000
}

const fn default_drain_timeout_secs() -> u64 {
    30
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_metrics_enabled() -> bool {
    true
}

const fn default_metrics_port() -> u16 {
    9464
}
