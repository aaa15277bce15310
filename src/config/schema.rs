//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the balancer.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the load balancer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BalancerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Ordered list of backend base URLs. Selection tie-breaks resolve to the
    /// earliest entry, so the order here is part of the routing behavior.
    pub servers: Vec<String>,

    /// Health check settings.
    pub health_check: HealthCheckConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable active health checks.
    pub enabled: bool,

    /// Interval between probes of one backend, as a duration string ("10s").
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    /// Per-probe timeout. Must be strictly shorter than the interval.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Path to probe. The base address ("/") unless the backends expose a
    /// dedicated health endpoint.
    pub path: String,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(2),
            path: "/".to_string(),
        }
    }
}

/// Timeout configuration for the forwarding path.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Idle upstream connection timeout in seconds.
    pub idle_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
            idle_secs: 60,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let raw = r#"
            servers = ["http://127.0.0.1:3001", "http://127.0.0.1:3002"]

            [listener]
            bind_address = "127.0.0.1:8080"

            [health_check]
            interval = "15s"
            timeout = "500ms"
            path = "/healthz"

            [timeouts]
            request_secs = 10
        "#;

        let config: BalancerConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:8080");
        assert_eq!(config.servers.len(), 2);
        assert_eq!(config.health_check.interval, Duration::from_secs(15));
        assert_eq!(config.health_check.timeout, Duration::from_millis(500));
        assert_eq!(config.health_check.path, "/healthz");
        assert_eq!(config.timeouts.request_secs, 10);
        // Untouched sections keep their defaults.
        assert_eq!(config.timeouts.connect_secs, 5);
        assert!(config.health_check.enabled);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: BalancerConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert!(config.servers.is_empty());
        assert_eq!(config.health_check.interval, Duration::from_secs(10));
        assert_eq!(config.observability.log_level, "info");
    }
}
