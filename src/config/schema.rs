//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the reverse proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener and route definitions.
    pub server: ServerConfig,

    /// Timeout configuration for the forwarding client.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener and route configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port (e.g. "8080") or full bind address (e.g. "127.0.0.1:8080").
    pub listen: String,

    /// Path definitions, registered in order.
    pub paths: Vec<PathConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "8080".to_string(),
            paths: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Address to bind. A bare port listens on all interfaces.
    pub fn bind_address(&self) -> String {
        let listen = self.listen.trim();
        let port = listen.strip_prefix(':').unwrap_or(listen);
        if port.parse::<u16>().is_ok() {
            format!("0.0.0.0:{}", port)
        } else {
            listen.to_string()
        }
    }
}

/// A URL path the proxy forwards, with its admission policy.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct PathConfig {
    /// Path pattern. A trailing `/` matches the whole subtree,
    /// otherwise only the exact path matches.
    pub location: String,

    /// Upstream base URL.
    pub target: String,

    /// Maximum concurrent requests forwarded to the target.
    pub connection_limit: usize,

    /// Reject requests over the limit with 503 instead of queueing them.
    #[serde(default)]
    pub drop_over_limit: bool,
}

/// Timeout configuration for the forwarding client.
///
/// None of these bound the time a request spends queued for admission.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds (0 = none).
    pub connect_secs: u64,

    /// Deadline for the upstream response headers in seconds (0 = none).
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 0,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
