//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.
//! Durations are expressed in milliseconds, sizes in bytes.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::http::FieldLimits;

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Client-facing listener.
    pub proxy: ListenerConfig,

    /// Upstream target every connection is relayed to.
    pub target: TargetConfig,

    /// Header limits and receive timeouts per direction.
    pub http: HttpConfig,

    /// Connection handler supervision.
    pub connection_handlers: ConnectionHandlersConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub bind_host: String,

    /// Port clients connect to.
    pub port: u16,

    /// Maximum concurrent connection handlers (backpressure).
    pub max_connections: usize,
}

impl ListenerConfig {
    /// The `host:port` string the listener binds to.
    pub fn bind_address(&self) -> String {
        if self.bind_host.contains(':') {
            format!("[{}]:{}", self.bind_host, self.port)
        } else {
            format!("{}:{}", self.bind_host, self.port)
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 8080,
            max_connections: 10_000,
        }
    }
}

/// Upstream target configuration.
///
/// `address` and `port` have no meaningful default; validation rejects
/// a configuration that leaves them unset.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Hostname or IP address of the target.
    pub address: String,

    /// Target port.
    pub port: u16,

    /// Connection establishment timeout in milliseconds.
    pub connect_timeout_ms: u64,
}

impl TargetConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            port: 0,
            connect_timeout_ms: 15_000,
        }
    }
}

/// HTTP header handling, one section per direction.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HttpConfig {
    pub request: RequestHeaderConfig,
    pub response: ResponseHeaderConfig,
}

/// Limits applied to request headers received from clients.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestHeaderConfig {
    /// Wall-clock bound for receiving the complete header, in milliseconds.
    pub receive_timeout_ms: u64,

    /// Maximum size of the request line in bytes.
    pub request_line_size_limit: usize,

    /// Maximum number of header fields.
    pub fields_limit: usize,

    /// Maximum size of a single header field in bytes.
    pub field_size_limit: usize,
}

impl RequestHeaderConfig {
    pub fn limits(&self) -> FieldLimits {
        FieldLimits {
            start_line_size_limit: self.request_line_size_limit,
            fields_limit: self.fields_limit,
            field_size_limit: self.field_size_limit,
            receive_timeout: Duration::from_millis(self.receive_timeout_ms),
        }
    }
}

impl Default for RequestHeaderConfig {
    fn default() -> Self {
        Self {
            receive_timeout_ms: 60_000,
            request_line_size_limit: 8 * 1024,
            fields_limit: 100,
            field_size_limit: 8 * 1024,
        }
    }
}

/// Limits applied to response headers received from the target.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResponseHeaderConfig {
    /// Wall-clock bound for receiving the complete header, in milliseconds.
    pub receive_timeout_ms: u64,

    /// Maximum size of the status line in bytes.
    pub status_line_size_limit: usize,

    /// Maximum number of header fields.
    pub fields_limit: usize,

    /// Maximum size of a single header field in bytes.
    pub field_size_limit: usize,
}

impl ResponseHeaderConfig {
    pub fn limits(&self) -> FieldLimits {
        FieldLimits {
            start_line_size_limit: self.status_line_size_limit,
            fields_limit: self.fields_limit,
            field_size_limit: self.field_size_limit,
            receive_timeout: Duration::from_millis(self.receive_timeout_ms),
        }
    }
}

impl Default for ResponseHeaderConfig {
    fn default() -> Self {
        Self {
            receive_timeout_ms: 90_000,
            status_line_size_limit: 8 * 1024,
            fields_limit: 100,
            field_size_limit: 8 * 1024,
        }
    }
}

/// Supervision of running connection handlers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionHandlersConfig {
    /// Interval between active handler log lines in milliseconds (0 disables).
    pub log_interval_ms: u64,

    /// Time granted to handlers to finish during shutdown, in milliseconds.
    pub termination_timeout_ms: u64,
}

impl ConnectionHandlersConfig {
    pub fn log_interval(&self) -> Duration {
        Duration::from_millis(self.log_interval_ms)
    }

    pub fn termination_timeout(&self) -> Duration {
        Duration::from_millis(self.termination_timeout_ms)
    }
}

impl Default for ConnectionHandlersConfig {
    fn default() -> Self {
        Self {
            log_interval_ms: 60_000,
            termination_timeout_ms: 30_000,
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
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
