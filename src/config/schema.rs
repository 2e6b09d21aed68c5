//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the forwarding proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Request/response relay limits.
    pub relay: RelayConfig,

    /// Concurrency strategy and its knobs.
    pub dispatch: DispatchConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host or IP to bind (e.g., "0.0.0.0").
    pub bind_host: String,

    /// TCP port to listen on. The command line always overrides this.
    pub port: u16,

    /// Maximum concurrent connections (backpressure) for the
    /// thread, task and process strategies.
    pub max_connections: usize,
}

impl ListenerConfig {
    /// `host:port` string suitable for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
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

/// Limits applied while reading requests and relaying responses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Longest accepted line (request line, header line, URI authority).
    pub max_line_length: usize,

    /// Size of a single body relay chunk.
    pub chunk_size: usize,

    /// Optional upstream connect timeout. Unset means no timeout.
    pub connect_timeout_ms: Option<u64>,
}

impl RelayConfig {
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_line_length: 8192,
            chunk_size: 8192,
            connect_timeout_ms: None,
        }
    }
}

/// How accepted connections are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// One worker process per connection.
    Process,
    /// One detached OS thread per connection.
    Thread,
    /// One runtime task per connection.
    Task,
    /// A single readiness loop serving ready clients one at a time.
    Multiplexed,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Strategy::Process => "process",
            Strategy::Thread => "thread",
            Strategy::Task => "task",
            Strategy::Multiplexed => "multiplexed",
        };
        f.write_str(name)
    }
}

/// Dispatcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Concurrency strategy, fixed for the lifetime of the process.
    pub strategy: Strategy,

    /// Registry size for the multiplexed strategy.
    pub max_clients: usize,

    /// How long to wait for live connections after shutdown is requested.
    pub drain_timeout_secs: u64,

    /// Worker executable for the process strategy.
    /// Defaults to `relay-worker` next to the running executable.
    pub worker_program: Option<PathBuf>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Thread,
            max_clients: 1024,
            drain_timeout_secs: 10,
            worker_program: None,
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
