//! Server configuration.

use std::time::Duration;

use liveness_settings::ServerSettings;

/// Runtime configuration for [`LivenessServer`](crate::LivenessServer).
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind (`0` for auto-assign).
    pub port: u16,
    /// Upgrades beyond this many live connections are refused with `503`.
    pub max_connections: usize,
    /// Max inbound `WebSocket` message size in bytes.
    pub max_message_size: usize,
    /// Per-connection outbound queue depth.
    pub send_queue_capacity: usize,
    /// Upper bound on graceful shutdown.
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            max_connections: 10_000,
            max_message_size: 16 * 1024 * 1024,
            send_queue_capacity: 256,
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    /// `host:port` as passed to the listener; hostnames are resolved at bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl From<&ServerSettings> for ServerConfig {
    fn from(s: &ServerSettings) -> Self {
        Self {
            host: s.host.clone(),
            port: s.port,
            max_connections: s.max_connections,
            max_message_size: s.max_message_size,
            send_queue_capacity: s.send_queue_capacity.max(1),
            shutdown_timeout: Duration::from_millis(s.shutdown_timeout_ms),
        }
    }
}
