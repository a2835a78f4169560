//! Settings types. Serialized as `camelCase` JSON; every field has a default.

use std::time::Duration;

use liveness_core::LivenessPolicy;
use serde::{Deserialize, Serialize};

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LivenessSettings {
    /// Listener and connection limits.
    pub server: ServerSettings,
    /// Probe and deadline timings.
    pub keepalive: KeepaliveSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

/// Listener and connection limits.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port (`0` picks a free port).
    pub port: u16,
    /// Connections beyond this are refused at upgrade time.
    pub max_connections: usize,
    /// Largest inbound WebSocket message accepted, in bytes.
    pub max_message_size: usize,
    /// Outbound frames buffered per connection before sends fail.
    pub send_queue_capacity: usize,
    /// How long shutdown waits for tasks before giving up.
    pub shutdown_timeout_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8888,
            max_connections: 10_000,
            max_message_size: 16 * 1024 * 1024,
            send_queue_capacity: 256,
            shutdown_timeout_ms: 5_000,
        }
    }
}

/// Probe and deadline timings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeepaliveSettings {
    /// Time between probe sweeps, in milliseconds.
    pub probe_interval_ms: u64,
    /// Inactivity window before a connection is closed, in milliseconds.
    pub deadline_ms: u64,
}

impl Default for KeepaliveSettings {
    fn default() -> Self {
        let policy = LivenessPolicy::default();
        Self {
            probe_interval_ms: policy.probe_interval().as_millis() as u64,
            deadline_ms: policy.deadline().as_millis() as u64,
        }
    }
}

impl KeepaliveSettings {
    /// Validate into a [`LivenessPolicy`].
    pub fn policy(&self) -> crate::Result<LivenessPolicy> {
        Ok(LivenessPolicy::new(
            Duration::from_millis(self.probe_interval_ms),
            Duration::from_millis(self.deadline_ms),
        )?)
    }
}

/// Log output.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive, e.g. `"info"` or `"liveness_core=debug"`.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
