//! The transport seam.
//!
//! A [`Connection`] is the handle a transport gives the core for one accepted
//! peer. The transport keeps ownership of the socket and of the inactivity
//! deadline; the core only enqueues probes and requests re-arms through it.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::TransportError;
use crate::ids::ConnectionId;

/// A live connection as seen by the liveness subsystem.
///
/// Implementations must not block: `send_probe` is an enqueue and
/// `arm_deadline` only records a new expiry.
#[cfg_attr(test, mockall::automock)]
pub trait Connection: Send + Sync {
    /// Stable identity, used as the registry key.
    fn id(&self) -> &ConnectionId;

    /// Enqueue a liveness probe. Fails if the connection is already gone.
    fn send_probe(&self) -> Result<(), TransportError>;

    /// Push the inactivity deadline out to `now + window`.
    ///
    /// Must never move an existing deadline earlier.
    fn arm_deadline(&self, window: Duration);
}

/// Why the transport closed a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseCause {
    /// No activity arrived before the deadline.
    DeadlineExpired,
    /// The peer closed the connection.
    PeerClosed,
    /// Reading from or writing to the socket failed.
    IoError,
    /// The server is shutting down.
    ServerShutdown,
}

impl CloseCause {
    /// Label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DeadlineExpired => "deadline_expired",
            Self::PeerClosed => "peer_closed",
            Self::IoError => "io_error",
            Self::ServerShutdown => "server_shutdown",
        }
    }
}

impl fmt::Display for CloseCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cause_labels_are_snake_case() {
        for cause in [
            CloseCause::DeadlineExpired,
            CloseCause::PeerClosed,
            CloseCause::IoError,
            CloseCause::ServerShutdown,
        ] {
            let label = cause.as_str();
            assert!(label.chars().all(|c| c.is_ascii_lowercase() || c == '_'));
            assert_eq!(cause.to_string(), label);
        }
    }

    #[test]
    fn cause_serializes_as_label() {
        let json = serde_json::to_string(&CloseCause::DeadlineExpired).unwrap();
        assert_eq!(json, r#""deadline_expired""#);
    }
}
