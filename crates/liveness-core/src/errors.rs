//! Error types for the liveness subsystem.
//!
//! None of these surface to a remote peer. A dead connection is reported only
//! through its eventual close.

use std::time::Duration;

use thiserror::Error;

/// Failure to hand an outbound frame to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The connection's writer has gone away.
    #[error("connection closed")]
    Closed,
    /// The outbound queue is full.
    #[error("outbound queue full")]
    QueueFull,
}

/// Misuse of a [`LivenessScheduler`](crate::LivenessScheduler).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// `run` was called while another `run` is in progress.
    #[error("scheduler is already running")]
    AlreadyRunning,
    /// `run` was called after the scheduler stopped. Build a new one instead.
    #[error("scheduler has been stopped")]
    Stopped,
}

/// Invalid liveness configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LivenessError {
    /// A duration was zero.
    #[error("{name} must be positive")]
    ZeroDuration {
        /// Which setting was zero.
        name: &'static str,
    },
    /// The deadline leaves no room for a probe round-trip.
    #[error("deadline ({deadline:?}) must be greater than probe interval ({probe_interval:?})")]
    DeadlineTooShort {
        /// Configured probe interval.
        probe_interval: Duration,
        /// Configured deadline.
        deadline: Duration,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_display() {
        assert_eq!(TransportError::Closed.to_string(), "connection closed");
        assert_eq!(TransportError::QueueFull.to_string(), "outbound queue full");
    }

    #[test]
    fn scheduler_error_display() {
        assert!(SchedulerError::Stopped.to_string().contains("stopped"));
        assert!(SchedulerError::AlreadyRunning.to_string().contains("running"));
    }

    #[test]
    fn deadline_too_short_mentions_both_values() {
        let err = LivenessError::DeadlineTooShort {
            probe_interval: Duration::from_secs(5),
            deadline: Duration::from_secs(5),
        };
        let msg = err.to_string();
        assert!(msg.contains("deadline"));
        assert!(msg.contains("5s"));
    }

    #[test]
    fn zero_duration_names_setting() {
        let err = LivenessError::ZeroDuration {
            name: "probe_interval",
        };
        assert_eq!(err.to_string(), "probe_interval must be positive");
    }
}
