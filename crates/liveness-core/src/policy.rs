//! Probe interval and inactivity deadline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::LivenessError;

/// Default time between probe sweeps.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(5);

/// Slack added on top of the probe interval for the default deadline.
pub const DEFAULT_DEADLINE_SLACK: Duration = Duration::from_secs(3);

/// How often connections are probed and how long they may stay silent.
///
/// `deadline` is always strictly greater than `probe_interval`, so at least
/// one probe round-trip fits inside the window before a connection expires.
/// Deserialization goes through [`LivenessPolicy::new`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPolicy")]
pub struct LivenessPolicy {
    probe_interval: Duration,
    deadline: Duration,
}

#[derive(Deserialize)]
struct RawPolicy {
    probe_interval: Duration,
    deadline: Duration,
}

impl TryFrom<RawPolicy> for LivenessPolicy {
    type Error = LivenessError;

    fn try_from(raw: RawPolicy) -> Result<Self, Self::Error> {
        Self::new(raw.probe_interval, raw.deadline)
    }
}

impl LivenessPolicy {
    /// Build a validated policy.
    pub fn new(probe_interval: Duration, deadline: Duration) -> Result<Self, LivenessError> {
        if probe_interval.is_zero() {
            return Err(LivenessError::ZeroDuration {
                name: "probe_interval",
            });
        }
        if deadline.is_zero() {
            return Err(LivenessError::ZeroDuration { name: "deadline" });
        }
        if deadline <= probe_interval {
            return Err(LivenessError::DeadlineTooShort {
                probe_interval,
                deadline,
            });
        }
        Ok(Self {
            probe_interval,
            deadline,
        })
    }

    /// Build a policy whose deadline is `probe_interval + slack`.
    pub fn with_slack(probe_interval: Duration, slack: Duration) -> Result<Self, LivenessError> {
        Self::new(probe_interval, probe_interval.saturating_add(slack))
    }

    /// Time between probe sweeps.
    pub fn probe_interval(&self) -> Duration {
        self.probe_interval
    }

    /// Inactivity window after which a connection is presumed dead.
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Worst-case time between a peer going silent and its removal.
    pub fn detection_bound(&self) -> Duration {
        self.deadline.saturating_add(self.probe_interval)
    }

    /// Whether one lost probe (or ack) can be absorbed without eviction.
    pub fn tolerates_lost_probe(&self) -> bool {
        self.deadline >= self.probe_interval.saturating_mul(2)
    }
}

impl Default for LivenessPolicy {
    fn default() -> Self {
        Self {
            probe_interval: DEFAULT_PROBE_INTERVAL,
            deadline: DEFAULT_PROBE_INTERVAL + DEFAULT_DEADLINE_SLACK,
        }
    }
}
