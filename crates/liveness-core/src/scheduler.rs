//! Periodic liveness probing.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use metrics::{counter, gauge};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{SchedulerError, TransportError};
use crate::metrics::{
    LIVENESS_PROBE_FAILURES_TOTAL, LIVENESS_PROBED_CONNECTIONS, LIVENESS_PROBES_SENT_TOTAL,
    LIVENESS_SWEEPS_TOTAL,
};
use crate::policy::LivenessPolicy;
use crate::registry::ConnectionRegistry;

/// Scheduler lifecycle. `Stopped` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// Constructed, `run` not yet called.
    Idle,
    /// Inside `run`.
    Running,
    /// Stopped; `run` will not start again.
    Stopped,
}

/// Outcome of one sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Connections in the snapshot.
    pub probed: usize,
    /// Probes the transport refused.
    pub failed: usize,
}

/// Broadcasts a probe to every registered connection once per interval.
///
/// The scheduler never closes or unregisters anything. A probe that cannot be
/// enqueued is logged and counted; the connection's own close path cleans it
/// up once the transport notices.
pub struct LivenessScheduler {
    registry: Arc<ConnectionRegistry>,
    interval: Duration,
    state: Mutex<SchedulerState>,
    cancel: CancellationToken,
    sweeps: AtomicU64,
}

impl LivenessScheduler {
    /// Create a scheduler probing `registry` every `interval`.
    pub fn new(registry: Arc<ConnectionRegistry>, interval: Duration) -> Self {
        Self {
            registry,
            interval,
            state: Mutex::new(SchedulerState::Idle),
            cancel: CancellationToken::new(),
            sweeps: AtomicU64::new(0),
        }
    }

    /// Create a scheduler using the policy's probe interval.
    pub fn from_policy(registry: Arc<ConnectionRegistry>, policy: &LivenessPolicy) -> Self {
        Self::new(registry, policy.probe_interval())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SchedulerState {
        *self.state.lock()
    }

    /// Sweeps completed so far.
    pub fn sweeps(&self) -> u64 {
        self.sweeps.load(Ordering::Relaxed)
    }

    /// Probe interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run sweeps until [`stop`](Self::stop) is called.
    ///
    /// The first sweep happens one full interval after the call. Returns the
    /// number of sweeps performed by this run.
    pub async fn run(&self) -> Result<u64, SchedulerError> {
        {
            let mut state = self.state.lock();
            match *state {
                SchedulerState::Idle => *state = SchedulerState::Running,
                SchedulerState::Running => return Err(SchedulerError::AlreadyRunning),
                SchedulerState::Stopped => return Err(SchedulerError::Stopped),
            }
        }

        info!(
            interval_ms = self.interval.as_millis() as u64,
            "liveness scheduler started"
        );

        let mut ticker = time::interval_at(time::Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut performed: u64 = 0;

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    // No await inside a sweep, so stop is only seen between sweeps.
                    let _ = self.sweep();
                    performed += 1;
                }
            }
        }

        *self.state.lock() = SchedulerState::Stopped;
        info!(sweeps = performed, "liveness scheduler stopped");
        Ok(performed)
    }

    /// Signal `run` to return. Returns `false` if a stop was already requested.
    ///
    /// Calling this before `run` moves the scheduler straight to `Stopped`.
    pub fn stop(&self) -> bool {
        let mut state = self.state.lock();
        if self.cancel.is_cancelled() {
            debug!("liveness scheduler stop requested twice, ignoring");
            return false;
        }
        self.cancel.cancel();
        if *state == SchedulerState::Idle {
            *state = SchedulerState::Stopped;
        }
        true
    }

    /// Probe every connection in a fresh registry snapshot.
    ///
    /// Failures are isolated per connection; every member of the snapshot is
    /// attempted regardless of earlier errors.
    pub fn sweep(&self) -> SweepReport {
        let snapshot = self.registry.snapshot();
        let mut report = SweepReport {
            probed: snapshot.len(),
            failed: 0,
        };

        for conn in &snapshot {
            if let Err(e) = conn.send_probe() {
                report.failed += 1;
                let reason = match e {
                    TransportError::Closed => "closed",
                    TransportError::QueueFull => "queue_full",
                };
                counter!(LIVENESS_PROBE_FAILURES_TOTAL, "reason" => reason).increment(1);
                warn!(conn_id = %conn.id(), error = %e, "failed to send probe");
            }
        }

        let _ = self.sweeps.fetch_add(1, Ordering::Relaxed);
        counter!(LIVENESS_SWEEPS_TOTAL).increment(1);
        counter!(LIVENESS_PROBES_SENT_TOTAL).increment((report.probed - report.failed) as u64);
        gauge!(LIVENESS_PROBED_CONNECTIONS).set(report.probed as f64);
        debug!(
            probed = report.probed,
            failed = report.failed,
            "keepalive sweep"
        );
        report
    }
}
