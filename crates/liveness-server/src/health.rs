//! `/health` endpoint.

use std::time::Instant;

use chrono::{DateTime, Utc};
use liveness_core::SchedulerState;
use serde::Serialize;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `"ok"` while the probe scheduler runs, `"degraded"` otherwise.
    pub status: &'static str,
    /// When the server was created.
    pub started_at: DateTime<Utc>,
    /// Seconds since the server was created.
    pub uptime_secs: u64,
    /// Registered connections.
    pub connections: usize,
    /// Probe scheduler state.
    pub scheduler: SchedulerState,
    /// Sweeps completed so far.
    pub sweeps: u64,
}

/// Build a health response from live counters.
pub fn health_check(
    started_at: DateTime<Utc>,
    start_time: Instant,
    connections: usize,
    scheduler: SchedulerState,
    sweeps: u64,
) -> HealthResponse {
    HealthResponse {
        status: if scheduler == SchedulerState::Running {
            "ok"
        } else {
            "degraded"
        },
        started_at,
        uptime_secs: start_time.elapsed().as_secs(),
        connections,
        scheduler,
        sweeps,
    }
}
