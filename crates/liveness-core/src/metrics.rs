//! Metric names emitted by the liveness subsystem.

/// Completed probe sweeps (counter).
pub const LIVENESS_SWEEPS_TOTAL: &str = "liveness_sweeps_total";
/// Probes handed to the transport (counter).
pub const LIVENESS_PROBES_SENT_TOTAL: &str = "liveness_probes_sent_total";
/// Probes the transport refused (counter, labels: reason).
pub const LIVENESS_PROBE_FAILURES_TOTAL: &str = "liveness_probe_failures_total";
/// Connections covered by the latest sweep (gauge).
pub const LIVENESS_PROBED_CONNECTIONS: &str = "liveness_probed_connections";
/// Deadline re-arms (counter, labels: source).
pub const LIVENESS_REARMS_TOTAL: &str = "liveness_rearms_total";
/// Connections removed from the registry (counter, labels: cause).
pub const LIVENESS_EVICTIONS_TOTAL: &str = "liveness_evictions_total";
/// Registered connections (gauge).
pub const LIVENESS_REGISTERED_CONNECTIONS: &str = "liveness_registered_connections";
