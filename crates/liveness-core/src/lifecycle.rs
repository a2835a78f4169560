//! Deadline protocol applied at each connection's touch points.
//!
//! | Event | Effect |
//! |---|---|
//! | handshake complete | arm deadline, register |
//! | inbound message | re-arm |
//! | probe ack | re-arm |
//! | transport close | unregister |
//!
//! Re-arming always asks the transport for `now + deadline`. There is no
//! probe/ack correlation: any inbound traffic counts as proof of life.

use std::sync::Arc;

use metrics::{counter, gauge};
use tracing::{debug, info};

use crate::connection::{CloseCause, Connection};
use crate::ids::ConnectionId;
use crate::metrics::{
    LIVENESS_EVICTIONS_TOTAL, LIVENESS_REARMS_TOTAL, LIVENESS_REGISTERED_CONNECTIONS,
};
use crate::policy::LivenessPolicy;
use crate::registry::ConnectionRegistry;

/// Ties transport events to the registry and the deadline policy.
#[derive(Clone)]
pub struct ConnectionLifecycle {
    registry: Arc<ConnectionRegistry>,
    policy: LivenessPolicy,
}

impl ConnectionLifecycle {
    /// Create a lifecycle over a shared registry.
    pub fn new(registry: Arc<ConnectionRegistry>, policy: LivenessPolicy) -> Self {
        Self { registry, policy }
    }

    /// The registry this lifecycle maintains.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Active policy.
    pub fn policy(&self) -> &LivenessPolicy {
        &self.policy
    }

    /// Handshake completed: arm the first deadline and register.
    ///
    /// The deadline is armed before the connection becomes visible to a
    /// sweep, so every registered connection has one.
    pub fn on_open(&self, connection: Arc<dyn Connection>) {
        connection.arm_deadline(self.policy.deadline());
        let id = connection.id().clone();
        let _ = self.registry.add(connection);
        gauge!(LIVENESS_REGISTERED_CONNECTIONS).set(self.registry.len() as f64);
        info!(conn_id = %id, deadline_ms = self.policy.deadline().as_millis() as u64, "connection opened");
    }

    /// Inbound application message.
    pub fn on_activity(&self, connection: &dyn Connection) {
        self.rearm(connection, "activity");
    }

    /// Inbound probe acknowledgement.
    pub fn on_probe_ack(&self, connection: &dyn Connection) {
        self.rearm(connection, "probe_ack");
    }

    /// Transport closed the connection. Returns `true` if it was registered.
    ///
    /// Duplicate notifications are ignored.
    pub fn on_close(&self, id: &ConnectionId, cause: CloseCause) -> bool {
        if self.registry.remove(id).is_none() {
            debug!(conn_id = %id, %cause, "close reported for unregistered connection");
            return false;
        }
        counter!(LIVENESS_EVICTIONS_TOTAL, "cause" => cause.as_str()).increment(1);
        gauge!(LIVENESS_REGISTERED_CONNECTIONS).set(self.registry.len() as f64);
        info!(conn_id = %id, %cause, "connection closed");
        true
    }

    fn rearm(&self, connection: &dyn Connection, source: &'static str) {
        connection.arm_deadline(self.policy.deadline());
        counter!(LIVENESS_REARMS_TOTAL, "source" => source).increment(1);
    }
}
