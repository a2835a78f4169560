//! Per-connection inactivity deadline.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::{self, Instant};

/// A read deadline owned by the transport.
///
/// The expiry only ever moves later. [`expired`](Self::expired) resolves once
/// the current expiry has passed without a further extension.
#[derive(Debug)]
pub struct Deadline {
    expiry: Mutex<Instant>,
}

impl Deadline {
    /// A deadline expiring `window` from now.
    pub fn new(window: Duration) -> Self {
        Self {
            expiry: Mutex::new(Instant::now() + window),
        }
    }

    /// Move the expiry to `max(current, now + window)`.
    pub fn extend(&self, window: Duration) {
        let next = Instant::now() + window;
        let mut expiry = self.expiry.lock();
        if next > *expiry {
            *expiry = next;
        }
    }

    /// Current expiry instant.
    pub fn expiry(&self) -> Instant {
        *self.expiry.lock()
    }

    /// Time left before expiry, zero if already passed.
    pub fn remaining(&self) -> Duration {
        self.expiry().saturating_duration_since(Instant::now())
    }

    /// Whether the expiry has passed.
    pub fn is_expired(&self) -> bool {
        self.expiry() <= Instant::now()
    }

    /// Wait until the deadline passes.
    ///
    /// Extensions made while waiting are honoured: the future re-checks the
    /// expiry after each sleep. Cancel-safe.
    pub async fn expired(&self) {
        loop {
            let at = self.expiry();
            time::sleep_until(at).await;
            if self.is_expired() {
                return;
            }
        }
    }
}
