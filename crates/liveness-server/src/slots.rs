//! Connection limit enforced before the upgrade.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts sessions against a fixed limit.
///
/// A slot is reserved atomically at upgrade time and released when its
/// [`SlotGuard`] drops, so concurrent upgrades cannot overshoot the limit.
#[derive(Debug)]
pub struct ConnectionSlots {
    limit: usize,
    used: Arc<AtomicUsize>,
}

/// A reserved slot. Dropping it frees the slot.
#[derive(Debug)]
pub struct SlotGuard {
    used: Arc<AtomicUsize>,
}

impl ConnectionSlots {
    /// Allow at most `limit` concurrent sessions.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            used: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Reserve a slot, or `None` at the limit.
    pub fn try_acquire(&self) -> Option<SlotGuard> {
        self.used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.limit).then_some(n + 1)
            })
            .ok()
            .map(|_| SlotGuard {
                used: self.used.clone(),
            })
    }

    /// Slots currently held.
    pub fn in_use(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }

    /// Configured limit.
    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let _ = self.used.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_up_to_limit() {
        let slots = ConnectionSlots::new(2);
        let a = slots.try_acquire();
        let b = slots.try_acquire();
        assert!(a.is_some() && b.is_some());
        assert!(slots.try_acquire().is_none());
        assert_eq!(slots.in_use(), 2);

        drop(a);
        assert_eq!(slots.in_use(), 1);
        assert!(slots.try_acquire().is_some());
    }

    #[test]
    fn zero_limit_refuses_everything() {
        let slots = ConnectionSlots::new(0);
        assert!(slots.try_acquire().is_none());
        assert_eq!(slots.in_use(), 0);
    }

    #[test]
    fn concurrent_acquires_never_exceed_limit() {
        let slots = Arc::new(ConnectionSlots::new(10));
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let slots = slots.clone();
                std::thread::spawn(move || {
                    (0..100)
                        .filter_map(|_| slots.try_acquire())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let held: Vec<SlotGuard> = threads
            .into_iter()
            .flat_map(|t| t.join().unwrap())
            .collect();
        assert_eq!(held.len(), 10);
        assert_eq!(slots.in_use(), 10);

        drop(held);
        assert_eq!(slots.in_use(), 0);
    }
}
