use crate::metrics::MetricsAggregator;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Outcome of an admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A slot was reserved; the caller must release it at retirement.
    Accepted,
    /// The active set is at capacity. Expected under load, never retried
    /// for the same item.
    RejectedBackpressure,
}

/// Admission control against the active-item ceiling
///
/// Rejection-based, non-blocking backpressure: once the active working set
/// reaches `max_active`, new retained items are shed instead of queued.
/// The slot counter is the metrics aggregator's `active` gauge, so the
/// admission decision and the reported active count can never diverge.
#[derive(Debug)]
pub struct AdmissionGate {
    max_active: usize,
    slots: Arc<AtomicUsize>,
}

impl AdmissionGate {
    pub fn new(max_active: usize, metrics: &MetricsAggregator) -> Self {
        Self {
            max_active,
            slots: metrics.active_slots(),
        }
    }

    /// Try to reserve one active slot.
    ///
    /// The check and the reservation are a single atomic update: a caller
    /// that sees `Accepted` is guaranteed a slot was available at decision
    /// time.
    pub fn try_admit(&self) -> Admission {
        let reserved = self
            .slots
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |active| {
                if active >= self.max_active {
                    None
                } else {
                    Some(active + 1)
                }
            });

        match reserved {
            Ok(_) => Admission::Accepted,
            Err(_) => Admission::RejectedBackpressure,
        }
    }

    /// Release a previously reserved slot at item retirement.
    pub fn release(&self) {
        // Saturating: a release with no matching reservation is a bug
        // elsewhere, but must not wrap the gauge.
        let _ = self
            .slots
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |active| {
                active.checked_sub(1)
            });
    }

    pub fn in_flight(&self) -> usize {
        self.slots.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active
    }
}
