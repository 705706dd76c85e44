use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Thread-safe counters for the whole engine
///
/// Cumulative counters only ever accumulate; the interval maximum latency
/// resets each time a snapshot is taken. The `active` gauge is shared with
/// the admission gate, which is the only component that mutates it.
#[derive(Debug, Default)]
pub struct MetricsAggregator {
    created: AtomicU64,
    completed: AtomicU64,
    rejected: AtomicU64,
    evicted: AtomicU64,
    active: Arc<AtomicUsize>,
    max_latency_us: AtomicU64,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_created(&self) {
        self.created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evicted(&self, count: u64) {
        self.evicted.fetch_add(count, Ordering::Relaxed);
    }

    /// Record one end-to-end item latency; the snapshot reports the
    /// interval maximum.
    pub fn record_latency(&self, latency: Duration) {
        let us = latency.as_micros().min(u64::MAX as u128) as u64;
        self.max_latency_us.fetch_max(us, Ordering::Relaxed);
    }

    /// Slot gauge shared with the admission gate. The gate reserves and
    /// releases slots on this cell; everything else only reads it.
    pub(crate) fn active_slots(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.active)
    }

    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Capture a point-in-time snapshot.
    ///
    /// Cumulative counters are pure reads; the interval maximum latency is
    /// swapped back to zero (get-and-reset), so the interval metric is
    /// only meaningful to a single snapshotting owner. A second caller
    /// drains the owner's interval; passive observers should read the
    /// owner's published copy instead. Reads are lock-free, so a snapshot
    /// taken under concurrent mutation is consistent to within one
    /// scheduling tick.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            taken_at: Utc::now(),
            created: self.created.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            active: self.active.load(Ordering::SeqCst),
            max_latency_us: self.max_latency_us.swap(0, Ordering::Relaxed),
        }
    }
}

/// Immutable point-in-time view of the engine counters
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub taken_at: DateTime<Utc>,
    pub created: u64,
    pub completed: u64,
    pub rejected: u64,
    pub evicted: u64,
    pub active: usize,
    /// Maximum item latency observed since the previous snapshot.
    pub max_latency_us: u64,
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "created {} completed {} rejected {} evicted {} active {} max_latency_us {}",
            self.created,
            self.completed,
            self.rejected,
            self.evicted,
            self.active,
            self.max_latency_us
        )
    }
}
