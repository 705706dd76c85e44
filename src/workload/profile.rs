use crate::config::{SimConfig, WorkloadMode};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Shared burst flag, toggled by the burst clock or an external caller
///
/// Lock-free so every generator worker can read it at the start of a
/// production tick without blocking, and a toggle becomes visible to all
/// workers on their next tick.
#[derive(Debug, Default)]
pub struct BurstState {
    active: AtomicBool,
}

impl BurstState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// Per-worker pacing math for steady and bursty traffic
///
/// The configured rate is engine-wide; each of the `worker_count` workers
/// paces at `worker_count / rate` seconds per item so the aggregate
/// spacing is `1/rate`. Inside a burst window the interval shrinks by
/// `burst_multiplier`.
#[derive(Debug, Clone)]
pub struct RateProfile {
    mode: WorkloadMode,
    base_interval: Duration,
    burst_multiplier: f64,
    burst: Arc<BurstState>,
}

impl RateProfile {
    pub fn from_config(config: &SimConfig, burst: Arc<BurstState>) -> Self {
        Self {
            mode: config.mode,
            base_interval: Duration::from_secs_f64(config.worker_count as f64 / config.rate),
            burst_multiplier: config.burst_multiplier.max(1.0),
            burst,
        }
    }

    pub fn mode(&self) -> WorkloadMode {
        self.mode
    }

    /// Inter-arrival interval for the tick starting now. Reads the burst
    /// flag once; the multiplier applies whenever the flag is set,
    /// whoever set it.
    pub fn tick_interval(&self) -> Duration {
        if self.burst.is_active() {
            Duration::from_secs_f64(self.base_interval.as_secs_f64() / self.burst_multiplier)
        } else {
            self.base_interval
        }
    }
}
