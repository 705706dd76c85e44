use crate::core::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Shape of the generated traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkloadMode {
    /// Fixed target rate with `1/rate` inter-arrival spacing.
    Steady,
    /// Baseline rate with periodic burst windows at `rate * burst_multiplier`.
    Bursty,
}

/// Simulation engine configuration
///
/// Built with chained setters, checked once with [`SimConfig::validate`]
/// before the engine starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Traffic shape
    pub mode: WorkloadMode,

    /// Engine-wide target rate, items per second, split across workers
    pub rate: f64,

    /// Rate multiplier inside a burst window
    pub burst_multiplier: f64,

    /// Length of each burst window
    pub burst_duration: Duration,

    /// Period between burst window starts
    pub burst_interval: Duration,

    /// Probability a generated item is retained
    pub retained_probability: f64,

    /// Probability a production tick fails with an injected transient
    /// fault, for resilience testing
    pub failure_probability: f64,

    /// Admission ceiling for the active working set
    pub max_active: usize,

    /// Bounded cache capacity
    pub cache_capacity: usize,

    /// Maximum evictions per batched drain pass
    pub eviction_batch_size: usize,

    /// Retained-item lifetime until expiry
    pub item_lifetime: Duration,

    /// Completed-log history bound
    pub completed_log_capacity: usize,

    /// Number of generator workers
    pub worker_count: usize,

    /// Default bound for cooperative shutdown
    pub shutdown_timeout: Duration,

    /// Expiry sweeper tick period
    pub sweep_interval: Duration,

    /// Maximum retirements per sweeper tick
    pub sweep_batch: usize,

    /// Metrics reporter period
    pub snapshot_interval: Duration,

    /// Payload size draw bounds, bytes
    pub payload_min: usize,
    pub payload_max: usize,

    /// Catalog entries built at startup
    pub catalog_size: usize,

    /// Base RNG seed; each worker derives its own stream from it
    pub seed: u64,

    /// Optional per-worker item budget; workers exit once it is spent
    pub items_per_worker: Option<u64>,
}

impl SimConfig {
    pub fn new() -> Self {
        Self {
            mode: WorkloadMode::Steady,
            rate: 200.0,
            burst_multiplier: 4.0,
            burst_duration: Duration::from_secs(2),
            burst_interval: Duration::from_secs(10),
            retained_probability: 0.25,
            failure_probability: 0.0,
            max_active: 5_000,
            cache_capacity: 10_000,
            eviction_batch_size: 64,
            item_lifetime: Duration::from_secs(5),
            completed_log_capacity: 1_000,
            worker_count: 4,
            shutdown_timeout: Duration::from_secs(5),
            sweep_interval: Duration::from_millis(100),
            sweep_batch: 256,
            snapshot_interval: Duration::from_secs(1),
            payload_min: 256,
            payload_max: 4_096,
            catalog_size: 128,
            seed: 0xC0FFEE,
            items_per_worker: None,
        }
    }

    /// Set the traffic shape
    pub fn mode(mut self, mode: WorkloadMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the engine-wide target rate (items/second)
    pub fn rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    /// Set the burst rate multiplier
    pub fn burst_multiplier(mut self, multiplier: f64) -> Self {
        self.burst_multiplier = multiplier;
        self
    }

    /// Set the burst window length
    pub fn burst_duration(mut self, duration: Duration) -> Self {
        self.burst_duration = duration;
        self
    }

    /// Set the period between burst windows
    pub fn burst_interval(mut self, interval: Duration) -> Self {
        self.burst_interval = interval;
        self
    }

    /// Set the probability a generated item is retained
    pub fn retained_probability(mut self, p: f64) -> Self {
        self.retained_probability = p;
        self
    }

    /// Set the injected transient-fault probability
    pub fn failure_probability(mut self, p: f64) -> Self {
        self.failure_probability = p;
        self
    }

    /// Set the admission ceiling
    pub fn max_active(mut self, max: usize) -> Self {
        self.max_active = max;
        self
    }

    /// Set the bounded cache capacity
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Set the eviction batch size
    pub fn eviction_batch_size(mut self, batch: usize) -> Self {
        self.eviction_batch_size = batch;
        self
    }

    /// Set the retained-item lifetime
    pub fn item_lifetime(mut self, lifetime: Duration) -> Self {
        self.item_lifetime = lifetime;
        self
    }

    /// Set the completed-log capacity
    pub fn completed_log_capacity(mut self, capacity: usize) -> Self {
        self.completed_log_capacity = capacity;
        self
    }

    /// Set the number of generator workers
    pub fn worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    /// Set the default shutdown timeout
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set the sweeper tick period
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Set the per-tick retirement bound
    pub fn sweep_batch(mut self, batch: usize) -> Self {
        self.sweep_batch = batch;
        self
    }

    /// Set the metrics reporter period
    pub fn snapshot_interval(mut self, interval: Duration) -> Self {
        self.snapshot_interval = interval;
        self
    }

    /// Set the payload size draw bounds
    pub fn payload_range(mut self, min: usize, max: usize) -> Self {
        self.payload_min = min;
        self.payload_max = max;
        self
    }

    /// Set the startup catalog size
    pub fn catalog_size(mut self, size: usize) -> Self {
        self.catalog_size = size;
        self
    }

    /// Set the base RNG seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Cap each worker at a fixed number of produced items
    pub fn items_per_worker(mut self, budget: u64) -> Self {
        self.items_per_worker = Some(budget);
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.rate > 0.0) {
            return Err(SimError::InvalidConfig("rate must be > 0".into()));
        }

        if !(0.0..=1.0).contains(&self.retained_probability) {
            return Err(SimError::InvalidConfig(
                "retained_probability must be within [0, 1]".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.failure_probability) {
            return Err(SimError::InvalidConfig(
                "failure_probability must be within [0, 1]".into(),
            ));
        }

        if self.worker_count == 0 {
            return Err(SimError::InvalidConfig("worker_count must be > 0".into()));
        }

        if self.max_active == 0 {
            return Err(SimError::InvalidConfig("max_active must be > 0".into()));
        }

        if self.cache_capacity == 0 {
            return Err(SimError::InvalidConfig("cache_capacity must be > 0".into()));
        }

        if self.eviction_batch_size == 0 {
            return Err(SimError::InvalidConfig(
                "eviction_batch_size must be > 0".into(),
            ));
        }

        if self.sweep_batch == 0 {
            return Err(SimError::InvalidConfig("sweep_batch must be > 0".into()));
        }

        if self.completed_log_capacity == 0 {
            return Err(SimError::InvalidConfig(
                "completed_log_capacity must be > 0".into(),
            ));
        }

        if self.catalog_size == 0 {
            return Err(SimError::InvalidConfig("catalog_size must be > 0".into()));
        }

        if self.payload_min > self.payload_max {
            return Err(SimError::InvalidConfig(
                "payload_min cannot exceed payload_max".into(),
            ));
        }

        if self.mode == WorkloadMode::Bursty {
            if self.burst_multiplier < 1.0 {
                return Err(SimError::InvalidConfig(
                    "burst_multiplier must be >= 1 in bursty mode".into(),
                ));
            }

            if self.burst_interval.is_zero() {
                return Err(SimError::InvalidConfig(
                    "burst_interval must be > 0 in bursty mode".into(),
                ));
            }

            if self.burst_duration >= self.burst_interval {
                return Err(SimError::InvalidConfig(
                    "burst_duration must be shorter than burst_interval".into(),
                ));
            }
        }

        Ok(())
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::new()
    }
}
