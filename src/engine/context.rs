use crate::config::SimConfig;
use crate::core::IdAllocator;
use crate::gate::AdmissionGate;
use crate::metrics::MetricsAggregator;
use crate::store::{ActiveWorkingSet, BoundedCache, Catalog, CompletedLog};
use crate::workload::BurstState;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// Cooperative cancellation signal
///
/// Every worker loop checks the flag once per tick and exits promptly;
/// the notify wakes sleepers early so a stop never waits out a full
/// pacing interval. Cancellation is a control value here, not an error.
#[derive(Debug, Default)]
pub struct ShutdownSignal {
    cancelled: AtomicBool,
    notify: Notify,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once cancellation is signalled. Registers with the
    /// notifier before re-checking the flag, so a concurrent `cancel`
    /// cannot slip between check and wait.
    pub async fn cancelled(&self) {
        loop {
            if self.is_cancelled() {
                return;
            }

            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Shared state for one engine run
///
/// Owned by the orchestrator and handed to every worker as an `Arc`;
/// there are no process-wide singletons. All mutation goes through each
/// component's own concurrency-safe operations.
#[derive(Debug)]
pub struct EngineContext {
    pub config: SimConfig,
    pub ids: IdAllocator,
    pub catalog: Catalog,
    pub metrics: Arc<MetricsAggregator>,
    pub gate: AdmissionGate,
    pub cache: BoundedCache,
    pub working_set: ActiveWorkingSet,
    pub completed: CompletedLog,
    pub burst: Arc<BurstState>,
    pub shutdown: ShutdownSignal,
}

impl EngineContext {
    pub fn new(config: SimConfig) -> Arc<Self> {
        let metrics = Arc::new(MetricsAggregator::new());
        let gate = AdmissionGate::new(config.max_active, &metrics);
        let cache = BoundedCache::new(config.cache_capacity, config.eviction_batch_size)
            .with_metrics(Arc::clone(&metrics));

        Arc::new(Self {
            ids: IdAllocator::new(),
            catalog: Catalog::build(config.catalog_size),
            gate,
            cache,
            working_set: ActiveWorkingSet::new(),
            completed: CompletedLog::new(config.completed_log_capacity),
            burst: Arc::new(BurstState::new()),
            shutdown: ShutdownSignal::new(),
            metrics,
            config,
        })
    }
}
