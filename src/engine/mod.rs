pub mod context;
pub mod reporter;
pub mod sweeper;

pub use context::{EngineContext, ShutdownSignal};
pub use reporter::SnapshotReporter;
pub use sweeper::ExpirySweeper;

use crate::config::{SimConfig, WorkloadMode};
use crate::core::{Result, SimError};
use crate::metrics::{MetricsAggregator, MetricsSnapshot};
use crate::store::{BoundedCache, CompletedLog};
use crate::workload::{BurstState, GeneratorWorker};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Engine lifecycle states.
///
/// `Created → Running → Stopping → Stopped` (or `StoppedDegraded` when
/// the shutdown timeout elapses first). No transition skips a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Created,
    Running,
    Stopping,
    Stopped,
    StoppedDegraded,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineState::Created => "created",
            EngineState::Running => "running",
            EngineState::Stopping => "stopping",
            EngineState::Stopped => "stopped",
            EngineState::StoppedDegraded => "stopped-degraded",
        };
        f.write_str(name)
    }
}

/// How a `stop` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every worker exited within the timeout.
    Clean,
    /// The timeout elapsed with workers still running. Best-effort stop;
    /// leftover tasks keep their state and wind down on their own.
    Degraded,
}

/// Owns the shared context and every worker task of one simulation run
///
/// Starts the configured generator workers, one expiry sweeper, one
/// snapshot reporter, and (in bursty mode) the burst clock; stops them
/// all with a cooperative flag and a bounded wait.
pub struct Orchestrator {
    ctx: Arc<EngineContext>,
    state: Mutex<EngineState>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    snapshot_tx: Mutex<Option<watch::Sender<MetricsSnapshot>>>,
    snapshot_rx: watch::Receiver<MetricsSnapshot>,
    run_id: Uuid,
}

impl Orchestrator {
    /// Validate the configuration and build the run context.
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;

        let ctx = EngineContext::new(config);
        let (snapshot_tx, snapshot_rx) = watch::channel(ctx.metrics.snapshot());

        Ok(Self {
            ctx,
            state: Mutex::new(EngineState::Created),
            tasks: Mutex::new(Vec::new()),
            snapshot_tx: Mutex::new(Some(snapshot_tx)),
            snapshot_rx,
            run_id: Uuid::new_v4(),
        })
    }

    /// Spawn all workers. `Created → Running`; starting twice is an error.
    pub fn start(&self) -> Result<()> {
        {
            let mut state = self.lock_state();
            if *state != EngineState::Created {
                return Err(self.invalid_state(EngineState::Created, *state));
            }
            *state = EngineState::Running;
        }

        let config = &self.ctx.config;
        info!(
            run_id = %self.run_id,
            mode = ?config.mode,
            workers = config.worker_count,
            rate = config.rate,
            max_active = config.max_active,
            "engine starting"
        );

        let mut tasks = Vec::with_capacity(config.worker_count + 3);

        for worker_id in 0..config.worker_count {
            let worker = GeneratorWorker::new(worker_id, Arc::clone(&self.ctx));
            tasks.push(tokio::spawn(worker.run()));
        }

        tasks.push(tokio::spawn(
            ExpirySweeper::new(Arc::clone(&self.ctx)).run(),
        ));

        if let Some(tx) = self.snapshot_tx.lock().unwrap_or_else(|p| p.into_inner()).take() {
            tasks.push(tokio::spawn(
                SnapshotReporter::new(Arc::clone(&self.ctx), tx).run(),
            ));
        }

        if config.mode == WorkloadMode::Bursty {
            tasks.push(tokio::spawn(burst_clock(Arc::clone(&self.ctx))));
        }

        *self.tasks.lock().unwrap_or_else(|p| p.into_inner()) = tasks;
        Ok(())
    }

    /// Cooperative shutdown: set the shared flag, wake all sleepers, then
    /// wait up to `timeout` for every task to exit.
    ///
    /// `Running → Stopping → Stopped`, or `StoppedDegraded` when the
    /// timeout elapses first; the degraded case is logged, never fatal,
    /// and leftover tasks are not torn down forcibly.
    pub async fn stop(&self, timeout: Duration) -> Result<ShutdownOutcome> {
        {
            let mut state = self.lock_state();
            if *state != EngineState::Running {
                return Err(self.invalid_state(EngineState::Running, *state));
            }
            *state = EngineState::Stopping;
        }

        info!(run_id = %self.run_id, ?timeout, "engine stopping");
        self.ctx.shutdown.cancel();

        let handles = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(|p| p.into_inner()));
        let worker_total = handles.len();

        let drain = async {
            for handle in handles {
                if let Err(e) = handle.await {
                    warn!(error = %e, "worker task ended abnormally");
                }
            }
        };

        match tokio::time::timeout(timeout, drain).await {
            Ok(()) => {
                *self.lock_state() = EngineState::Stopped;
                info!(run_id = %self.run_id, workers = worker_total, "engine stopped cleanly");
                Ok(ShutdownOutcome::Clean)
            }
            Err(_) => {
                *self.lock_state() = EngineState::StoppedDegraded;
                warn!(
                    run_id = %self.run_id,
                    ?timeout,
                    "degraded shutdown: timeout elapsed with workers still running"
                );
                Ok(ShutdownOutcome::Degraded)
            }
        }
    }

    /// Stop with the configured default timeout.
    pub async fn stop_default(&self) -> Result<ShutdownOutcome> {
        let timeout = self.ctx.config.shutdown_timeout;
        self.stop(timeout).await
    }

    pub fn state(&self) -> EngineState {
        *self.lock_state()
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn config(&self) -> &SimConfig {
        &self.ctx.config
    }

    pub fn metrics(&self) -> &MetricsAggregator {
        &self.ctx.metrics
    }

    /// Fresh snapshot straight from the aggregator.
    ///
    /// Resets the interval maximum latency; while the engine runs, the
    /// reporter owns that interval, so passive reads of a live engine
    /// should use [`Orchestrator::latest_snapshot`] instead.
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.ctx.metrics.snapshot()
    }

    /// The reporter's most recently published snapshot. Read-only, so it
    /// never drains the interval metrics; after a stop it holds the
    /// reporter's final publish.
    pub fn latest_snapshot(&self) -> MetricsSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Live snapshot stream fed by the reporter.
    pub fn subscribe(&self) -> watch::Receiver<MetricsSnapshot> {
        self.snapshot_rx.clone()
    }

    pub fn burst(&self) -> &BurstState {
        &self.ctx.burst
    }

    pub fn cache(&self) -> &BoundedCache {
        &self.ctx.cache
    }

    pub fn completed_log(&self) -> &CompletedLog {
        &self.ctx.completed
    }

    pub fn active_count(&self) -> usize {
        self.ctx.working_set.len()
    }

    fn invalid_state(&self, expected: EngineState, actual: EngineState) -> SimError {
        SimError::InvalidState {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Opens a burst window of `burst_duration` every `burst_interval`,
/// starting with a quiet period. Workers pick the flag up at their next
/// tick; nothing here blocks them.
async fn burst_clock(ctx: Arc<EngineContext>) {
    let quiet = ctx.config.burst_interval - ctx.config.burst_duration;
    debug!(?quiet, window = ?ctx.config.burst_duration, "burst clock started");

    loop {
        tokio::select! {
            _ = tokio::time::sleep(quiet) => {}
            _ = ctx.shutdown.cancelled() => break,
        }
        ctx.burst.set(true);
        debug!("burst window opened");

        tokio::select! {
            _ = tokio::time::sleep(ctx.config.burst_duration) => {}
            _ = ctx.shutdown.cancelled() => {
                ctx.burst.set(false);
                break;
            }
        }
        ctx.burst.set(false);
        debug!("burst window closed");
    }

    debug!("burst clock exited");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_config() -> SimConfig {
        SimConfig::new()
            .rate(100.0)
            .worker_count(2)
            .retained_probability(0.0)
    }

    #[tokio::test(start_paused = true)]
    async fn test_lifecycle_clean_stop() {
        let engine = Orchestrator::new(quiet_config()).unwrap();
        assert_eq!(engine.state(), EngineState::Created);

        engine.start().unwrap();
        assert_eq!(engine.state(), EngineState::Running);

        tokio::time::sleep(Duration::from_millis(500)).await;

        let outcome = engine.stop(Duration::from_secs(5)).await.unwrap();
        assert_eq!(outcome, ShutdownOutcome::Clean);
        assert_eq!(engine.state(), EngineState::Stopped);
        assert!(engine.snapshot().created > 0);
    }

    #[tokio::test]
    async fn test_start_twice_is_invalid() {
        let engine = Orchestrator::new(quiet_config()).unwrap();
        engine.start().unwrap();
        assert!(matches!(
            engine.start(),
            Err(SimError::InvalidState { .. })
        ));
        engine.stop(Duration::from_secs(5)).await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_before_start_is_invalid() {
        let engine = Orchestrator::new(quiet_config()).unwrap();
        assert!(matches!(
            engine.stop(Duration::from_secs(1)).await,
            Err(SimError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn test_stop_twice_is_invalid() {
        let engine = Orchestrator::new(quiet_config()).unwrap();
        engine.start().unwrap();
        engine.stop(Duration::from_secs(5)).await.unwrap();
        assert!(matches!(
            engine.stop(Duration::from_secs(5)).await,
            Err(SimError::InvalidState { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_degraded_shutdown_when_a_task_hangs() {
        let engine = Orchestrator::new(quiet_config()).unwrap();
        engine.start().unwrap();

        // A task that ignores the shutdown signal entirely.
        engine
            .tasks
            .lock()
            .unwrap()
            .push(tokio::spawn(std::future::pending()));

        let outcome = engine.stop(Duration::from_millis(100)).await.unwrap();
        assert_eq!(outcome, ShutdownOutcome::Degraded);
        assert_eq!(engine.state(), EngineState::StoppedDegraded);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected_at_construction() {
        let config = SimConfig::new().rate(-1.0);
        assert!(matches!(
            Orchestrator::new(config),
            Err(SimError::InvalidConfig(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_clock_toggles_flag() {
        let config = SimConfig::new()
            .mode(WorkloadMode::Bursty)
            .burst_interval(Duration::from_millis(100))
            .burst_duration(Duration::from_millis(30));
        let ctx = EngineContext::new(config);
        let clock = tokio::spawn(burst_clock(Arc::clone(&ctx)));

        assert!(!ctx.burst.is_active());

        // Into the first window (quiet 70ms, then 30ms open).
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(ctx.burst.is_active());

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!ctx.burst.is_active());

        ctx.shutdown.cancel();
        clock.await.unwrap();
        assert!(!ctx.burst.is_active());
    }
}
