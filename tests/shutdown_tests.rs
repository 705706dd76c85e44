/// Shutdown behavior tests
///
/// Cooperative stop mid-flight, prompt wakeup of sleeping workers, and
/// snapshot consistency across the stop boundary.
/// Run with: cargo test --test shutdown_tests
use ordersim::{EngineState, Orchestrator, ShutdownOutcome, SimConfig};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_stop_mid_flight_exits_within_timeout() {
    let config = SimConfig::new()
        .rate(500.0)
        .worker_count(4)
        .retained_probability(0.5)
        .item_lifetime(Duration::from_millis(200))
        .sweep_interval(Duration::from_millis(50));

    let engine = Orchestrator::new(config).unwrap();
    engine.start().unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;
    let before = engine.snapshot();

    let outcome = engine.stop(Duration::from_secs(5)).await.unwrap();
    assert_eq!(outcome, ShutdownOutcome::Clean);
    assert_eq!(engine.state(), EngineState::Stopped);

    // Cumulative counters never decrease across the stop boundary.
    let after = engine.snapshot();
    assert!(after.created >= before.created);
    assert!(after.completed >= before.completed);
    assert!(after.rejected >= before.rejected);
    assert_eq!(
        after.created,
        after.completed + after.rejected + after.active as u64
    );
}

#[tokio::test(start_paused = true)]
async fn test_stop_wakes_workers_sleeping_long_intervals() {
    // One item a minute: workers spend essentially all their time asleep,
    // so a prompt exit proves the cancel wakes them early.
    let config = SimConfig::new()
        .rate(1.0 / 60.0)
        .worker_count(2)
        .retained_probability(0.0);

    let engine = Orchestrator::new(config).unwrap();
    engine.start().unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;

    let outcome = engine.stop(Duration::from_secs(1)).await.unwrap();
    assert_eq!(outcome, ShutdownOutcome::Clean);
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_see_a_final_snapshot() {
    let config = SimConfig::new()
        .rate(200.0)
        .worker_count(2)
        .retained_probability(0.0)
        .snapshot_interval(Duration::from_millis(250));

    let engine = Orchestrator::new(config).unwrap();
    let rx = engine.subscribe();
    engine.start().unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;
    engine.stop(Duration::from_secs(5)).await.unwrap();

    // The reporter publishes once more on its way out.
    let last = rx.borrow();
    assert!(last.created > 0);
    assert_eq!(last.created, engine.snapshot().created);
}

#[tokio::test(start_paused = true)]
async fn test_latest_snapshot_does_not_drain_interval_metrics() {
    let config = SimConfig::new()
        .rate(200.0)
        .worker_count(2)
        .retained_probability(1.0)
        .max_active(1_000)
        .item_lifetime(Duration::from_millis(100))
        .sweep_interval(Duration::from_millis(20));

    let engine = Orchestrator::new(config).unwrap();
    engine.start().unwrap();

    // Stop between reporter ticks so the final publish covers a window
    // with real retirements in it.
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    engine.stop(Duration::from_secs(5)).await.unwrap();

    let first = engine.latest_snapshot();
    let second = engine.latest_snapshot();

    // Items live at least their 100ms lifetime before retiring.
    assert!(first.max_latency_us >= 100_000);
    assert_eq!(second.max_latency_us, first.max_latency_us);
    assert_eq!(second.created, first.created);
}

#[tokio::test(start_paused = true)]
async fn test_budgeted_run_drains_and_stops_clean() {
    let config = SimConfig::new()
        .rate(1_000.0)
        .worker_count(2)
        .retained_probability(1.0)
        .max_active(10_000)
        .items_per_worker(200)
        .item_lifetime(Duration::from_millis(100))
        .sweep_interval(Duration::from_millis(20));

    let engine = Orchestrator::new(config).unwrap();
    engine.start().unwrap();

    // Workers spend their budgets, then every retained item expires and
    // the sweeper fully drains the working set.
    tokio::time::sleep(Duration::from_secs(3)).await;

    let snap = engine.snapshot();
    assert_eq!(snap.created, 400);
    assert_eq!(snap.active, 0);
    assert_eq!(snap.created, snap.completed + snap.rejected);

    let outcome = engine.stop(Duration::from_secs(5)).await.unwrap();
    assert_eq!(outcome, ShutdownOutcome::Clean);
}
