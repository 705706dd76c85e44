use super::context::EngineContext;
use crate::metrics::MetricsSnapshot;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// Periodic metrics publisher
///
/// Takes a snapshot every `snapshot_interval`, logs it, and pushes it to
/// a watch channel for whatever reporting layer sits outside the engine.
/// Publishes one final snapshot on the way out so a stopped run always
/// ends with current numbers.
pub struct SnapshotReporter {
    ctx: Arc<EngineContext>,
    tx: watch::Sender<MetricsSnapshot>,
}

impl SnapshotReporter {
    pub fn new(ctx: Arc<EngineContext>, tx: watch::Sender<MetricsSnapshot>) -> Self {
        Self { ctx, tx }
    }

    pub async fn run(self) {
        debug!("snapshot reporter started");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.ctx.config.snapshot_interval) => {}
                _ = self.ctx.shutdown.cancelled() => break,
            }
            if self.ctx.shutdown.is_cancelled() {
                break;
            }

            self.publish();
        }

        self.publish();
        debug!("snapshot reporter exited");
    }

    fn publish(&self) {
        let snap = self.ctx.metrics.snapshot();
        info!(
            created = snap.created,
            completed = snap.completed,
            rejected = snap.rejected,
            evicted = snap.evicted,
            active = snap.active,
            max_latency_us = snap.max_latency_us,
            "metrics snapshot"
        );
        // Receivers may all be gone; the log line above still stands.
        let _ = self.tx.send(snap);
    }
}
