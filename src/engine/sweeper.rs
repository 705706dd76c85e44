use super::context::EngineContext;
use crate::core::{CompletedItem, ItemId, Result};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Consumer loop retiring items whose lifetime has elapsed
///
/// Each tick retires at most `sweep_batch` items so one sweep never turns
/// into a long scan; anything left over is picked up next tick. An item
/// whose retirement fails stays in the working set and is retried.
pub struct ExpirySweeper {
    ctx: Arc<EngineContext>,
}

impl ExpirySweeper {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    pub async fn run(self) {
        debug!("expiry sweeper started");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.ctx.config.sweep_interval) => {}
                _ = self.ctx.shutdown.cancelled() => break,
            }
            if self.ctx.shutdown.is_cancelled() {
                break;
            }

            self.sweep_tick();
        }

        debug!("expiry sweeper exited");
    }

    /// One bounded pass over the working set. Returns how many items were
    /// retired.
    pub(crate) fn sweep_tick(&self) -> usize {
        let now = Instant::now();
        let due = self
            .ctx
            .working_set
            .expired_ids(now, self.ctx.config.sweep_batch);

        let mut retired = 0usize;
        for id in due {
            match self.retire_one(id, now) {
                Ok(true) => retired += 1,
                Ok(false) => {}
                Err(e) => {
                    // Left in the working set; the next tick retries it.
                    warn!(item = id, error = %e, "retirement failed, will retry");
                }
            }
        }

        if retired > 0 {
            debug!(retired, "sweep tick retired items");
        }
        retired
    }

    /// Retire a single expired item: drop it from the working set and
    /// cache, log the completion, release the admission slot.
    fn retire_one(&self, id: ItemId, now: Instant) -> Result<bool> {
        let ctx = &self.ctx;

        let Some(entry) = ctx.working_set.remove(id) else {
            // Already gone; another sweep settled it.
            return Ok(false);
        };

        // Eviction may have dropped the payload first; retirement still
        // proceeds from the working-set metadata.
        ctx.cache.remove(id);

        ctx.completed.push(CompletedItem {
            id,
            payload_bytes: entry.payload_bytes,
            created_at: entry.created_at,
            retired_at: now,
        });

        ctx.gate.release();
        ctx.metrics.record_completed();
        ctx.metrics
            .record_latency(now.duration_since(entry.created_at));

        Ok(true)
    }
}
