use super::profile::RateProfile;
use crate::core::{Result, RetentionClass, SimError, WorkItem};
use crate::engine::context::EngineContext;
use crate::gate::Admission;
use crate::store::ActiveEntry;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, warn};

/// One generator worker: a paced produce loop over the shared context
///
/// Each worker owns its RNG stream (derived from the configured base
/// seed) and shares everything else through the context. A failure while
/// producing a single item is logged and the loop continues on its next
/// tick; retry of rejected work happens naturally with the next item.
pub struct GeneratorWorker {
    worker_id: usize,
    ctx: Arc<EngineContext>,
    profile: RateProfile,
    rng: StdRng,
    produced: u64,
}

impl GeneratorWorker {
    pub fn new(worker_id: usize, ctx: Arc<EngineContext>) -> Self {
        let profile = RateProfile::from_config(&ctx.config, Arc::clone(&ctx.burst));
        let rng = StdRng::seed_from_u64(ctx.config.seed.wrapping_add(worker_id as u64));

        Self {
            worker_id,
            ctx,
            profile,
            rng,
            produced: 0,
        }
    }

    /// Run until cancelled or the per-worker item budget is spent.
    pub async fn run(mut self) {
        debug!(worker = self.worker_id, "generator worker started");
        let mut next_tick = Instant::now();

        loop {
            if self.ctx.shutdown.is_cancelled() {
                break;
            }
            if let Some(budget) = self.ctx.config.items_per_worker {
                if self.produced >= budget {
                    break;
                }
            }

            // Burst toggles are observed here, at the start of each tick.
            let interval = self.profile.tick_interval();

            tokio::select! {
                _ = tokio::time::sleep_until(next_tick) => {}
                _ = self.ctx.shutdown.cancelled() => break,
            }

            if let Err(e) = self.produce_tick() {
                warn!(
                    worker = self.worker_id,
                    error = %e,
                    "item generation failed, continuing"
                );
            }

            next_tick += interval;
        }

        debug!(
            worker = self.worker_id,
            produced = self.produced,
            "generator worker exited"
        );
    }

    /// Produce exactly one item. Everything that can go wrong with this
    /// item stays behind this boundary.
    pub(crate) fn produce_tick(&mut self) -> Result<()> {
        let ctx = &self.ctx;

        // Injected faults fail before any counter moves, so the
        // conservation law is unaffected.
        if ctx.config.failure_probability > 0.0
            && self.rng.gen_bool(ctx.config.failure_probability)
        {
            return Err(SimError::Transient("injected item fault".into()));
        }

        let id = ctx.ids.next_id();
        let payload_bytes = self
            .rng
            .gen_range(ctx.config.payload_min..=ctx.config.payload_max);
        let retention = if self.rng.gen_bool(ctx.config.retained_probability) {
            RetentionClass::Retained
        } else {
            RetentionClass::Ephemeral
        };
        let catalog_ref = ctx.catalog.sample(&mut self.rng);

        ctx.metrics.record_created();
        self.produced += 1;

        match retention {
            RetentionClass::Ephemeral => {
                // Processed and dropped on the spot: the allocation is the
                // point, the item itself is garbage by the next line.
                let item = WorkItem::new(
                    id,
                    retention,
                    payload_bytes,
                    catalog_ref,
                    ctx.config.item_lifetime,
                );
                drop(item);
                ctx.metrics.record_completed();
            }
            RetentionClass::Retained => match ctx.gate.try_admit() {
                Admission::RejectedBackpressure => {
                    ctx.metrics.record_rejected();
                    debug!(worker = self.worker_id, item = id, "rejected by backpressure");
                }
                Admission::Accepted => {
                    let item = WorkItem::new(
                        id,
                        retention,
                        payload_bytes,
                        catalog_ref,
                        ctx.config.item_lifetime,
                    );
                    let expires_at = item
                        .expires_at
                        .unwrap_or(item.created_at + ctx.config.item_lifetime);

                    ctx.working_set.insert(ActiveEntry {
                        id,
                        created_at: item.created_at,
                        expires_at,
                        payload_bytes: item.payload_bytes(),
                    });
                    ctx.cache.put(item);
                }
            },
        }

        Ok(())
    }

    pub fn produced(&self) -> u64 {
        self.produced
    }
}
