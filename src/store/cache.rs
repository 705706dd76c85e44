use crate::core::{ItemId, WorkItem};
use crate::metrics::MetricsAggregator;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Fixed-capacity item store with strict FIFO eviction
///
/// A backing map plus an insertion-ordered key queue, both behind one
/// lock so every operation applies as a single logical unit. Eviction is
/// by insertion age only; a `get` never promotes an entry. When a `put`
/// pushes the map over capacity, the oldest keys are drained in one
/// batched pass instead of taking the lock once per key.
#[derive(Debug)]
pub struct BoundedCache {
    capacity: usize,
    eviction_batch: usize,
    metrics: Option<Arc<MetricsAggregator>>,
    inner: Mutex<CacheInner>,
}

#[derive(Debug, Default)]
struct CacheInner {
    map: HashMap<ItemId, WorkItem>,
    order: VecDeque<ItemId>,
    /// Order-queue ids whose map entry was removed out of band.
    stale: usize,
}

impl BoundedCache {
    /// Floor for the stale-id compaction threshold; keeps tiny caches
    /// from rebuilding the queue on every removal.
    const COMPACT_MIN: usize = 32;

    pub fn new(capacity: usize, eviction_batch: usize) -> Self {
        Self {
            capacity,
            eviction_batch: eviction_batch.max(1),
            metrics: None,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    /// Attach eviction instrumentation.
    pub fn with_metrics(mut self, metrics: Arc<MetricsAggregator>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Insert an item, evicting the oldest entries if over capacity.
    ///
    /// Never fails. Re-inserting an existing key replaces the value
    /// without changing its insertion order.
    pub fn put(&self, item: WorkItem) {
        let evicted = {
            let mut inner = self.lock();
            let id = item.id;
            if inner.map.insert(id, item).is_none() {
                inner.order.push_back(id);
            }
            self.evict_over_capacity(&mut inner)
        };

        if evicted > 0 {
            if let Some(metrics) = &self.metrics {
                metrics.record_evicted(evicted);
            }
        }
    }

    /// Look up an item by id. Returns a cloned view, or `None` for a
    /// missing or already evicted key.
    pub fn get(&self, id: ItemId) -> Option<WorkItem> {
        self.lock().map.get(&id).cloned()
    }

    /// Remove an item, e.g. at retirement. The key goes stale in the
    /// order queue; eviction skips it, and a compaction pass reclaims
    /// stale slots once they outnumber live entries, so out-of-band
    /// removals cannot grow the index without bound.
    pub fn remove(&self, id: ItemId) -> Option<WorkItem> {
        let mut inner = self.lock();
        let removed = inner.map.remove(&id);
        if removed.is_some() {
            inner.stale += 1;
            Self::compact_stale(&mut inner);
        }
        removed
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.lock().map.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().map.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drain the oldest keys until size is back at or under capacity,
    /// bounded to one eviction batch per pass. A queued key whose map
    /// entry is already gone was removed out of band; skipping it is
    /// harmless.
    fn evict_over_capacity(&self, inner: &mut CacheInner) -> u64 {
        let mut evicted = 0u64;
        while inner.map.len() > self.capacity && (evicted as usize) < self.eviction_batch {
            match inner.order.pop_front() {
                Some(oldest) => {
                    if inner.map.remove(&oldest).is_some() {
                        evicted += 1;
                    } else {
                        inner.stale = inner.stale.saturating_sub(1);
                    }
                }
                None => break,
            }
        }
        evicted
    }

    /// Rebuild the order queue once stale ids outnumber live entries,
    /// keeping the index proportional to the live set.
    fn compact_stale(inner: &mut CacheInner) {
        if inner.stale <= inner.map.len().max(Self::COMPACT_MIN) {
            return;
        }
        let CacheInner { map, order, stale } = inner;
        order.retain(|id| map.contains_key(id));
        *stale = 0;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CatalogEntry, RetentionClass};
    use std::time::Duration;

    fn item(id: ItemId) -> WorkItem {
        let entry = Arc::new(CatalogEntry::new(0, "sku-00000", 16));
        WorkItem::new(id, RetentionClass::Retained, 8, entry, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let cache = BoundedCache::new(4, 2);
        cache.put(item(1));

        assert_eq!(cache.get(1).map(|i| i.id), Some(1));
        assert!(cache.get(2).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_capacity_never_exceeded() {
        let cache = BoundedCache::new(3, 1);
        for id in 0..10 {
            cache.put(item(id));
            assert!(cache.len() <= 3);
        }
    }

    #[tokio::test]
    async fn test_eviction_is_fifo_ignoring_access() {
        let cache = BoundedCache::new(2, 1);
        cache.put(item(1));
        cache.put(item(2));

        // Touching the oldest entry must not promote it.
        assert!(cache.get(1).is_some());
        cache.put(item(3));

        assert!(cache.get(1).is_none());
        assert!(cache.get(2).is_some());
        assert!(cache.get(3).is_some());
    }

    #[tokio::test]
    async fn test_removed_key_is_benign_during_eviction() {
        let cache = BoundedCache::new(2, 2);
        cache.put(item(1));
        cache.put(item(2));

        // Retired out of band; its order-queue slot goes stale.
        assert!(cache.remove(1).is_some());
        assert_eq!(cache.len(), 1);

        cache.put(item(3));
        cache.put(item(4));

        // The stale key 1 is skipped, key 2 is the real oldest.
        assert!(cache.get(2).is_none());
        assert!(cache.get(3).is_some());
        assert!(cache.get(4).is_some());
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_order_index_compacts_after_out_of_band_removals() {
        // Capacity far above the live set, as with the default config:
        // eviction never fires, so only compaction bounds the index.
        let cache = BoundedCache::new(10_000, 64);

        for id in 0..5_000 {
            cache.put(item(id));
            cache.remove(id);
        }

        let inner = cache.inner.lock().unwrap();
        assert!(inner.map.is_empty());
        assert!(
            inner.order.len() <= 2 * BoundedCache::COMPACT_MIN,
            "order queue grew to {} entries",
            inner.order.len()
        );
    }

    #[tokio::test]
    async fn test_order_index_stays_proportional_under_churn() {
        let cache = BoundedCache::new(1_000, 16);

        // A rolling window of 100 live items; everything older is
        // removed out of band, never evicted.
        for id in 0..2_000u64 {
            cache.put(item(id));
            if id >= 100 {
                cache.remove(id - 100);
            }
        }

        let inner = cache.inner.lock().unwrap();
        assert_eq!(inner.map.len(), 100);
        assert!(
            inner.order.len() <= 256,
            "order queue grew to {} entries for 100 live items",
            inner.order.len()
        );
    }

    #[tokio::test]
    async fn test_eviction_counts_reach_metrics() {
        let metrics = Arc::new(MetricsAggregator::new());
        let cache = BoundedCache::new(2, 1).with_metrics(Arc::clone(&metrics));

        for id in 0..5 {
            cache.put(item(id));
        }

        assert_eq!(metrics.snapshot().evicted, 3);
    }
}
