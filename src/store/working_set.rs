use crate::core::ItemId;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::time::Instant;

/// Retirement metadata for one live retained item.
///
/// The item itself (with its payload) is owned by the bounded cache; the
/// working set only indexes what the sweeper needs, so no item is ever
/// owned by two collections.
#[derive(Debug, Clone)]
pub struct ActiveEntry {
    pub id: ItemId,
    pub created_at: Instant,
    pub expires_at: Instant,
    pub payload_bytes: usize,
}

/// Index of the retained items currently live
///
/// Holds `len() <= max_active` after every settled admission decision;
/// the admission gate enforces the bound, this set just tracks the
/// members.
#[derive(Debug, Default)]
pub struct ActiveWorkingSet {
    entries: Mutex<HashMap<ItemId, ActiveEntry>>,
}

impl ActiveWorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, entry: ActiveEntry) {
        self.lock().insert(entry.id, entry);
    }

    pub fn remove(&self, id: ItemId) -> Option<ActiveEntry> {
        self.lock().remove(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Collect up to `limit` ids whose expiry has elapsed.
    ///
    /// The bound keeps one sweep tick from turning into a long scan when
    /// a large batch expires at once; the remainder is picked up next
    /// tick.
    pub fn expired_ids(&self, now: Instant, limit: usize) -> Vec<ItemId> {
        let entries = self.lock();
        entries
            .values()
            .filter(|entry| entry.expires_at <= now)
            .take(limit)
            .map(|entry| entry.id)
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ItemId, ActiveEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
