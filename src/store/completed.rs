use crate::core::CompletedItem;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Bounded most-recent-N history of retired items
///
/// Inspection only; trimmed oldest-first whenever a push takes it over
/// capacity.
#[derive(Debug)]
pub struct CompletedLog {
    capacity: usize,
    inner: Mutex<VecDeque<CompletedItem>>,
}

impl CompletedLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn push(&self, item: CompletedItem) {
        let mut log = self.lock();
        log.push_back(item);
        while log.len() > self.capacity {
            log.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Most recent retirements, newest last.
    pub fn recent(&self, n: usize) -> Vec<CompletedItem> {
        let log = self.lock();
        log.iter().rev().take(n).rev().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<CompletedItem>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    fn completed(id: u64) -> CompletedItem {
        let now = Instant::now();
        CompletedItem {
            id,
            payload_bytes: 32,
            created_at: now,
            retired_at: now,
        }
    }

    #[tokio::test]
    async fn test_trims_oldest_first() {
        let log = CompletedLog::new(3);
        for id in 1..=5 {
            log.push(completed(id));
        }

        assert_eq!(log.len(), 3);
        let ids: Vec<u64> = log.recent(10).iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn test_recent_returns_newest_last() {
        let log = CompletedLog::new(10);
        for id in 1..=4 {
            log.push(completed(id));
        }

        let ids: Vec<u64> = log.recent(2).iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3, 4]);
    }
}
