use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Unique work item identifier, assigned monotonically per engine run.
pub type ItemId = u64;

/// Whether a generated item survives its production tick.
///
/// `Ephemeral` items are processed and dropped on the spot (short-lived
/// garbage); `Retained` items go through admission and live in the cache
/// until their lifetime elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetentionClass {
    Ephemeral,
    Retained,
}

/// A synthetic unit of simulated work, modeled on a retail order.
///
/// Immutable after construction; only its container membership changes.
/// The payload simulates the item's allocation footprint. The catalog
/// entry is referenced, never owned.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub id: ItemId,
    pub created_at: Instant,
    pub payload: Vec<u8>,
    pub retention: RetentionClass,
    /// Set for `Retained` items only.
    pub expires_at: Option<Instant>,
    pub catalog_ref: Arc<CatalogEntry>,
}

impl WorkItem {
    pub fn new(
        id: ItemId,
        retention: RetentionClass,
        payload_bytes: usize,
        catalog_ref: Arc<CatalogEntry>,
        lifetime: Duration,
    ) -> Self {
        let created_at = Instant::now();
        let expires_at = match retention {
            RetentionClass::Retained => Some(created_at + lifetime),
            RetentionClass::Ephemeral => None,
        };

        Self {
            id,
            created_at,
            payload: vec![0u8; payload_bytes],
            retention,
            expires_at,
            catalog_ref,
        }
    }

    pub fn payload_bytes(&self) -> usize {
        self.payload.len()
    }
}

/// Long-lived reference data an item points at for realism.
///
/// Created once at startup, immutable thereafter, shared via `Arc`.
#[derive(Debug)]
pub struct CatalogEntry {
    pub id: u32,
    pub name: String,
    pub payload: Vec<u8>,
}

impl CatalogEntry {
    pub fn new(id: u32, name: impl Into<String>, payload_bytes: usize) -> Self {
        Self {
            id,
            name: name.into(),
            payload: vec![0u8; payload_bytes],
        }
    }
}

/// Record of a retired item kept in the completed log for inspection.
#[derive(Debug, Clone)]
pub struct CompletedItem {
    pub id: ItemId,
    pub payload_bytes: usize,
    pub created_at: Instant,
    pub retired_at: Instant,
}

impl CompletedItem {
    /// End-to-end latency from creation to retirement.
    pub fn latency(&self) -> Duration {
        self.retired_at.duration_since(self.created_at)
    }
}

/// Monotonic item id source shared by all generator workers.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> ItemId {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}
