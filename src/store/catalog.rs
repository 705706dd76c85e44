use crate::core::CatalogEntry;
use rand::Rng;
use std::sync::Arc;

/// Long-lived reference data shared by every generated item
///
/// Built once at startup, immutable afterwards. The `Arc` makes clones
/// cheap, so every worker holds its own handle without locks.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Arc<Vec<Arc<CatalogEntry>>>,
}

impl Catalog {
    /// Entry payload size, bytes. Reference data is deliberately small
    /// next to item payloads.
    const ENTRY_PAYLOAD: usize = 256;

    pub fn build(size: usize) -> Self {
        let entries = (0..size)
            .map(|i| {
                Arc::new(CatalogEntry::new(
                    i as u32,
                    format!("sku-{:05}", i),
                    Self::ENTRY_PAYLOAD,
                ))
            })
            .collect();

        Self {
            entries: Arc::new(entries),
        }
    }

    /// Pick a uniformly random entry for a new item to reference.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Arc<CatalogEntry> {
        let idx = rng.gen_range(0..self.entries.len());
        Arc::clone(&self.entries[idx])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_build_creates_requested_entries() {
        let catalog = Catalog::build(32);
        assert_eq!(catalog.len(), 32);
    }

    #[test]
    fn test_sample_returns_shared_entry() {
        let catalog = Catalog::build(8);
        let mut rng = StdRng::seed_from_u64(1);

        let entry = catalog.sample(&mut rng);
        assert!(entry.id < 8);
        assert!(entry.name.starts_with("sku-"));

        // Sampling shares, never copies, the entry.
        assert!(Arc::strong_count(&entry) >= 2);
    }
}
