pub mod error;
pub mod types;

pub use error::{Result, SimError};
pub use types::{CatalogEntry, CompletedItem, IdAllocator, ItemId, RetentionClass, WorkItem};
