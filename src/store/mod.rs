pub mod cache;
pub mod catalog;
pub mod completed;
pub mod working_set;

pub use cache::BoundedCache;
pub use catalog::Catalog;
pub use completed::CompletedLog;
pub use working_set::{ActiveEntry, ActiveWorkingSet};
