// ============================================================================
// OrderSim Library
// ============================================================================

pub mod config;
pub mod core;
pub mod engine;
pub mod gate;
pub mod metrics;
pub mod store;
pub mod workload;

// Re-export main types for convenience
pub use config::{SimConfig, WorkloadMode};
pub use crate::core::{
    CatalogEntry, CompletedItem, ItemId, Result, RetentionClass, SimError, WorkItem,
};
pub use engine::{EngineState, Orchestrator, ShutdownOutcome};
pub use gate::{Admission, AdmissionGate};
pub use metrics::{MetricsAggregator, MetricsSnapshot};
pub use store::{ActiveWorkingSet, BoundedCache, Catalog, CompletedLog};
pub use workload::{BurstState, GeneratorWorker, RateProfile};
