pub mod engine;
pub mod metrics;
pub mod signals;
pub mod types;

pub use engine::BehaviorClassifier;
pub use types::{BehaviorMetrics, ClassificationResult, EntityType, TransferRecord, Verdict};
