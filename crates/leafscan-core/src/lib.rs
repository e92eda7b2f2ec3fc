pub mod result;
pub mod usage;

pub use result::{ClassificationResult, ModelType, Severity, health_score, round2};
pub use usage::TokenUsage;
