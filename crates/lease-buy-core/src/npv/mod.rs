pub mod engine;

pub use engine::{ConfidenceLabel, NpvAnalysis, NpvEngine, NpvResult, Recommendation};
