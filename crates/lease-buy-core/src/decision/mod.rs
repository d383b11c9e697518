//! Seven-level buy/rent recommendation with confidence and risk scoring.
//!
//! A decision is a pure function of an [`NpvResult`](crate::npv::NpvResult)
//! and a [`RiskTolerance`]. Nothing is retained between calls.

pub mod engine;
pub mod scoring;
pub mod summary;

pub use engine::{
    compare_decisions, compare_profiles, make_decision, run_decision, DecisionComparison,
    DecisionRecommendation, DecisionResult, DecisionThresholds, ExecutiveSummary,
    ProfileComparison, RiskTolerance,
};
pub use scoring::{
    ConfidenceBreakdown, ConfidenceLevel, DecisionMetrics, KeyRisks, RiskAssessment, RiskLevel,
};
pub use summary::{format_currency, render_summary};
