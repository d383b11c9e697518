//! Named economic scenarios applied on top of a base parameter set.

pub mod economic;

pub use economic::{
    default_scenarios, run_scenarios, EconomicScenario, ExpectedValue, ScenarioAdjustment,
    ScenarioAnalysis, ScenarioOp, ScenarioOutcome,
};
