use clap::Args;
use serde_json::Value;

use lease_buy_core::npv::NpvEngine;
use lease_buy_core::scenarios::{default_scenarios, run_scenarios, EconomicScenario};
use lease_buy_core::EngineConfig;

use crate::input;

/// Arguments for economic scenario analysis
#[derive(Args)]
pub struct ScenariosArgs {
    /// Path to a JSON or YAML parameter file (otherwise read from stdin)
    #[arg(long)]
    pub input: Option<String>,

    /// JSON or YAML list of scenarios (defaults to the built-in five)
    #[arg(long)]
    pub scenarios: Option<String>,
}

pub fn run_scenario_analysis(args: ScenariosArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let params = input::load_params(args.input.as_deref())?;
    let scenarios: Vec<EconomicScenario> = match args.scenarios.as_deref() {
        Some(path) => input::file::read_structured(path)?,
        None => default_scenarios(),
    };

    let engine = NpvEngine::new(config.npv.clone());
    Ok(serde_json::to_value(run_scenarios(&engine, &params, &scenarios)?)?)
}
