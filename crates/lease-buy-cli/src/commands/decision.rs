use clap::Args;
use serde_json::Value;

use lease_buy_core::decision::{compare_profiles, make_decision, render_summary, run_decision, RiskTolerance};
use lease_buy_core::npv::NpvEngine;
use lease_buy_core::EngineConfig;

use crate::input;

/// Arguments for the buy/rent decision
#[derive(Args)]
pub struct DecideArgs {
    /// Path to a JSON or YAML parameter file (otherwise read from stdin)
    #[arg(long)]
    pub input: Option<String>,

    /// conservative, moderate or aggressive
    #[arg(long, default_value = "moderate")]
    pub risk_tolerance: RiskTolerance,

    /// Decide under every risk tolerance
    #[arg(long)]
    pub all_profiles: bool,

    /// Print the plain-text executive summary instead of structured output
    #[arg(long)]
    pub summary: bool,
}

pub fn run_decide(args: DecideArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let params = input::load_params(args.input.as_deref())?;
    let npv = NpvEngine::new(config.npv.clone()).compare(&params);

    if args.summary {
        return Ok(Value::String(render_summary(&make_decision(&npv, args.risk_tolerance))));
    }
    if args.all_profiles {
        return Ok(serde_json::to_value(compare_profiles(&npv))?);
    }
    let out = run_decision(&npv, args.risk_tolerance)?;
    Ok(serde_json::to_value(out)?)
}
