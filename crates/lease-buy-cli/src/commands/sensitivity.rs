use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use lease_buy_core::npv::NpvEngine;
use lease_buy_core::sensitivity::grid::default_deltas;
use lease_buy_core::sensitivity::tornado::grid_values;
use lease_buy_core::sensitivity::{linspace, SensitivityEngine};
use lease_buy_core::{EngineConfig, ParameterKey};

use crate::input;

/// Arguments for a one-way sensitivity sweep
#[derive(Args)]
pub struct SensitivityArgs {
    /// Path to a JSON or YAML parameter file (otherwise read from stdin)
    #[arg(long)]
    pub input: Option<String>,

    /// Parameter to vary, e.g. interest_rate
    #[arg(long)]
    pub parameter: ParameterKey,

    /// Explicit test values (comma-separated, e.g. "3,4,5,6")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub values: Option<Vec<Decimal>>,

    /// Lower end of an evenly spaced grid
    #[arg(long, allow_hyphen_values = true)]
    pub min: Option<Decimal>,

    /// Upper end of an evenly spaced grid
    #[arg(long, allow_hyphen_values = true)]
    pub max: Option<Decimal>,

    /// Number of grid points between --min and --max
    #[arg(long, default_value_t = 9)]
    pub points: u32,
}

pub fn run_sensitivity(args: SensitivityArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let params = input::load_params(args.input.as_deref())?;
    let values = match (args.values, args.min, args.max) {
        (Some(v), _, _) => v,
        (None, Some(min), Some(max)) => linspace(min, max, args.points),
        _ => config
            .sweep
            .catalogue
            .iter()
            .find(|s| s.parameter == args.parameter)
            .map(|s| grid_values(s, &params))
            .ok_or("--values or --min/--max required for a parameter outside the sweep catalogue")?,
    };

    let npv = NpvEngine::new(config.npv.clone());
    let engine = SensitivityEngine::new(&npv, config);
    Ok(serde_json::to_value(engine.run_sweep(&params, args.parameter, &values)?)?)
}

/// Arguments for a two-way sensitivity grid
#[derive(Args)]
pub struct Sensitivity2dArgs {
    /// Path to a JSON or YAML parameter file (otherwise read from stdin)
    #[arg(long)]
    pub input: Option<String>,

    /// Row parameter
    #[arg(long)]
    pub x: ParameterKey,

    /// Column parameter
    #[arg(long)]
    pub y: ParameterKey,

    /// Additive deltas for the row parameter (default -1.5..1.5 step 0.5)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub x_deltas: Option<Vec<Decimal>>,

    /// Additive deltas for the column parameter
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub y_deltas: Option<Vec<Decimal>>,
}

pub fn run_sensitivity_2d(args: Sensitivity2dArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let params = input::load_params(args.input.as_deref())?;
    let x_deltas = args.x_deltas.unwrap_or_else(default_deltas);
    let y_deltas = args.y_deltas.unwrap_or_else(default_deltas);

    let npv = NpvEngine::new(config.npv.clone());
    let engine = SensitivityEngine::new(&npv, config);
    let out = engine.run_sweep_2d(&params, args.x, args.y, &x_deltas, &y_deltas)?;
    Ok(serde_json::to_value(out)?)
}

/// Arguments for the break-even search
#[derive(Args)]
pub struct BreakEvenArgs {
    /// Path to a JSON or YAML parameter file (otherwise read from stdin)
    #[arg(long)]
    pub input: Option<String>,

    /// Parameter to solve for
    #[arg(long)]
    pub parameter: ParameterKey,

    /// Lower bound of the search bracket
    #[arg(long, allow_hyphen_values = true)]
    pub lo: Decimal,

    /// Upper bound of the search bracket
    #[arg(long, allow_hyphen_values = true)]
    pub hi: Decimal,

    /// Largest |NPV difference| accepted as break-even (overrides config)
    #[arg(long)]
    pub tolerance: Option<Decimal>,

    /// Wall-clock budget in milliseconds (overrides config)
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

pub fn run_break_even(args: BreakEvenArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let params = input::load_params(args.input.as_deref())?;
    let mut config = config.clone();
    if let Some(t) = args.tolerance {
        config.break_even.tolerance = t;
    }
    if let Some(ms) = args.timeout_ms {
        config.break_even.timeout_ms = ms;
    }

    let npv = NpvEngine::new(config.npv.clone());
    let engine = SensitivityEngine::new(&npv, &config);
    let out = engine.run_break_even(&params, args.parameter, args.lo, args.hi)?;
    Ok(serde_json::to_value(out)?)
}

/// Arguments for the comprehensive tornado sweep
#[derive(Args)]
pub struct TornadoArgs {
    /// Path to a JSON or YAML parameter file (otherwise read from stdin)
    #[arg(long)]
    pub input: Option<String>,

    /// Only sweep parameters marked critical
    #[arg(long)]
    pub critical_only: bool,
}

pub fn run_tornado(args: TornadoArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let params = input::load_params(args.input.as_deref())?;
    let mut config = config.clone();
    config.sweep.critical_only |= args.critical_only;

    let npv = NpvEngine::new(config.npv.clone());
    let engine = SensitivityEngine::new(&npv, &config);
    Ok(serde_json::to_value(engine.comprehensive(&params)?)?)
}
