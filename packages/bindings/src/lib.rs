use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use lease_buy_core::decision::{self, RiskTolerance};
use lease_buy_core::npv::{NpvEngine, NpvResult};
use lease_buy_core::projection::amortization;
use lease_buy_core::scenarios::{self, EconomicScenario};
use lease_buy_core::sensitivity::grid::default_deltas;
use lease_buy_core::sensitivity::SensitivityEngine;
use lease_buy_core::{CalculationParameters, EngineConfig, ParameterKey};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Parameters plus an optional engine config, the common request shape.
#[derive(Deserialize)]
struct Request<T> {
    params: CalculationParameters,
    #[serde(default)]
    config: EngineConfig,
    #[serde(flatten)]
    extra: T,
}

fn to_json<T: Serialize>(value: &T) -> NapiResult<String> {
    serde_json::to_string(value).map_err(to_napi_error)
}

fn parse<T: for<'de> Deserialize<'de>>(input_json: &str) -> NapiResult<Request<T>> {
    let request: Request<T> = serde_json::from_str(input_json).map_err(to_napi_error)?;
    request.params.validate().map_err(to_napi_error)?;
    Ok(request)
}

#[derive(Deserialize)]
struct NoExtra {}

// ---------------------------------------------------------------------------
// NPV
// ---------------------------------------------------------------------------

#[napi]
pub fn compare_npv(input_json: String) -> NapiResult<String> {
    let req = parse::<NoExtra>(&input_json)?;
    let output = NpvEngine::new(req.config.npv).compare(&req.params);
    to_json(&output)
}

#[napi]
pub fn analyze_npv(input_json: String) -> NapiResult<String> {
    let req = parse::<NoExtra>(&input_json)?;
    let output = NpvEngine::new(req.config.npv)
        .analyze(&req.params)
        .map_err(to_napi_error)?;
    to_json(&output)
}

#[derive(Deserialize)]
struct LoanInput {
    principal: Decimal,
    annual_rate_pct: Decimal,
    term_years: u32,
}

#[napi]
pub fn amortization_schedule(input_json: String) -> NapiResult<String> {
    let input: LoanInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = amortization::schedule(input.principal, input.annual_rate_pct, input.term_years)
        .map_err(to_napi_error)?;
    to_json(&output)
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct DecisionExtra {
    #[serde(default)]
    risk_tolerance: RiskTolerance,
}

#[napi]
pub fn make_decision(input_json: String) -> NapiResult<String> {
    let req = parse::<DecisionExtra>(&input_json)?;
    let npv = NpvEngine::new(req.config.npv).compare(&req.params);
    let output = decision::run_decision(&npv, req.extra.risk_tolerance).map_err(to_napi_error)?;
    to_json(&output)
}

#[derive(Deserialize)]
struct BatchDecisionInput {
    results: Vec<NpvResult>,
    #[serde(default)]
    risk_tolerance: RiskTolerance,
}

#[napi]
pub fn compare_decisions(input_json: String) -> NapiResult<String> {
    let input: BatchDecisionInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        decision::compare_decisions(&input.results, input.risk_tolerance).map_err(to_napi_error)?;
    to_json(&output)
}

// ---------------------------------------------------------------------------
// Sensitivity
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct SweepExtra {
    parameter: ParameterKey,
    values: Vec<Decimal>,
}

#[napi]
pub fn run_sensitivity(input_json: String) -> NapiResult<String> {
    let req = parse::<SweepExtra>(&input_json)?;
    let npv = NpvEngine::new(req.config.npv.clone());
    let output = SensitivityEngine::new(&npv, &req.config)
        .run_sweep(&req.params, req.extra.parameter, &req.extra.values)
        .map_err(to_napi_error)?;
    to_json(&output)
}

#[derive(Deserialize)]
struct GridExtra {
    x_parameter: ParameterKey,
    y_parameter: ParameterKey,
    #[serde(default = "default_deltas")]
    x_deltas: Vec<Decimal>,
    #[serde(default = "default_deltas")]
    y_deltas: Vec<Decimal>,
}

#[napi]
pub fn run_sensitivity_2d(input_json: String) -> NapiResult<String> {
    let req = parse::<GridExtra>(&input_json)?;
    let npv = NpvEngine::new(req.config.npv.clone());
    let g = &req.extra;
    let output = SensitivityEngine::new(&npv, &req.config)
        .run_sweep_2d(&req.params, g.x_parameter, g.y_parameter, &g.x_deltas, &g.y_deltas)
        .map_err(to_napi_error)?;
    to_json(&output)
}

#[derive(Deserialize)]
struct BreakEvenExtra {
    parameter: ParameterKey,
    lower_bound: Decimal,
    upper_bound: Decimal,
}

#[napi]
pub fn find_break_even(input_json: String) -> NapiResult<String> {
    let req = parse::<BreakEvenExtra>(&input_json)?;
    let npv = NpvEngine::new(req.config.npv.clone());
    let b = &req.extra;
    let output = SensitivityEngine::new(&npv, &req.config)
        .run_break_even(&req.params, b.parameter, b.lower_bound, b.upper_bound)
        .map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn run_tornado(input_json: String) -> NapiResult<String> {
    let req = parse::<NoExtra>(&input_json)?;
    let npv = NpvEngine::new(req.config.npv.clone());
    let output = SensitivityEngine::new(&npv, &req.config)
        .comprehensive(&req.params)
        .map_err(to_napi_error)?;
    to_json(&output)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ScenarioExtra {
    #[serde(default = "scenarios::default_scenarios")]
    scenarios: Vec<EconomicScenario>,
}

#[napi]
pub fn run_scenarios(input_json: String) -> NapiResult<String> {
    let req = parse::<ScenarioExtra>(&input_json)?;
    let engine = NpvEngine::new(req.config.npv);
    let output = scenarios::run_scenarios(&engine, &req.params, &req.extra.scenarios)
        .map_err(to_napi_error)?;
    to_json(&output)
}
