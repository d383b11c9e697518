use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use lease_buy_core::npv::NpvEngine;
use lease_buy_core::projection::{amortization, cash_flow, terminal_value};
use lease_buy_core::EngineConfig;

use super::ParamsArgs;
use crate::input;

pub fn run_compare(args: ParamsArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let params = input::load_params(args.input.as_deref())?;
    let result = NpvEngine::new(config.npv.clone()).compare(&params).into_result()?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_analyze(args: ParamsArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let params = input::load_params(args.input.as_deref())?;
    let result = NpvEngine::new(config.npv.clone()).analyze(&params)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for the loan amortization schedule
#[derive(Args)]
pub struct AmortizeArgs {
    /// Path to a parameter file; the loan is derived from price and down payment
    #[arg(long)]
    pub input: Option<String>,

    /// Loan principal (overrides the parameter file)
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Annual interest rate in percent, e.g. 5.5
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Loan term in years
    #[arg(long)]
    pub term: Option<u32>,
}

pub fn run_amortize(args: AmortizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let (principal, rate, term) = if let Some(principal) = args.principal {
        let rate = args.rate.ok_or("--rate is required with --principal")?;
        let term = args.term.ok_or("--term is required with --principal")?;
        (principal, rate, term)
    } else {
        let params = input::load_params(args.input.as_deref())?;
        (
            params.loan_amount()?,
            args.rate.unwrap_or(params.interest_rate),
            args.term.unwrap_or(params.loan_term),
        )
    };

    let schedule = amortization::schedule(principal, rate, term)?;
    let summary = amortization::summarize(principal, rate, term)?;
    Ok(json!({
        "result": {
            "summary": summary,
            "schedule": schedule,
        },
        "methodology": "Level annual payment; final year retires the remaining balance",
        "warnings": [],
    }))
}

pub fn run_cash_flows(args: ParamsArgs, _config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let params = input::load_params(args.input.as_deref())?;
    let ownership = cash_flow::project_ownership_flows(&params)?;
    let rental = cash_flow::project_rental_flows(&params)?;
    let comparison = cash_flow::compare_flows(&ownership, &rental, params.cost_of_capital)?;
    Ok(json!({
        "result": {
            "ownership": ownership,
            "rental": rental,
            "comparison": comparison,
        },
        "methodology": "Year-1 indexed operating cash flows, terminal values excluded",
        "warnings": [],
    }))
}

pub fn run_terminal_value(args: ParamsArgs, _config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let p = input::load_params(args.input.as_deref())?;
    let balance = if p.has_loan() {
        amortization::remaining_balance(p.loan_amount()?, p.interest_rate, p.loan_term, p.analysis_period)?
    } else {
        Decimal::ZERO
    };

    let ownership = terminal_value::terminal_value(
        p.purchase_price,
        p.land_value_pct,
        p.market_appreciation_rate,
        p.depreciation_period,
        p.analysis_period,
        balance,
    )?;
    let path = terminal_value::property_value_path(
        p.purchase_price,
        p.land_value_pct,
        p.market_appreciation_rate,
        p.depreciation_period,
        p.analysis_period,
    )?;
    let rental = terminal_value::rental_terminal_value(p.security_deposit, p.inflation_rate, p.analysis_period)?;
    let alternative =
        terminal_value::alternative_investment_value(p.down_payment()?, p.cost_of_capital, p.analysis_period)?;
    let wealth = terminal_value::wealth_comparison(&ownership, &rental, &alternative)?;

    Ok(json!({
        "result": {
            "ownership": ownership,
            "rental": rental,
            "alternative_investment": alternative,
            "wealth_comparison": wealth,
            "value_path": path,
        },
        "methodology": "Land and depreciated building compounded at market appreciation; rental keeps the down payment invested",
        "warnings": [],
    }))
}
