//! Residual values at the end of the analysis horizon.
//!
//! Land and building are split at acquisition and projected separately:
//! land only appreciates, while the building is depreciated straight-line
//! first and the depreciated basis then rides the same market appreciation.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::LeaseBuyError;
use crate::time_value::{
    checked_difference, checked_product, checked_total, future_value, percent_of,
};
use crate::types::{Money, Percent};
use crate::LeaseBuyResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalValueResult {
    pub initial_land_value: Money,
    pub final_land_value: Money,
    pub land_appreciation: Money,
    pub initial_building_value: Money,
    pub accumulated_depreciation: Money,
    pub depreciated_building_value: Money,
    pub final_building_value: Money,
    pub terminal_property_value: Money,
    pub remaining_loan_balance: Money,
    /// Terminal property value less the loan still outstanding. May be negative.
    pub net_property_equity: Money,
    pub security_deposit_recovery: Money,
    pub terminal_asset_value: Money,
}

/// Unspent capital invested at the cost of capital over the horizon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternativeInvestment {
    pub capital: Money,
    pub future_value: Money,
    pub present_value: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyValuePoint {
    pub year: u32,
    pub land_value: Money,
    pub building_value: Money,
    pub accumulated_depreciation: Money,
    pub total_value: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WealthComparison {
    pub ownership_wealth: Money,
    pub rental_wealth: Money,
    pub wealth_advantage: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wealth_advantage_pct: Option<Decimal>,
    pub ownership_superior: bool,
}

// ---------------------------------------------------------------------------
// Ownership
// ---------------------------------------------------------------------------

pub fn terminal_value(
    purchase_price: Money,
    land_value_pct: Percent,
    appreciation_rate_pct: Percent,
    depreciation_period_years: u32,
    analysis_period_years: u32,
    remaining_loan_balance: Money,
) -> LeaseBuyResult<TerminalValueResult> {
    check_inputs(purchase_price, land_value_pct, depreciation_period_years)?;

    let point = value_at(
        purchase_price,
        land_value_pct,
        appreciation_rate_pct,
        depreciation_period_years,
        analysis_period_years,
    )?;
    let initial_land_value = percent_of(purchase_price, land_value_pct)?;
    let initial_building_value = purchase_price - initial_land_value;
    let net_property_equity =
        checked_difference("net property equity", point.total_value, remaining_loan_balance)?;

    Ok(TerminalValueResult {
        initial_land_value,
        final_land_value: point.land_value,
        land_appreciation: point.land_value - initial_land_value,
        initial_building_value,
        accumulated_depreciation: point.accumulated_depreciation,
        depreciated_building_value: initial_building_value - point.accumulated_depreciation,
        final_building_value: point.building_value,
        terminal_property_value: point.total_value,
        remaining_loan_balance,
        net_property_equity,
        security_deposit_recovery: Decimal::ZERO,
        terminal_asset_value: point.total_value,
    })
}

/// Year-by-year land, building and total value from acquisition (year 0)
/// to the horizon.
pub fn property_value_path(
    purchase_price: Money,
    land_value_pct: Percent,
    appreciation_rate_pct: Percent,
    depreciation_period_years: u32,
    analysis_period_years: u32,
) -> LeaseBuyResult<Vec<PropertyValuePoint>> {
    check_inputs(purchase_price, land_value_pct, depreciation_period_years)?;
    (0..=analysis_period_years)
        .map(|year| {
            value_at(
                purchase_price,
                land_value_pct,
                appreciation_rate_pct,
                depreciation_period_years,
                year,
            )
        })
        .collect()
}

fn value_at(
    purchase_price: Money,
    land_value_pct: Percent,
    appreciation_rate_pct: Percent,
    depreciation_period_years: u32,
    year: u32,
) -> LeaseBuyResult<PropertyValuePoint> {
    let land0 = percent_of(purchase_price, land_value_pct)?;
    let building0 = purchase_price - land0;

    let depreciated_years = year.min(depreciation_period_years);
    let accumulated_depreciation =
        checked_product("accumulated depreciation", building0, Decimal::from(depreciated_years))?
            / Decimal::from(depreciation_period_years);
    let depreciated_basis = building0 - accumulated_depreciation;

    let land_value = future_value(land0, appreciation_rate_pct, year)?;
    let building_value = future_value(depreciated_basis, appreciation_rate_pct, year)?;

    Ok(PropertyValuePoint {
        year,
        land_value,
        building_value,
        accumulated_depreciation,
        total_value: checked_total("property value", [land_value, building_value])?,
    })
}

fn check_inputs(
    purchase_price: Money,
    land_value_pct: Percent,
    depreciation_period_years: u32,
) -> LeaseBuyResult<()> {
    if purchase_price < Decimal::ZERO {
        return Err(LeaseBuyError::InvalidTerminalValueInputs(format!(
            "purchase price must be non-negative, got {purchase_price}"
        )));
    }
    if land_value_pct < Decimal::ZERO || land_value_pct > dec!(100) {
        return Err(LeaseBuyError::InvalidTerminalValueInputs(format!(
            "land value percentage must be within [0, 100], got {land_value_pct}"
        )));
    }
    if depreciation_period_years == 0 {
        return Err(LeaseBuyError::InvalidTerminalValueInputs(
            "depreciation period must be at least one year".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Rental
// ---------------------------------------------------------------------------

/// Only the inflated security deposit comes back; the renter holds no asset.
pub fn rental_terminal_value(
    security_deposit: Money,
    inflation_rate_pct: Percent,
    analysis_period_years: u32,
) -> LeaseBuyResult<TerminalValueResult> {
    if security_deposit < Decimal::ZERO {
        return Err(LeaseBuyError::InvalidTerminalValueInputs(format!(
            "security deposit must be non-negative, got {security_deposit}"
        )));
    }
    let recovery = future_value(security_deposit, inflation_rate_pct, analysis_period_years)?;
    Ok(TerminalValueResult {
        security_deposit_recovery: recovery,
        ..Default::default()
    })
}

/// Capital not tied up in the property, compounded at the cost of capital.
/// Discounting back at the same rate returns the principal at par.
pub fn alternative_investment_value(
    capital: Money,
    cost_of_capital_pct: Percent,
    analysis_period_years: u32,
) -> LeaseBuyResult<AlternativeInvestment> {
    let future_value = future_value(capital, cost_of_capital_pct, analysis_period_years)?;
    Ok(AlternativeInvestment {
        capital,
        future_value,
        present_value: capital,
    })
}

/// Horizon wealth of each strategy in future-value terms. The percentage is
/// omitted when rental wealth is not positive or the ratio is unrepresentable.
pub fn wealth_comparison(
    ownership: &TerminalValueResult,
    rental: &TerminalValueResult,
    alternative: &AlternativeInvestment,
) -> LeaseBuyResult<WealthComparison> {
    let ownership_wealth = ownership.net_property_equity;
    let rental_wealth = checked_total(
        "rental wealth",
        [rental.security_deposit_recovery, alternative.future_value],
    )?;
    let wealth_advantage = checked_difference("wealth advantage", ownership_wealth, rental_wealth)?;
    let wealth_advantage_pct = if rental_wealth > Decimal::ZERO {
        wealth_advantage
            .checked_div(rental_wealth)
            .and_then(|r| r.checked_mul(dec!(100)))
    } else {
        None
    };

    Ok(WealthComparison {
        ownership_wealth,
        rental_wealth,
        wealth_advantage,
        wealth_advantage_pct,
        ownership_superior: wealth_advantage > Decimal::ZERO,
    })
}
