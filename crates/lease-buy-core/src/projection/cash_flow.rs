//! Year-by-year operating cash flows for the ownership and rental scenarios.
//!
//! Years are 1-indexed and every escalating line item equals its base value
//! in year 1. Flows are signed: negative `net_cash_flow` is a net outflow.
//! Terminal values are not included here.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LeaseBuyError;
use crate::params::CalculationParameters;
use crate::projection::amortization::{self, AmortizationEntry};
use crate::time_value::{
    checked_difference, checked_product, checked_total, escalate, percent_of, present_value,
};
use crate::types::{Money, SquareMetres};
use crate::LeaseBuyResult;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipCashFlow {
    pub year: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_year: Option<i32>,
    pub mortgage_payment: Money,
    pub mortgage_interest: Money,
    pub mortgage_principal: Money,
    pub property_taxes: Money,
    pub insurance: Money,
    pub maintenance: Money,
    pub property_management: Money,
    pub capex_reserve: Money,
    pub obsolescence_cost: Money,
    pub upgrade_cost: Money,
    pub expansion_cost: Money,
    pub depreciation: Money,
    pub tax_benefit: Money,
    pub subletting_income: Money,
    pub total_costs: Money,
    pub net_cash_flow: Money,
    pub remaining_loan_balance: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalCashFlow {
    pub year: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_year: Option<i32>,
    pub annual_rent: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rent_per_sqm: Option<Money>,
    pub additional_rent: Money,
    pub total_rent: Money,
    pub tax_benefit: Money,
    pub net_cash_flow: Money,
}

/// One year of the ownership-versus-rental comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearComparison {
    pub year: u32,
    pub ownership_net: Money,
    pub rental_net: Money,
    /// Ownership minus rental; positive means ownership is cheaper that year.
    pub annual_difference: Money,
    pub cumulative_difference: Money,
    pub pv_difference: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFlowComparison {
    pub years: Vec<YearComparison>,
    pub cumulative_difference: Money,
    pub average_annual_difference: Money,
    pub pv_difference: Money,
    /// First year the ownership outflow is smaller than the rental outflow.
    pub operational_break_even_year: Option<u32>,
}

// ---------------------------------------------------------------------------
// Ownership
// ---------------------------------------------------------------------------

pub fn project_ownership_flows(
    params: &CalculationParameters,
) -> LeaseBuyResult<Vec<OwnershipCashFlow>> {
    let p = params;
    let loan_amount = p.loan_amount()?;
    let loan: Vec<AmortizationEntry> = if loan_amount > Decimal::ZERO {
        amortization::schedule(loan_amount, p.interest_rate, p.loan_term)?
    } else {
        Vec::new()
    };

    let building_value = p.building_value()?;
    let property_tax_base = percent_of(p.purchase_price, p.property_tax_rate)?;
    let capex_base = percent_of(p.purchase_price, p.capex_reserve_rate)?;
    let obsolescence_base = percent_of(p.purchase_price, p.obsolescence_risk_rate)?;
    let upgrade_base = percent_of(building_value, p.property_upgrade_cost_pct)?;
    let annual_depreciation = if p.depreciation_period > 0 {
        building_value / Decimal::from(p.depreciation_period)
    } else {
        Decimal::ZERO
    };

    let mut flows = Vec::with_capacity(p.analysis_period as usize);

    for year in 1..=p.analysis_period {
        let (mortgage_payment, mortgage_interest, mortgage_principal, remaining_loan_balance) =
            match loan.get(year as usize - 1) {
                Some(entry) => (entry.payment, entry.interest, entry.principal, entry.closing_balance),
                None => (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
            };

        let property_taxes = escalate(property_tax_base, p.property_tax_escalation, year)?;
        let insurance = escalate(p.insurance_cost, p.inflation_rate, year)?;
        let maintenance = escalate(p.annual_maintenance, p.inflation_rate, year)?;
        let property_management = escalate(p.property_management, p.inflation_rate, year)?;
        let capex_reserve = escalate(capex_base, p.inflation_rate, year)?;
        let obsolescence_cost = escalate(obsolescence_base, p.inflation_rate, year)?;

        let upgrade_cost = if p.property_upgrade_cycle > 0 && year % p.property_upgrade_cycle == 0 {
            escalate(upgrade_base, p.inflation_rate, year)?
        } else {
            Decimal::ZERO
        };

        let expansion_cost = ownership_expansion_cost(p, year)?;
        let subletting_income = subletting_income(p, year)?;

        let depreciation = if year <= p.depreciation_period {
            annual_depreciation
        } else {
            Decimal::ZERO
        };

        let deductible = checked_total(
            "deductible expenses",
            [
                (p.interest_deductible, mortgage_interest),
                (p.property_tax_deductible, property_taxes),
                (p.depreciation_deductible, depreciation),
            ]
            .into_iter()
            .filter_map(|(flag, amount)| flag.then_some(amount)),
        )?;
        let tax_benefit = percent_of(deductible, p.corporate_tax_rate)?;

        let total_costs = checked_total(
            "ownership costs",
            [
                mortgage_payment,
                property_taxes,
                insurance,
                maintenance,
                property_management,
                capex_reserve,
                obsolescence_cost,
                upgrade_cost,
                expansion_cost,
            ],
        )?;
        let net_cash_flow =
            checked_total("ownership net cash flow", [-total_costs, tax_benefit, subletting_income])?;

        flows.push(OwnershipCashFlow {
            year,
            calendar_year: p.calendar_year(year),
            mortgage_payment,
            mortgage_interest,
            mortgage_principal,
            property_taxes,
            insurance,
            maintenance,
            property_management,
            capex_reserve,
            obsolescence_cost,
            upgrade_cost,
            expansion_cost,
            depreciation,
            tax_benefit,
            subletting_income,
            total_costs,
            net_cash_flow,
            remaining_loan_balance,
        });
    }

    Ok(flows)
}

// ---------------------------------------------------------------------------
// Rental
// ---------------------------------------------------------------------------

pub fn project_rental_flows(params: &CalculationParameters) -> LeaseBuyResult<Vec<RentalCashFlow>> {
    let p = params;
    let mut flows = Vec::with_capacity(p.analysis_period as usize);

    for year in 1..=p.analysis_period {
        let annual_rent = escalate(p.current_annual_rent, p.rent_increase_rate, year)?;
        let rent_per_sqm = market_rent_per_sqm(p, year)?;

        let additional_rent = match rent_per_sqm {
            Some(rate) if expanded(p, year) => {
                let extra_area = if p.rental_property_size > Decimal::ZERO {
                    shortfall(total_space_needed(p)?, p.rental_property_size)
                } else {
                    p.additional_space_needed
                };
                checked_product("additional rent", extra_area, rate)?
            }
            _ => Decimal::ZERO,
        };

        let total_rent = checked_total("total rent", [annual_rent, additional_rent])?;
        let tax_benefit = if p.rent_deductible {
            percent_of(total_rent, p.corporate_tax_rate)?
        } else {
            Decimal::ZERO
        };
        let net_cash_flow = checked_total("rental net cash flow", [-total_rent, tax_benefit])?;

        flows.push(RentalCashFlow {
            year,
            calendar_year: p.calendar_year(year),
            annual_rent,
            rent_per_sqm,
            additional_rent,
            total_rent,
            tax_benefit,
            net_cash_flow,
        });
    }

    Ok(flows)
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// Line up both scenarios year by year and find the operational break-even.
pub fn compare_flows(
    ownership: &[OwnershipCashFlow],
    rental: &[RentalCashFlow],
    cost_of_capital: Decimal,
) -> LeaseBuyResult<CashFlowComparison> {
    let mut years = Vec::with_capacity(ownership.len());
    let mut cumulative = Decimal::ZERO;
    let mut pv_total = Decimal::ZERO;
    let mut break_even = None;

    for (own, rent) in ownership.iter().zip(rental.iter()) {
        let annual_difference =
            checked_difference("annual flow difference", own.net_cash_flow, rent.net_cash_flow)?;
        cumulative = checked_total("cumulative flow difference", [cumulative, annual_difference])?;
        let pv_difference = present_value(annual_difference, cost_of_capital, own.year)?;
        pv_total = checked_total("PV of flow differences", [pv_total, pv_difference])?;

        if break_even.is_none() && -own.net_cash_flow < -rent.net_cash_flow {
            break_even = Some(own.year);
        }

        years.push(YearComparison {
            year: own.year,
            ownership_net: own.net_cash_flow,
            rental_net: rent.net_cash_flow,
            annual_difference,
            cumulative_difference: cumulative,
            pv_difference,
        });
    }

    let average_annual_difference = if years.is_empty() {
        Decimal::ZERO
    } else {
        cumulative / Decimal::from(years.len() as u64)
    };

    Ok(CashFlowComparison {
        years,
        cumulative_difference: cumulative,
        average_annual_difference,
        pv_difference: pv_total,
        operational_break_even_year: break_even,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn expanded(p: &CalculationParameters, year: u32) -> bool {
    matches!(p.future_expansion_year, Some(start) if start > 0 && year >= start)
        && p.additional_space_needed > Decimal::ZERO
}

fn total_space_needed(p: &CalculationParameters) -> LeaseBuyResult<SquareMetres> {
    checked_total("space needed", [p.current_space_needed, p.additional_space_needed])
}

fn shortfall(needed: SquareMetres, available: SquareMetres) -> SquareMetres {
    (needed - available).max(Decimal::ZERO)
}

/// Year-`year` market rent per square metre, derived from the current rent
/// and the space it covers. `None` when no area is known.
fn market_rent_per_sqm(p: &CalculationParameters, year: u32) -> LeaseBuyResult<Option<Money>> {
    let base_area = if p.current_space_needed > Decimal::ZERO {
        p.current_space_needed
    } else {
        p.rental_property_size
    };
    if base_area <= Decimal::ZERO {
        return Ok(None);
    }
    let base_rate = p.current_annual_rent.checked_div(base_area).ok_or_else(|| {
        LeaseBuyError::CalculationError(format!(
            "rent per square metre overflowed ({} over {base_area} sqm)",
            p.current_annual_rent
        ))
    })?;
    Ok(Some(escalate(base_rate, p.rent_increase_rate, year)?))
}

/// Space beyond the owned building, leased at the market rate once expansion starts.
fn ownership_expansion_cost(p: &CalculationParameters, year: u32) -> LeaseBuyResult<Money> {
    if !expanded(p, year) || p.ownership_property_size <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    let extra_area = shortfall(total_space_needed(p)?, p.ownership_property_size);
    if extra_area.is_zero() {
        return Ok(Decimal::ZERO);
    }
    match market_rent_per_sqm(p, year)? {
        Some(rate) => checked_product("expansion cost", extra_area, rate),
        None => Ok(Decimal::ZERO),
    }
}

fn subletting_income(p: &CalculationParameters, year: u32) -> LeaseBuyResult<Money> {
    if !p.subletting_potential || p.ownership_property_size <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    let in_use = if expanded(p, year) {
        total_space_needed(p)?
    } else {
        p.current_space_needed
    };
    let available = shortfall(p.ownership_property_size, in_use);
    let sublet = p.subletting_space_sqm.min(available);
    let rate = escalate(p.subletting_rate, p.rent_increase_rate, year)?;
    percent_of(checked_product("subletting income", sublet, rate)?, p.subletting_occupancy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn base() -> CalculationParameters {
        CalculationParameters {
            purchase_price: dec!(500000),
            down_payment_pct: dec!(30),
            interest_rate: dec!(5),
            loan_term: 20,
            current_annual_rent: dec!(24000),
            rent_increase_rate: dec!(3),
            analysis_period: 25,
            cost_of_capital: dec!(8),
            ..Default::default()
        }
    }

    #[test]
    fn test_ownership_year_one_uses_base_values() {
        let flows = project_ownership_flows(&base()).unwrap();
        assert_eq!(flows.len(), 25);
        let y1 = &flows[0];
        assert_eq!(y1.property_taxes, dec!(6000));
        assert_eq!(y1.insurance, dec!(5000));
        assert_eq!(y1.maintenance, dec!(10000));
        assert_eq!(y1.capex_reserve, dec!(7500));
        assert_eq!(y1.obsolescence_cost, dec!(2500));
        assert_eq!(y1.mortgage_interest, dec!(17500));
    }

    #[test]
    fn test_ownership_escalation_year_two() {
        let flows = project_ownership_flows(&base()).unwrap();
        assert_eq!(flows[1].property_taxes, dec!(6120));
        assert_eq!(flows[1].insurance, dec!(5150));
        assert_eq!(flows[1].maintenance, dec!(10300));
    }

    #[test]
    fn test_mortgage_stops_after_term() {
        let flows = project_ownership_flows(&base()).unwrap();
        assert!(flows[19].mortgage_payment > Decimal::ZERO);
        assert_eq!(flows[19].remaining_loan_balance, Decimal::ZERO);
        for f in &flows[20..] {
            assert_eq!(f.mortgage_payment, Decimal::ZERO);
            assert_eq!(f.mortgage_interest, Decimal::ZERO);
        }
    }

    #[test]
    fn test_mortgage_follows_amortization_schedule() {
        let p = base();
        let flows = project_ownership_flows(&p).unwrap();
        let schedule =
            amortization::schedule(p.loan_amount().unwrap(), p.interest_rate, p.loan_term).unwrap();

        for (flow, entry) in flows.iter().zip(&schedule) {
            assert_eq!(flow.mortgage_payment, entry.payment, "year {}", flow.year);
            assert_eq!(flow.mortgage_principal, entry.principal, "year {}", flow.year);
        }
        let repaid: Decimal = flows.iter().map(|f| f.mortgage_principal).sum();
        assert!((repaid - p.loan_amount().unwrap()).abs() < dec!(0.000001));
        assert_eq!(flows[19].mortgage_payment, flows[19].mortgage_principal + flows[19].mortgage_interest);
    }

    #[test]
    fn test_overflowing_price_is_an_error() {
        let p = CalculationParameters {
            purchase_price: dec!(50000000000000000000000000000),
            ..base()
        };
        assert!(matches!(
            project_ownership_flows(&p),
            Err(LeaseBuyError::CalculationError(_))
        ));
    }

    #[test]
    fn test_tax_benefit_respects_flags() {
        let p = CalculationParameters {
            interest_deductible: false,
            property_tax_deductible: false,
            depreciation_deductible: false,
            ..base()
        };
        let flows = project_ownership_flows(&p).unwrap();
        assert!(flows.iter().all(|f| f.tax_benefit.is_zero()));
    }

    #[test]
    fn test_depreciation_only_within_period() {
        let p = CalculationParameters {
            depreciation_period: 10,
            ..base()
        };
        let flows = project_ownership_flows(&p).unwrap();
        assert_eq!(flows[9].depreciation, dec!(37500));
        assert_eq!(flows[10].depreciation, Decimal::ZERO);
    }

    #[test]
    fn test_upgrade_cost_on_cycle_years() {
        let flows = project_ownership_flows(&base()).unwrap();
        assert_eq!(flows[13].upgrade_cost, Decimal::ZERO);
        assert!(flows[14].upgrade_cost > Decimal::ZERO);
    }

    #[test]
    fn test_net_cash_flow_identity() {
        for f in project_ownership_flows(&base()).unwrap() {
            assert_eq!(f.net_cash_flow, -f.total_costs + f.tax_benefit + f.subletting_income);
        }
    }

    #[test]
    fn test_rental_escalation() {
        let flows = project_rental_flows(&base()).unwrap();
        assert_eq!(flows[0].annual_rent, dec!(24000));
        assert_eq!(flows[1].annual_rent, dec!(24720));
        assert_eq!(flows[0].tax_benefit, dec!(6000));
        assert_eq!(flows[0].net_cash_flow, dec!(-18000));
    }

    #[test]
    fn test_rental_not_deductible() {
        let p = CalculationParameters {
            rent_deductible: false,
            ..base()
        };
        let flows = project_rental_flows(&p).unwrap();
        assert_eq!(flows[0].net_cash_flow, dec!(-24000));
    }

    #[test]
    fn test_expansion_adds_rent_and_ownership_cost() {
        let p = CalculationParameters {
            current_space_needed: dec!(1000),
            ownership_property_size: dec!(1200),
            rental_property_size: dec!(1000),
            additional_space_needed: dec!(500),
            future_expansion_year: Some(5),
            ..base()
        };
        let rental = project_rental_flows(&p).unwrap();
        assert_eq!(rental[3].additional_rent, Decimal::ZERO);
        // 500 sqm at 24/sqm escalated four years
        let expected = dec!(500) * dec!(24) * dec!(1.03) * dec!(1.03) * dec!(1.03) * dec!(1.03);
        assert!((rental[4].additional_rent - expected).abs() < dec!(0.0001));

        let own = project_ownership_flows(&p).unwrap();
        assert_eq!(own[3].expansion_cost, Decimal::ZERO);
        // only the 300 sqm beyond the owned building is leased
        assert!((own[4].expansion_cost - expected * dec!(0.6)).abs() < dec!(0.0001));
    }

    #[test]
    fn test_subletting_shrinks_after_expansion() {
        let p = CalculationParameters {
            current_space_needed: dec!(800),
            ownership_property_size: dec!(1200),
            additional_space_needed: dec!(300),
            future_expansion_year: Some(3),
            subletting_potential: true,
            subletting_rate: dec!(10),
            subletting_space_sqm: dec!(400),
            subletting_occupancy: dec!(100),
            rent_increase_rate: dec!(0),
            ..base()
        };
        let flows = project_ownership_flows(&p).unwrap();
        assert_eq!(flows[0].subletting_income, dec!(4000));
        assert_eq!(flows[2].subletting_income, dec!(1000));
    }

    #[test]
    fn test_all_cash_purchase_has_no_mortgage() {
        let p = CalculationParameters {
            down_payment_pct: dec!(100),
            ..base()
        };
        let flows = project_ownership_flows(&p).unwrap();
        assert!(flows.iter().all(|f| f.mortgage_payment.is_zero()));
    }

    #[test]
    fn test_compare_flows_break_even() {
        let p = base();
        let own = project_ownership_flows(&p).unwrap();
        let rent = project_rental_flows(&p).unwrap();
        let cmp = compare_flows(&own, &rent, p.cost_of_capital).unwrap();
        assert_eq!(cmp.years.len(), 25);
        let last = cmp.years.last().unwrap();
        assert_eq!(last.cumulative_difference, cmp.cumulative_difference);
        if let Some(year) = cmp.operational_break_even_year {
            let row = &cmp.years[year as usize - 1];
            assert!(row.ownership_net > row.rental_net);
        }
    }
}
