//! The flat, strongly typed parameter record every engine call consumes.
//!
//! All percentages are whole-number percents (5 = 5%) and all rates are
//! annual. Any subset of fields may be supplied when deserializing; the
//! remainder fall back to [`CalculationParameters::default`].

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::LeaseBuyError;
use crate::time_value::{checked_difference, percent_of};
use crate::types::{Money, Percent, SquareMetres};
use crate::LeaseBuyResult;

/// Largest amount accepted for any money field at the boundary.
pub const MAX_MONEY: Money = dec!(1000000000000000);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculationParameters {
    // Acquisition
    pub purchase_price: Money,
    pub down_payment_pct: Percent,
    pub interest_rate: Percent,
    pub loan_term: u32,
    pub transaction_costs: Money,
    pub space_improvement_cost: Money,

    // Rental
    pub current_annual_rent: Money,
    pub rent_increase_rate: Percent,
    pub security_deposit: Money,
    pub rental_commission: Money,
    pub moving_costs: Money,

    // Horizon
    pub analysis_period: u32,
    pub cost_of_capital: Percent,

    // Recurring ownership costs
    pub property_tax_rate: Percent,
    pub property_tax_escalation: Percent,
    pub insurance_cost: Money,
    pub annual_maintenance: Money,
    pub property_management: Money,
    pub capex_reserve_rate: Percent,
    pub obsolescence_risk_rate: Percent,
    pub inflation_rate: Percent,

    // Terminal value
    pub land_value_pct: Percent,
    pub market_appreciation_rate: Percent,
    pub depreciation_period: u32,

    // Tax
    pub corporate_tax_rate: Percent,
    pub interest_deductible: bool,
    pub property_tax_deductible: bool,
    pub depreciation_deductible: bool,
    pub rent_deductible: bool,

    // Major renovations
    pub property_upgrade_cycle: u32,
    pub property_upgrade_cost_pct: Percent,

    // Space, growth and subletting
    pub ownership_property_size: SquareMetres,
    pub rental_property_size: SquareMetres,
    pub current_space_needed: SquareMetres,
    pub future_expansion_year: Option<u32>,
    pub additional_space_needed: SquareMetres,
    pub subletting_potential: bool,
    /// Annual income per square metre sublet, in year-1 money.
    pub subletting_rate: Money,
    pub subletting_space_sqm: SquareMetres,
    pub subletting_occupancy: Percent,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_date: Option<NaiveDate>,
}

impl Default for CalculationParameters {
    fn default() -> Self {
        Self {
            purchase_price: dec!(500000),
            down_payment_pct: dec!(30),
            interest_rate: dec!(5),
            loan_term: 20,
            transaction_costs: Decimal::ZERO,
            space_improvement_cost: Decimal::ZERO,

            current_annual_rent: dec!(24000),
            rent_increase_rate: dec!(3),
            security_deposit: Decimal::ZERO,
            rental_commission: Decimal::ZERO,
            moving_costs: Decimal::ZERO,

            analysis_period: 25,
            cost_of_capital: dec!(8),

            property_tax_rate: dec!(1.2),
            property_tax_escalation: dec!(2),
            insurance_cost: dec!(5000),
            annual_maintenance: dec!(10000),
            property_management: Decimal::ZERO,
            capex_reserve_rate: dec!(1.5),
            obsolescence_risk_rate: dec!(0.5),
            inflation_rate: dec!(3),

            land_value_pct: dec!(25),
            market_appreciation_rate: dec!(3),
            depreciation_period: 39,

            corporate_tax_rate: dec!(25),
            interest_deductible: true,
            property_tax_deductible: true,
            depreciation_deductible: true,
            rent_deductible: true,

            property_upgrade_cycle: 15,
            property_upgrade_cost_pct: dec!(2),

            ownership_property_size: Decimal::ZERO,
            rental_property_size: Decimal::ZERO,
            current_space_needed: Decimal::ZERO,
            future_expansion_year: Some(10),
            additional_space_needed: Decimal::ZERO,
            subletting_potential: false,
            subletting_rate: Decimal::ZERO,
            subletting_space_sqm: Decimal::ZERO,
            subletting_occupancy: dec!(85),

            analysis_date: None,
        }
    }
}

impl CalculationParameters {
    pub fn down_payment(&self) -> LeaseBuyResult<Money> {
        percent_of(self.purchase_price, self.down_payment_pct)
    }

    pub fn loan_amount(&self) -> LeaseBuyResult<Money> {
        checked_difference("loan amount", self.purchase_price, self.down_payment()?)
    }

    pub fn land_value(&self) -> LeaseBuyResult<Money> {
        percent_of(self.purchase_price, self.land_value_pct)
    }

    pub fn building_value(&self) -> LeaseBuyResult<Money> {
        checked_difference("building value", self.purchase_price, self.land_value()?)
    }

    /// False when the loan amount cannot be computed; `check_computable` reports that case.
    pub fn has_loan(&self) -> bool {
        self.loan_amount().is_ok_and(|loan| loan > Decimal::ZERO)
    }

    /// Calendar year label for a 1-indexed analysis year, when a start date is known.
    pub fn calendar_year(&self, year: u32) -> Option<i32> {
        self.analysis_date
            .map(|d| d.year() + year as i32 - 1)
    }

    /// Return a copy with a single numeric field replaced.
    pub fn with_override(&self, key: ParameterKey, value: Decimal) -> LeaseBuyResult<Self> {
        let mut next = self.clone();
        key.apply(&mut next, value)?;
        Ok(next)
    }

    /// Narrow checks the engine itself relies on. Range and plausibility
    /// checks belong to [`CalculationParameters::validate`].
    pub fn check_computable(&self) -> LeaseBuyResult<()> {
        let mut errors = Vec::new();

        let non_negative = [
            ("purchase_price", self.purchase_price),
            ("transaction_costs", self.transaction_costs),
            ("space_improvement_cost", self.space_improvement_cost),
            ("current_annual_rent", self.current_annual_rent),
            ("security_deposit", self.security_deposit),
            ("rental_commission", self.rental_commission),
            ("moving_costs", self.moving_costs),
            ("insurance_cost", self.insurance_cost),
            ("annual_maintenance", self.annual_maintenance),
            ("property_management", self.property_management),
            ("interest_rate", self.interest_rate),
        ];
        for (field, value) in non_negative {
            if value < Decimal::ZERO {
                errors.push(format!("{field} must be non-negative (got {value})"));
            }
        }

        for (field, value) in [
            ("down_payment_pct", self.down_payment_pct),
            ("land_value_pct", self.land_value_pct),
        ] {
            if value < Decimal::ZERO || value > dec!(100) {
                errors.push(format!("{field} must be between 0 and 100 (got {value})"));
            }
        }

        if self.analysis_period < 1 {
            errors.push("analysis_period must be at least 1 year".into());
        }
        if self.cost_of_capital <= dec!(-100) {
            errors.push(format!(
                "cost_of_capital must be greater than -100 (got {})",
                self.cost_of_capital
            ));
        }
        match self.loan_amount() {
            Ok(loan) if loan > Decimal::ZERO && self.loan_term == 0 => {
                errors.push("loan_term must be at least 1 year when the purchase is financed".into());
            }
            Ok(_) => {}
            Err(e) => errors.push(format!("purchase_price cannot be financed: {e}")),
        }
        if self.depreciation_period == 0 {
            errors.push("depreciation_period must be at least 1 year".into());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(LeaseBuyError::Validation(errors))
        }
    }

    /// Full boundary validation, collecting every failure.
    pub fn validate(&self) -> LeaseBuyResult<()> {
        let mut errors = match self.check_computable() {
            Ok(()) => Vec::new(),
            Err(e) => e.validation_errors(),
        };

        if self.purchase_price <= Decimal::ZERO {
            errors.push("purchase_price must be positive".into());
        }
        for (field, value) in [
            ("purchase_price", self.purchase_price),
            ("transaction_costs", self.transaction_costs),
            ("space_improvement_cost", self.space_improvement_cost),
            ("current_annual_rent", self.current_annual_rent),
            ("security_deposit", self.security_deposit),
            ("rental_commission", self.rental_commission),
            ("moving_costs", self.moving_costs),
            ("insurance_cost", self.insurance_cost),
            ("annual_maintenance", self.annual_maintenance),
            ("property_management", self.property_management),
            ("subletting_rate", self.subletting_rate),
        ] {
            if value > MAX_MONEY {
                errors.push(format!("{field} must not exceed {MAX_MONEY} (got {value})"));
            }
        }
        if self.interest_rate > dec!(50) {
            errors.push(format!("interest_rate must not exceed 50 (got {})", self.interest_rate));
        }
        if self.loan_term > 50 {
            errors.push(format!("loan_term must not exceed 50 years (got {})", self.loan_term));
        }
        if self.analysis_period > 100 {
            errors.push(format!(
                "analysis_period must not exceed 100 years (got {})",
                self.analysis_period
            ));
        }
        if self.cost_of_capital > dec!(100) {
            errors.push(format!(
                "cost_of_capital must not exceed 100 (got {})",
                self.cost_of_capital
            ));
        }

        for (field, value) in [
            ("property_tax_rate", self.property_tax_rate),
            ("capex_reserve_rate", self.capex_reserve_rate),
            ("obsolescence_risk_rate", self.obsolescence_risk_rate),
            ("corporate_tax_rate", self.corporate_tax_rate),
            ("property_upgrade_cost_pct", self.property_upgrade_cost_pct),
            ("subletting_occupancy", self.subletting_occupancy),
        ] {
            if value < Decimal::ZERO || value > dec!(100) {
                errors.push(format!("{field} must be between 0 and 100 (got {value})"));
            }
        }

        for (field, value) in [
            ("rent_increase_rate", self.rent_increase_rate),
            ("property_tax_escalation", self.property_tax_escalation),
            ("inflation_rate", self.inflation_rate),
            ("market_appreciation_rate", self.market_appreciation_rate),
        ] {
            if value <= dec!(-100) || value > dec!(100) {
                errors.push(format!("{field} must be within (-100, 100] (got {value})"));
            }
        }

        for (field, value) in [
            ("ownership_property_size", self.ownership_property_size),
            ("rental_property_size", self.rental_property_size),
            ("current_space_needed", self.current_space_needed),
            ("additional_space_needed", self.additional_space_needed),
            ("subletting_rate", self.subletting_rate),
            ("subletting_space_sqm", self.subletting_space_sqm),
        ] {
            if value < Decimal::ZERO {
                errors.push(format!("{field} must be non-negative (got {value})"));
            }
        }

        if self.current_space_needed > Decimal::ZERO {
            if self.ownership_property_size > Decimal::ZERO
                && self.current_space_needed > self.ownership_property_size
            {
                errors.push(format!(
                    "current_space_needed ({}) exceeds ownership_property_size ({})",
                    self.current_space_needed, self.ownership_property_size
                ));
            }
            if self.rental_property_size > Decimal::ZERO
                && self.current_space_needed > self.rental_property_size
            {
                errors.push(format!(
                    "current_space_needed ({}) exceeds rental_property_size ({})",
                    self.current_space_needed, self.rental_property_size
                ));
            }
        }

        if let Some(year) = self.future_expansion_year {
            if year == 0 {
                errors.push("future_expansion_year is 1-indexed".into());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(LeaseBuyError::Validation(errors))
        }
    }
}

// ---------------------------------------------------------------------------
// Parameter keys
// ---------------------------------------------------------------------------

/// Numerically overridable fields, used by sensitivity sweeps and scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKey {
    PurchasePrice,
    DownPaymentPct,
    InterestRate,
    LoanTerm,
    TransactionCosts,
    SpaceImprovementCost,
    CurrentAnnualRent,
    RentIncreaseRate,
    SecurityDeposit,
    RentalCommission,
    MovingCosts,
    AnalysisPeriod,
    CostOfCapital,
    PropertyTaxRate,
    PropertyTaxEscalation,
    InsuranceCost,
    AnnualMaintenance,
    PropertyManagement,
    CapexReserveRate,
    ObsolescenceRiskRate,
    InflationRate,
    LandValuePct,
    MarketAppreciationRate,
    DepreciationPeriod,
    CorporateTaxRate,
    PropertyUpgradeCycle,
    PropertyUpgradeCostPct,
    AdditionalSpaceNeeded,
    SublettingRate,
    SublettingSpaceSqm,
    SublettingOccupancy,
}

impl ParameterKey {
    pub const ALL: [ParameterKey; 31] = [
        ParameterKey::PurchasePrice,
        ParameterKey::DownPaymentPct,
        ParameterKey::InterestRate,
        ParameterKey::LoanTerm,
        ParameterKey::TransactionCosts,
        ParameterKey::SpaceImprovementCost,
        ParameterKey::CurrentAnnualRent,
        ParameterKey::RentIncreaseRate,
        ParameterKey::SecurityDeposit,
        ParameterKey::RentalCommission,
        ParameterKey::MovingCosts,
        ParameterKey::AnalysisPeriod,
        ParameterKey::CostOfCapital,
        ParameterKey::PropertyTaxRate,
        ParameterKey::PropertyTaxEscalation,
        ParameterKey::InsuranceCost,
        ParameterKey::AnnualMaintenance,
        ParameterKey::PropertyManagement,
        ParameterKey::CapexReserveRate,
        ParameterKey::ObsolescenceRiskRate,
        ParameterKey::InflationRate,
        ParameterKey::LandValuePct,
        ParameterKey::MarketAppreciationRate,
        ParameterKey::DepreciationPeriod,
        ParameterKey::CorporateTaxRate,
        ParameterKey::PropertyUpgradeCycle,
        ParameterKey::PropertyUpgradeCostPct,
        ParameterKey::AdditionalSpaceNeeded,
        ParameterKey::SublettingRate,
        ParameterKey::SublettingSpaceSqm,
        ParameterKey::SublettingOccupancy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterKey::PurchasePrice => "purchase_price",
            ParameterKey::DownPaymentPct => "down_payment_pct",
            ParameterKey::InterestRate => "interest_rate",
            ParameterKey::LoanTerm => "loan_term",
            ParameterKey::TransactionCosts => "transaction_costs",
            ParameterKey::SpaceImprovementCost => "space_improvement_cost",
            ParameterKey::CurrentAnnualRent => "current_annual_rent",
            ParameterKey::RentIncreaseRate => "rent_increase_rate",
            ParameterKey::SecurityDeposit => "security_deposit",
            ParameterKey::RentalCommission => "rental_commission",
            ParameterKey::MovingCosts => "moving_costs",
            ParameterKey::AnalysisPeriod => "analysis_period",
            ParameterKey::CostOfCapital => "cost_of_capital",
            ParameterKey::PropertyTaxRate => "property_tax_rate",
            ParameterKey::PropertyTaxEscalation => "property_tax_escalation",
            ParameterKey::InsuranceCost => "insurance_cost",
            ParameterKey::AnnualMaintenance => "annual_maintenance",
            ParameterKey::PropertyManagement => "property_management",
            ParameterKey::CapexReserveRate => "capex_reserve_rate",
            ParameterKey::ObsolescenceRiskRate => "obsolescence_risk_rate",
            ParameterKey::InflationRate => "inflation_rate",
            ParameterKey::LandValuePct => "land_value_pct",
            ParameterKey::MarketAppreciationRate => "market_appreciation_rate",
            ParameterKey::DepreciationPeriod => "depreciation_period",
            ParameterKey::CorporateTaxRate => "corporate_tax_rate",
            ParameterKey::PropertyUpgradeCycle => "property_upgrade_cycle",
            ParameterKey::PropertyUpgradeCostPct => "property_upgrade_cost_pct",
            ParameterKey::AdditionalSpaceNeeded => "additional_space_needed",
            ParameterKey::SublettingRate => "subletting_rate",
            ParameterKey::SublettingSpaceSqm => "subletting_space_sqm",
            ParameterKey::SublettingOccupancy => "subletting_occupancy",
        }
    }

    /// Human-readable label for tables and reasoning text.
    pub fn label(&self) -> String {
        let s = self.as_str().replace('_', " ");
        let mut chars = s.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => String::new(),
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ParameterKey::LoanTerm
                | ParameterKey::AnalysisPeriod
                | ParameterKey::DepreciationPeriod
                | ParameterKey::PropertyUpgradeCycle
        )
    }

    pub fn get(&self, p: &CalculationParameters) -> Decimal {
        match self {
            ParameterKey::PurchasePrice => p.purchase_price,
            ParameterKey::DownPaymentPct => p.down_payment_pct,
            ParameterKey::InterestRate => p.interest_rate,
            ParameterKey::LoanTerm => Decimal::from(p.loan_term),
            ParameterKey::TransactionCosts => p.transaction_costs,
            ParameterKey::SpaceImprovementCost => p.space_improvement_cost,
            ParameterKey::CurrentAnnualRent => p.current_annual_rent,
            ParameterKey::RentIncreaseRate => p.rent_increase_rate,
            ParameterKey::SecurityDeposit => p.security_deposit,
            ParameterKey::RentalCommission => p.rental_commission,
            ParameterKey::MovingCosts => p.moving_costs,
            ParameterKey::AnalysisPeriod => Decimal::from(p.analysis_period),
            ParameterKey::CostOfCapital => p.cost_of_capital,
            ParameterKey::PropertyTaxRate => p.property_tax_rate,
            ParameterKey::PropertyTaxEscalation => p.property_tax_escalation,
            ParameterKey::InsuranceCost => p.insurance_cost,
            ParameterKey::AnnualMaintenance => p.annual_maintenance,
            ParameterKey::PropertyManagement => p.property_management,
            ParameterKey::CapexReserveRate => p.capex_reserve_rate,
            ParameterKey::ObsolescenceRiskRate => p.obsolescence_risk_rate,
            ParameterKey::InflationRate => p.inflation_rate,
            ParameterKey::LandValuePct => p.land_value_pct,
            ParameterKey::MarketAppreciationRate => p.market_appreciation_rate,
            ParameterKey::DepreciationPeriod => Decimal::from(p.depreciation_period),
            ParameterKey::CorporateTaxRate => p.corporate_tax_rate,
            ParameterKey::PropertyUpgradeCycle => Decimal::from(p.property_upgrade_cycle),
            ParameterKey::PropertyUpgradeCostPct => p.property_upgrade_cost_pct,
            ParameterKey::AdditionalSpaceNeeded => p.additional_space_needed,
            ParameterKey::SublettingRate => p.subletting_rate,
            ParameterKey::SublettingSpaceSqm => p.subletting_space_sqm,
            ParameterKey::SublettingOccupancy => p.subletting_occupancy,
        }
    }

    /// Write `value` into the field. Integer fields round half-to-even and
    /// reject negative values.
    pub fn apply(&self, p: &mut CalculationParameters, value: Decimal) -> LeaseBuyResult<()> {
        match self {
            ParameterKey::PurchasePrice => p.purchase_price = value,
            ParameterKey::DownPaymentPct => p.down_payment_pct = value,
            ParameterKey::InterestRate => p.interest_rate = value,
            ParameterKey::LoanTerm => p.loan_term = to_whole_years(*self, value)?,
            ParameterKey::TransactionCosts => p.transaction_costs = value,
            ParameterKey::SpaceImprovementCost => p.space_improvement_cost = value,
            ParameterKey::CurrentAnnualRent => p.current_annual_rent = value,
            ParameterKey::RentIncreaseRate => p.rent_increase_rate = value,
            ParameterKey::SecurityDeposit => p.security_deposit = value,
            ParameterKey::RentalCommission => p.rental_commission = value,
            ParameterKey::MovingCosts => p.moving_costs = value,
            ParameterKey::AnalysisPeriod => p.analysis_period = to_whole_years(*self, value)?,
            ParameterKey::CostOfCapital => p.cost_of_capital = value,
            ParameterKey::PropertyTaxRate => p.property_tax_rate = value,
            ParameterKey::PropertyTaxEscalation => p.property_tax_escalation = value,
            ParameterKey::InsuranceCost => p.insurance_cost = value,
            ParameterKey::AnnualMaintenance => p.annual_maintenance = value,
            ParameterKey::PropertyManagement => p.property_management = value,
            ParameterKey::CapexReserveRate => p.capex_reserve_rate = value,
            ParameterKey::ObsolescenceRiskRate => p.obsolescence_risk_rate = value,
            ParameterKey::InflationRate => p.inflation_rate = value,
            ParameterKey::LandValuePct => p.land_value_pct = value,
            ParameterKey::MarketAppreciationRate => p.market_appreciation_rate = value,
            ParameterKey::DepreciationPeriod => {
                p.depreciation_period = to_whole_years(*self, value)?
            }
            ParameterKey::CorporateTaxRate => p.corporate_tax_rate = value,
            ParameterKey::PropertyUpgradeCycle => {
                p.property_upgrade_cycle = to_whole_years(*self, value)?
            }
            ParameterKey::PropertyUpgradeCostPct => p.property_upgrade_cost_pct = value,
            ParameterKey::AdditionalSpaceNeeded => p.additional_space_needed = value,
            ParameterKey::SublettingRate => p.subletting_rate = value,
            ParameterKey::SublettingSpaceSqm => p.subletting_space_sqm = value,
            ParameterKey::SublettingOccupancy => p.subletting_occupancy = value,
        }
        Ok(())
    }
}

fn to_whole_years(key: ParameterKey, value: Decimal) -> LeaseBuyResult<u32> {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        .to_u32()
        .ok_or_else(|| LeaseBuyError::InvalidInput {
            field: key.as_str().into(),
            reason: format!("expected a non-negative whole number of years, got {value}"),
        })
}

impl fmt::Display for ParameterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParameterKey {
    type Err = LeaseBuyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParameterKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| LeaseBuyError::InvalidInput {
                field: "parameter".into(),
                reason: format!("unknown parameter '{s}'"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults_are_computable() {
        let p = CalculationParameters::default();
        assert!(p.check_computable().is_ok());
        assert!(p.validate().is_ok());
        assert_eq!(p.down_payment().unwrap(), dec!(150000));
        assert_eq!(p.loan_amount().unwrap(), dec!(350000));
        assert_eq!(p.building_value().unwrap(), dec!(375000));
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let p: CalculationParameters =
            serde_json::from_str(r#"{"purchase_price": "750000", "analysis_period": 15}"#).unwrap();
        assert_eq!(p.purchase_price, dec!(750000));
        assert_eq!(p.analysis_period, 15);
        assert_eq!(p.cost_of_capital, dec!(8));
    }

    #[test]
    fn test_validation_collects_every_error() {
        let p = CalculationParameters {
            purchase_price: dec!(-1),
            down_payment_pct: dec!(120),
            analysis_period: 0,
            ..Default::default()
        };
        match p.validate() {
            Err(LeaseBuyError::Validation(errors)) => assert!(errors.len() >= 3),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_financed_purchase_needs_loan_term() {
        let p = CalculationParameters {
            loan_term: 0,
            ..Default::default()
        };
        assert!(p.check_computable().is_err());

        let cash = CalculationParameters {
            loan_term: 0,
            down_payment_pct: dec!(100),
            ..Default::default()
        };
        assert!(cash.check_computable().is_ok());
    }

    #[test]
    fn test_space_check_only_in_full_validation() {
        let p = CalculationParameters {
            ownership_property_size: dec!(1000),
            current_space_needed: dec!(1500),
            ..Default::default()
        };
        assert!(p.check_computable().is_ok());
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_parameter_key_roundtrip_and_override() {
        for key in ParameterKey::ALL {
            assert_eq!(key.as_str().parse::<ParameterKey>().unwrap(), key);
        }
        let base = CalculationParameters::default();
        let p = base.with_override(ParameterKey::InterestRate, dec!(7.5)).unwrap();
        assert_eq!(p.interest_rate, dec!(7.5));
        assert_eq!(ParameterKey::InterestRate.get(&p), dec!(7.5));
    }

    #[test]
    fn test_integer_override_rounds_half_even() {
        let base = CalculationParameters::default();
        let p = base.with_override(ParameterKey::LoanTerm, dec!(22.5)).unwrap();
        assert_eq!(p.loan_term, 22);
        assert!(base.with_override(ParameterKey::AnalysisPeriod, dec!(-3)).is_err());
    }

    #[test]
    fn test_calendar_year_label() {
        let p = CalculationParameters {
            analysis_date: NaiveDate::from_ymd_opt(2026, 1, 1),
            ..Default::default()
        };
        assert_eq!(p.calendar_year(1), Some(2026));
        assert_eq!(p.calendar_year(25), Some(2050));
    }
}
