//! Ownership versus rental NPV comparison.
//!
//! The engine composes amortization, cash-flow projection and terminal
//! value into a single signed comparison. Engines are plain values built by
//! the caller; two calls with identical parameters return identical results.

use std::time::Instant;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::NpvConfig;
use crate::error::LeaseBuyError;
use crate::params::CalculationParameters;
use crate::projection::cash_flow::{
    compare_flows, project_ownership_flows, project_rental_flows, CashFlowComparison,
    OwnershipCashFlow, RentalCashFlow,
};
use crate::projection::terminal_value::{
    alternative_investment_value, rental_terminal_value, terminal_value, wealth_comparison,
    AlternativeInvestment, TerminalValueResult, WealthComparison,
};
use crate::time_value::{checked_difference, checked_total, discounted_sum, present_value};
use crate::types::{with_metadata, ComputationOutput, Money, Percent};
use crate::LeaseBuyResult;

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Buy,
    Rent,
    Marginal,
    Error,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Buy => "BUY",
            Recommendation::Rent => "RENT",
            Recommendation::Marginal => "MARGINAL",
            Recommendation::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfidenceLabel {
    High,
    Medium,
    Low,
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpvResult {
    pub calculation_successful: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub ownership_npv: Money,
    pub rental_npv: Money,
    /// Ownership minus rental. Positive favours buying.
    pub npv_difference: Money,
    pub ownership_initial_investment: Money,
    pub rental_initial_investment: Money,
    /// Present value of the ownership terminal value.
    pub ownership_terminal_value: Money,
    /// Present value of the rental terminal value.
    pub rental_terminal_value: Money,
    pub terminal_value_advantage: Money,
    pub recommendation: Recommendation,
    pub confidence: ConfidenceLabel,
    pub analysis_period: u32,
    pub cost_of_capital: Percent,
    pub input_parameters: CalculationParameters,
}

impl NpvResult {
    fn failure(params: &CalculationParameters, err: &LeaseBuyError) -> Self {
        Self {
            calculation_successful: false,
            error_message: Some(err.to_string()),
            validation_errors: err.validation_errors(),
            warnings: Vec::new(),
            ownership_npv: Decimal::ZERO,
            rental_npv: Decimal::ZERO,
            npv_difference: Decimal::ZERO,
            ownership_initial_investment: Decimal::ZERO,
            rental_initial_investment: Decimal::ZERO,
            ownership_terminal_value: Decimal::ZERO,
            rental_terminal_value: Decimal::ZERO,
            terminal_value_advantage: Decimal::ZERO,
            recommendation: Recommendation::Error,
            confidence: ConfidenceLabel::Low,
            analysis_period: params.analysis_period,
            cost_of_capital: params.cost_of_capital,
            input_parameters: params.clone(),
        }
    }

    /// The underlying error, for callers that want `?` semantics.
    pub fn into_result(self) -> LeaseBuyResult<Self> {
        if self.calculation_successful {
            Ok(self)
        } else if !self.validation_errors.is_empty() {
            Err(LeaseBuyError::Validation(self.validation_errors))
        } else {
            Err(LeaseBuyError::CalculationError(
                self.error_message.unwrap_or_default(),
            ))
        }
    }
}

/// Everything behind a comparison, for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpvAnalysis {
    pub summary: NpvResult,
    pub ownership_flows: Vec<OwnershipCashFlow>,
    pub rental_flows: Vec<RentalCashFlow>,
    pub ownership_pv_of_flows: Money,
    pub rental_pv_of_flows: Money,
    pub ownership_terminal: TerminalValueResult,
    pub rental_terminal: TerminalValueResult,
    pub alternative_investment: AlternativeInvestment,
    pub cash_flow_comparison: CashFlowComparison,
    pub wealth_comparison: WealthComparison,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct NpvEngine {
    config: NpvConfig,
}

impl NpvEngine {
    pub fn new(config: NpvConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NpvConfig {
        &self.config
    }

    /// Compare both scenarios. Failures come back as a structured result with
    /// `calculation_successful == false`, never as a panic or an `Err`.
    pub fn compare(&self, params: &CalculationParameters) -> NpvResult {
        match self.build(params) {
            Ok(analysis) => analysis.summary,
            Err(e) => {
                warn!(error = %e, "NPV comparison failed");
                NpvResult::failure(params, &e)
            }
        }
    }

    /// Full breakdown wrapped in the computation envelope.
    pub fn analyze(
        &self,
        params: &CalculationParameters,
    ) -> LeaseBuyResult<ComputationOutput<NpvAnalysis>> {
        let start = Instant::now();
        let analysis = self.build(params)?;
        let warnings = analysis.summary.warnings.clone();

        let elapsed = start.elapsed().as_micros() as u64;
        Ok(with_metadata(
            "Discounted cash flow comparison of ownership versus rental (year-1 indexed)",
            &serde_json::json!({
                "analysis_period": params.analysis_period,
                "cost_of_capital_pct": params.cost_of_capital.to_string(),
                "discounting": "end of year, exponent starts at 1",
                "rental_terminal_value": "inflated deposit recovery plus down payment retained at par",
                "marginal_band": self.config.marginal_band.to_string(),
            }),
            warnings,
            elapsed,
            analysis,
        ))
    }

    fn build(&self, params: &CalculationParameters) -> LeaseBuyResult<NpvAnalysis> {
        params.check_computable()?;
        let p = params;
        let mut warnings = Vec::new();

        // Initial outlays, already at present value
        let down_payment = p.down_payment()?;
        let ownership_initial_investment = checked_total(
            "ownership initial investment",
            [down_payment, p.transaction_costs, p.space_improvement_cost],
        )?;
        let rental_initial_investment = checked_total(
            "rental initial investment",
            [p.security_deposit, p.moving_costs, p.rental_commission],
        )?;

        let ownership_flows = project_ownership_flows(p)?;
        let rental_flows = project_rental_flows(p)?;

        let own_net: Vec<Money> = ownership_flows.iter().map(|f| f.net_cash_flow).collect();
        let rent_net: Vec<Money> = rental_flows.iter().map(|f| f.net_cash_flow).collect();
        let ownership_pv_of_flows = discounted_sum(p.cost_of_capital, &own_net)?;
        let rental_pv_of_flows = discounted_sum(p.cost_of_capital, &rent_net)?;

        let final_balance = ownership_flows
            .last()
            .map(|f| f.remaining_loan_balance)
            .unwrap_or(Decimal::ZERO);
        let ownership_terminal = terminal_value(
            p.purchase_price,
            p.land_value_pct,
            p.market_appreciation_rate,
            p.depreciation_period,
            p.analysis_period,
            final_balance,
        )?;
        let rental_terminal =
            rental_terminal_value(p.security_deposit, p.inflation_rate, p.analysis_period)?;
        let alternative_investment =
            alternative_investment_value(down_payment, p.cost_of_capital, p.analysis_period)?;

        if ownership_terminal.net_property_equity < Decimal::ZERO {
            warnings.push(format!(
                "Outstanding loan exceeds property value at the horizon (net equity {})",
                ownership_terminal.net_property_equity.round_dp(2)
            ));
        }

        let ownership_terminal_pv = present_value(
            ownership_terminal.net_property_equity,
            p.cost_of_capital,
            p.analysis_period,
        )?;
        let deposit_pv = present_value(
            rental_terminal.security_deposit_recovery,
            p.cost_of_capital,
            p.analysis_period,
        )?;
        let rental_terminal_pv = checked_total(
            "rental terminal value",
            [deposit_pv, alternative_investment.present_value],
        )?;

        let ownership_npv = checked_total(
            "ownership NPV",
            [-ownership_initial_investment, ownership_pv_of_flows, ownership_terminal_pv],
        )?;
        let rental_npv = checked_total(
            "rental NPV",
            [-rental_initial_investment, rental_pv_of_flows, rental_terminal_pv],
        )?;
        let npv_difference = checked_difference("NPV difference", ownership_npv, rental_npv)?;
        let terminal_value_advantage =
            checked_difference("terminal value advantage", ownership_terminal_pv, rental_terminal_pv)?;

        let (recommendation, confidence) = self.classify(npv_difference, rental_npv);
        debug!(
            %ownership_npv,
            %rental_npv,
            %npv_difference,
            recommendation = recommendation.as_str(),
            "NPV comparison"
        );

        let cash_flow_comparison = compare_flows(&ownership_flows, &rental_flows, p.cost_of_capital)?;
        let wealth_comparison =
            wealth_comparison(&ownership_terminal, &rental_terminal, &alternative_investment)?;

        let summary = NpvResult {
            calculation_successful: true,
            error_message: None,
            validation_errors: Vec::new(),
            warnings,
            ownership_npv,
            rental_npv,
            npv_difference,
            ownership_initial_investment,
            rental_initial_investment,
            ownership_terminal_value: ownership_terminal_pv,
            rental_terminal_value: rental_terminal_pv,
            terminal_value_advantage,
            recommendation,
            confidence,
            analysis_period: p.analysis_period,
            cost_of_capital: p.cost_of_capital,
            input_parameters: p.clone(),
        };

        Ok(NpvAnalysis {
            summary,
            ownership_flows,
            rental_flows,
            ownership_pv_of_flows,
            rental_pv_of_flows,
            ownership_terminal,
            rental_terminal,
            alternative_investment,
            cash_flow_comparison,
            wealth_comparison,
        })
    }

    /// Map the signed difference onto the coarse label pair.
    pub fn classify(&self, npv_difference: Money, rental_npv: Money) -> (Recommendation, ConfidenceLabel) {
        let band = self.config.marginal_band;
        let recommendation = if npv_difference > band {
            Recommendation::Buy
        } else if npv_difference < -band {
            Recommendation::Rent
        } else {
            Recommendation::Marginal
        };

        let scale = if rental_npv.is_zero() {
            Decimal::ONE
        } else {
            rental_npv.abs()
        };
        let ratio = npv_difference.abs() / scale;
        let confidence = if ratio >= self.config.high_confidence_ratio {
            ConfidenceLabel::High
        } else if ratio >= self.config.medium_confidence_ratio {
            ConfidenceLabel::Medium
        } else {
            ConfidenceLabel::Low
        };

        (recommendation, confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn scenario_c() -> CalculationParameters {
        CalculationParameters {
            purchase_price: dec!(500000),
            down_payment_pct: dec!(30),
            interest_rate: dec!(5),
            loan_term: 20,
            current_annual_rent: dec!(24000),
            rent_increase_rate: dec!(3),
            analysis_period: 20,
            cost_of_capital: dec!(8),
            transaction_costs: dec!(0),
            ..Default::default()
        }
    }

    #[test]
    fn test_compare_succeeds() {
        let r = NpvEngine::default().compare(&scenario_c());
        assert!(r.calculation_successful, "{:?}", r.error_message);
        assert_eq!(r.npv_difference, r.ownership_npv - r.rental_npv);
        assert!(matches!(
            r.recommendation,
            Recommendation::Buy | Recommendation::Rent | Recommendation::Marginal
        ));
    }

    #[test]
    fn test_initial_investments() {
        let p = CalculationParameters {
            transaction_costs: dec!(10000),
            space_improvement_cost: dec!(5000),
            security_deposit: dec!(4000),
            moving_costs: dec!(3000),
            rental_commission: dec!(2000),
            ..scenario_c()
        };
        let r = NpvEngine::default().compare(&p);
        assert_eq!(r.ownership_initial_investment, dec!(165000));
        assert_eq!(r.rental_initial_investment, dec!(9000));
    }

    #[test]
    fn test_idempotent() {
        let engine = NpvEngine::default();
        assert_eq!(engine.compare(&scenario_c()), engine.compare(&scenario_c()));
    }

    #[test]
    fn test_failure_is_structured() {
        let p = CalculationParameters {
            cost_of_capital: dec!(-100),
            ..scenario_c()
        };
        let r = NpvEngine::default().compare(&p);
        assert!(!r.calculation_successful);
        assert_eq!(r.recommendation, Recommendation::Error);
        assert!(r.error_message.is_some());
        assert!(!r.validation_errors.is_empty());
        assert!(r.into_result().is_err());
    }

    #[test]
    fn test_classify_dead_band() {
        let engine = NpvEngine::default();
        assert_eq!(engine.classify(dec!(600000), dec!(-1000000)).0, Recommendation::Buy);
        assert_eq!(engine.classify(dec!(-600000), dec!(-1000000)).0, Recommendation::Rent);
        assert_eq!(engine.classify(dec!(500000), dec!(-1000000)).0, Recommendation::Marginal);
        assert_eq!(engine.classify(dec!(300000), dec!(-1000000)).1, ConfidenceLabel::High);
        assert_eq!(engine.classify(dec!(150000), dec!(-1000000)).1, ConfidenceLabel::Medium);
        assert_eq!(engine.classify(dec!(50000), dec!(-1000000)).1, ConfidenceLabel::Low);
    }

    #[test]
    fn test_rental_terminal_includes_down_payment_at_par() {
        let r = NpvEngine::default().compare(&scenario_c());
        // no deposit, so the rental terminal value is the 150k down payment
        assert_eq!(r.rental_terminal_value, dec!(150000));
    }

    #[test]
    fn test_analyze_envelope() {
        let out = NpvEngine::default().analyze(&scenario_c()).unwrap();
        assert_eq!(out.result.ownership_flows.len(), 20);
        assert_eq!(out.result.rental_flows.len(), 20);
        assert_eq!(out.result.cash_flow_comparison.years.len(), 20);
        assert_eq!(
            out.result.summary.npv_difference,
            NpvEngine::default().compare(&scenario_c()).npv_difference
        );
    }
}
