use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::npv::NpvResult;
use crate::types::Money;

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceLevel {
    VeryHigh,
    High,
    Medium,
    Low,
    VeryLow,
}

impl ConfidenceLevel {
    pub fn from_score(score: u32) -> Self {
        match score {
            85.. => ConfidenceLevel::VeryHigh,
            70..=84 => ConfidenceLevel::High,
            55..=69 => ConfidenceLevel::Medium,
            40..=54 => ConfidenceLevel::Low,
            _ => ConfidenceLevel::VeryLow,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConfidenceLevel::VeryHigh => "Very High",
            ConfidenceLevel::High => "High",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::Low => "Low",
            ConfidenceLevel::VeryLow => "Very Low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    VeryHigh,
    High,
    Moderate,
    Low,
    VeryLow,
}

impl RiskLevel {
    pub fn from_score(score: u32) -> Self {
        match score {
            70.. => RiskLevel::VeryHigh,
            50..=69 => RiskLevel::High,
            30..=49 => RiskLevel::Moderate,
            15..=29 => RiskLevel::Low,
            _ => RiskLevel::VeryLow,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::VeryHigh => "Very High",
            RiskLevel::High => "High",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::Low => "Low",
            RiskLevel::VeryLow => "Very Low",
        }
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionMetrics {
    /// (ownership NPV + initial investment) / initial investment, in percent.
    /// `None` without a positive initial investment.
    pub roi_pct: Option<Decimal>,
    /// NPV difference relative to |rental NPV|, in percent.
    pub npv_margin_pct: Decimal,
    /// Share of the NPV difference explained by the terminal value advantage, in percent.
    pub terminal_contribution_pct: Decimal,
    pub absolute_advantage: Money,
    /// Down payment and closing outlay as a share of the purchase price.
    pub investment_ratio: Decimal,
}

impl DecisionMetrics {
    pub fn from_npv(r: &NpvResult) -> Self {
        let initial = r.ownership_initial_investment;
        let roi_pct = (initial > Decimal::ZERO)
            .then(|| (r.ownership_npv + initial) / initial * Decimal::ONE_HUNDRED);

        let scale = if r.rental_npv.is_zero() {
            Decimal::ONE
        } else {
            r.rental_npv.abs()
        };
        let npv_margin_pct = r.npv_difference / scale * Decimal::ONE_HUNDRED;

        let terminal_contribution_pct = if r.npv_difference.is_zero() {
            Decimal::ZERO
        } else {
            r.terminal_value_advantage / r.npv_difference * Decimal::ONE_HUNDRED
        };

        let price = r.input_parameters.purchase_price;
        let investment_ratio = if price > Decimal::ZERO {
            initial / price
        } else {
            Decimal::ONE
        };

        Self {
            roi_pct,
            npv_margin_pct,
            terminal_contribution_pct,
            absolute_advantage: r.npv_difference.abs(),
            investment_ratio,
        }
    }
}

// ---------------------------------------------------------------------------
// Confidence
// ---------------------------------------------------------------------------

/// Five capped sub-scores; the total is out of 100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    pub npv_margin: u32,
    pub terminal_dependency: u32,
    pub investment_ratio: u32,
    pub market_assumptions: u32,
    pub analysis_period: u32,
    pub total: u32,
    pub level: ConfidenceLevel,
}

pub fn confidence(r: &NpvResult, m: &DecisionMetrics) -> ConfidenceBreakdown {
    let margin = m.npv_margin_pct.abs();
    let npv_margin = if margin >= dec!(50) {
        30
    } else if margin >= dec!(25) {
        20
    } else if margin >= dec!(10) {
        10
    } else if margin >= dec!(5) {
        5
    } else {
        0
    };

    // lower dependency scores higher
    let tc = m.terminal_contribution_pct.abs();
    let terminal_dependency = if tc <= dec!(30) {
        25
    } else if tc <= dec!(50) {
        15
    } else if tc <= dec!(70) {
        10
    } else {
        5
    };

    let ratio = m.investment_ratio;
    let within = |lo: Decimal, hi: Decimal| ratio >= lo && ratio <= hi;
    let investment_ratio = if within(dec!(0.2), dec!(0.4)) {
        20
    } else if within(dec!(0.15), dec!(0.5)) {
        15
    } else if within(dec!(0.1), dec!(0.6)) {
        10
    } else {
        5
    };

    let p = &r.input_parameters;
    let (rate, appr) = (p.interest_rate, p.market_appreciation_rate);
    let market_assumptions = if rate >= dec!(2) && rate <= dec!(8) && appr >= dec!(1) && appr <= dec!(6) {
        15
    } else if rate >= dec!(1) && rate <= dec!(12) && appr >= dec!(0) && appr <= dec!(8) {
        10
    } else {
        5
    };

    let analysis_period = match r.analysis_period {
        20..=30 => 10,
        15..=35 => 7,
        _ => 3,
    };

    let total = npv_margin + terminal_dependency + investment_ratio + market_assumptions + analysis_period;
    ConfidenceBreakdown {
        npv_margin,
        terminal_dependency,
        investment_ratio,
        market_assumptions,
        analysis_period,
        total,
        level: ConfidenceLevel::from_score(total),
    }
}

// ---------------------------------------------------------------------------
// Risk
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRisks {
    pub market: bool,
    pub interest_rate: bool,
    pub leverage: bool,
    pub terminal_value: bool,
    pub concentration: bool,
    pub liquidity: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// 0 to 100.
    pub score: u32,
    pub level: RiskLevel,
    /// In the order they were detected.
    pub factors: Vec<String>,
    pub key_risks: KeyRisks,
}

pub fn assess_risk(r: &NpvResult, m: &DecisionMetrics) -> RiskAssessment {
    let p = &r.input_parameters;
    let mut factors = Vec::new();
    let mut score = 0u32;
    let mut flag = |points: u32, text: &str| {
        score += points;
        factors.push(text.to_string());
    };

    let appr = p.market_appreciation_rate;
    if appr >= dec!(6) {
        flag(15, "High market appreciation assumption may be optimistic");
    } else if appr <= dec!(1) {
        flag(10, "Low market appreciation may indicate a declining market");
    }

    let rate = p.interest_rate;
    if rate >= dec!(8) {
        flag(10, "High interest rates increase financing costs");
    } else if rate <= dec!(2) {
        flag(5, "Very low interest rates may not be sustainable");
    }

    let down = p.down_payment_pct;
    if down <= dec!(15) {
        flag(20, "Low down payment increases financial leverage risk");
    } else if down >= dec!(80) {
        flag(10, "High down payment reduces liquidity");
    }

    let tc = m.terminal_contribution_pct.abs();
    if tc >= dec!(70) {
        flag(25, "Decision heavily dependent on terminal value assumptions");
    } else if tc >= dec!(50) {
        flag(15, "Moderate dependency on terminal value assumptions");
    }

    let initial = r.ownership_initial_investment;
    let exposure = r.ownership_npv.abs();
    let concentrated = initial > Decimal::ZERO && exposure / initial >= dec!(5);
    if concentrated {
        flag(15, "High concentration risk in a single real estate asset");
    } else if initial <= Decimal::ZERO && exposure > Decimal::ZERO {
        flag(20, "Extreme concentration risk: exposure without initial investment");
    }

    if r.analysis_period >= 35 {
        flag(10, "Long analysis period increases market uncertainty");
    }
    if down >= dec!(50) {
        flag(10, "Significant capital tied up in illiquid real estate");
    }

    let score = score.min(100);
    RiskAssessment {
        score,
        level: RiskLevel::from_score(score),
        factors,
        key_risks: KeyRisks {
            market: appr >= dec!(6) || appr <= dec!(1),
            interest_rate: rate >= dec!(8) || rate <= dec!(2),
            leverage: down <= dec!(15),
            terminal_value: tc >= dec!(70),
            concentration: concentrated,
            liquidity: down >= dec!(50),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::npv::NpvEngine;
    use crate::params::CalculationParameters;
    use pretty_assertions::assert_eq;

    fn sample() -> NpvResult {
        let params = CalculationParameters {
            market_appreciation_rate: dec!(3.5),
            ..Default::default()
        };
        let mut r = NpvEngine::default().compare(&params);
        r.npv_difference = dec!(750000);
        r.ownership_npv = dec!(-2500000);
        r.rental_npv = dec!(-3250000);
        r.ownership_initial_investment = dec!(150000);
        r.terminal_value_advantage = dec!(500000);
        r
    }

    #[test]
    fn test_confidence_sub_scores() {
        let r = sample();
        let m = DecisionMetrics::from_npv(&r);
        let c = confidence(&r, &m);
        assert_eq!(
            (c.npv_margin, c.terminal_dependency, c.investment_ratio, c.market_assumptions, c.analysis_period),
            (10, 10, 20, 15, 10)
        );
        assert_eq!(c.total, 65);
        assert_eq!(c.level, ConfidenceLevel::Medium);
    }

    #[test]
    fn test_risk_factors_in_detection_order() {
        let r = sample();
        let m = DecisionMetrics::from_npv(&r);
        let risk = assess_risk(&r, &m);
        assert_eq!(risk.score, 30);
        assert_eq!(risk.level, RiskLevel::Moderate);
        assert_eq!(risk.factors.len(), 2);
        assert!(risk.factors[0].contains("terminal value"));
        assert!(risk.key_risks.concentration);
        assert!(!risk.key_risks.leverage);
    }

    #[test]
    fn test_losses_without_initial_investment_are_concentrated() {
        let mut r = sample();
        r.ownership_initial_investment = Decimal::ZERO;
        let m = DecisionMetrics::from_npv(&r);
        let risk = assess_risk(&r, &m);
        assert!(r.ownership_npv < Decimal::ZERO);
        assert!(risk
            .factors
            .iter()
            .any(|f| f.starts_with("Extreme concentration risk")));
    }

    #[test]
    fn test_risk_score_capped() {
        let params = CalculationParameters {
            market_appreciation_rate: dec!(7),
            interest_rate: dec!(9),
            down_payment_pct: dec!(10),
            analysis_period: 40,
            ..Default::default()
        };
        let mut r = NpvEngine::default().compare(&params);
        r.npv_difference = dec!(100);
        r.terminal_value_advantage = dec!(1000);
        r.ownership_initial_investment = dec!(1);
        r.ownership_npv = dec!(-1000);
        let m = DecisionMetrics::from_npv(&r);
        let risk = assess_risk(&r, &m);
        // 15 + 10 + 20 + 25 + 15 + 10
        assert_eq!(risk.score, 95);
        assert_eq!(risk.level, RiskLevel::VeryHigh);
        assert!(risk.score <= 100);
    }

    #[test]
    fn test_level_boundaries() {
        assert_eq!(ConfidenceLevel::from_score(85), ConfidenceLevel::VeryHigh);
        assert_eq!(ConfidenceLevel::from_score(84), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(39), ConfidenceLevel::VeryLow);
        assert_eq!(RiskLevel::from_score(15), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(14), RiskLevel::VeryLow);
    }
}
