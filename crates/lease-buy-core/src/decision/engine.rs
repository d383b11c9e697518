use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::scoring::{
    assess_risk, confidence, ConfidenceBreakdown, ConfidenceLevel, DecisionMetrics,
    RiskAssessment, RiskLevel,
};
use super::summary::format_currency;
use crate::error::LeaseBuyError;
use crate::npv::NpvResult;
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::LeaseBuyResult;

// ---------------------------------------------------------------------------
// Risk tolerance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Conservative,
    #[default]
    Moderate,
    Aggressive,
}

/// Lower bounds for each tier, compared with `>=`. Anything below `rent` is STRONG_RENT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionThresholds {
    pub strong_buy: Money,
    pub buy: Money,
    pub marginal_buy: Money,
    pub neutral: Money,
    pub marginal_rent: Money,
    pub rent: Money,
}

impl RiskTolerance {
    pub const ALL: [RiskTolerance; 3] = [
        RiskTolerance::Conservative,
        RiskTolerance::Moderate,
        RiskTolerance::Aggressive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTolerance::Conservative => "conservative",
            RiskTolerance::Moderate => "moderate",
            RiskTolerance::Aggressive => "aggressive",
        }
    }

    /// Conservative has the widest dead bands, aggressive the narrowest.
    pub fn thresholds(&self) -> DecisionThresholds {
        match self {
            RiskTolerance::Conservative => DecisionThresholds {
                strong_buy: dec!(2000000),
                buy: dec!(1000000),
                marginal_buy: dec!(500000),
                neutral: dec!(250000),
                marginal_rent: dec!(-250000),
                rent: dec!(-1000000),
            },
            RiskTolerance::Moderate => DecisionThresholds {
                strong_buy: dec!(1500000),
                buy: dec!(750000),
                marginal_buy: dec!(300000),
                neutral: dec!(100000),
                marginal_rent: dec!(-100000),
                rent: dec!(-500000),
            },
            RiskTolerance::Aggressive => DecisionThresholds {
                strong_buy: dec!(500000),
                buy: dec!(250000),
                marginal_buy: dec!(100000),
                neutral: dec!(50000),
                marginal_rent: dec!(-50000),
                rent: dec!(-250000),
            },
        }
    }
}

impl fmt::Display for RiskTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskTolerance {
    type Err = LeaseBuyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "conservative" => Ok(RiskTolerance::Conservative),
            "moderate" => Ok(RiskTolerance::Moderate),
            "aggressive" => Ok(RiskTolerance::Aggressive),
            other => Err(LeaseBuyError::InvalidInput {
                field: "risk_tolerance".into(),
                reason: format!("Unknown risk tolerance '{other}' (conservative, moderate, aggressive)"),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Recommendation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionRecommendation {
    StrongBuy,
    Buy,
    MarginalBuy,
    Neutral,
    MarginalRent,
    Rent,
    StrongRent,
    Error,
}

impl DecisionRecommendation {
    pub fn classify(npv_difference: Money, t: &DecisionThresholds) -> Self {
        if npv_difference >= t.strong_buy {
            DecisionRecommendation::StrongBuy
        } else if npv_difference >= t.buy {
            DecisionRecommendation::Buy
        } else if npv_difference >= t.marginal_buy {
            DecisionRecommendation::MarginalBuy
        } else if npv_difference >= t.neutral {
            DecisionRecommendation::Neutral
        } else if npv_difference >= t.marginal_rent {
            DecisionRecommendation::MarginalRent
        } else if npv_difference >= t.rent {
            DecisionRecommendation::Rent
        } else {
            DecisionRecommendation::StrongRent
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionRecommendation::StrongBuy => "STRONG_BUY",
            DecisionRecommendation::Buy => "BUY",
            DecisionRecommendation::MarginalBuy => "MARGINAL_BUY",
            DecisionRecommendation::Neutral => "NEUTRAL",
            DecisionRecommendation::MarginalRent => "MARGINAL_RENT",
            DecisionRecommendation::Rent => "RENT",
            DecisionRecommendation::StrongRent => "STRONG_RENT",
            DecisionRecommendation::Error => "ERROR",
        }
    }

    pub fn favours_buying(&self) -> bool {
        matches!(
            self,
            DecisionRecommendation::StrongBuy
                | DecisionRecommendation::Buy
                | DecisionRecommendation::MarginalBuy
        )
    }
}

impl fmt::Display for DecisionRecommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub primary_reason: String,
    pub decision_summary: String,
    pub supporting_factors: Vec<String>,
    /// Top three risk factors, or the error message for a failed analysis.
    pub key_considerations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionResult {
    pub recommendation: DecisionRecommendation,
    pub confidence_level: ConfidenceLevel,
    pub npv_advantage: Money,
    pub risk_tolerance: RiskTolerance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<DecisionMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<ConfidenceBreakdown>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskAssessment>,
    pub executive_summary: ExecutiveSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl DecisionResult {
    fn error(message: String, risk_tolerance: RiskTolerance) -> Self {
        Self {
            recommendation: DecisionRecommendation::Error,
            confidence_level: ConfidenceLevel::VeryLow,
            npv_advantage: Money::ZERO,
            risk_tolerance,
            metrics: None,
            confidence: None,
            risk: None,
            executive_summary: ExecutiveSummary {
                primary_reason: "Analysis failed due to data or calculation errors".into(),
                decision_summary: "Cannot provide recommendation".into(),
                supporting_factors: Vec::new(),
                key_considerations: vec![message.clone()],
                confidence_note: None,
            },
            error_message: Some(message),
        }
    }

    pub fn is_error(&self) -> bool {
        self.recommendation == DecisionRecommendation::Error
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// Decide from a finished NPV comparison. A failed comparison short-circuits
/// to `ERROR` with `VERY_LOW` confidence and no scores.
pub fn make_decision(npv: &NpvResult, tolerance: RiskTolerance) -> DecisionResult {
    if !npv.calculation_successful {
        return DecisionResult::error(
            npv.error_message
                .clone()
                .unwrap_or_else(|| "Unknown error".into()),
            tolerance,
        );
    }

    let metrics = DecisionMetrics::from_npv(npv);
    let recommendation = DecisionRecommendation::classify(npv.npv_difference, &tolerance.thresholds());
    let confidence = confidence(npv, &metrics);
    let risk = assess_risk(npv, &metrics);
    let executive_summary = reasoning(recommendation, npv.npv_difference, &metrics, &risk);

    DecisionResult {
        recommendation,
        confidence_level: confidence.level,
        npv_advantage: npv.npv_difference,
        risk_tolerance: tolerance,
        metrics: Some(metrics),
        confidence: Some(confidence),
        risk: Some(risk),
        executive_summary,
        error_message: None,
    }
}

/// [`make_decision`] in the computation envelope.
pub fn run_decision(
    npv: &NpvResult,
    tolerance: RiskTolerance,
) -> LeaseBuyResult<ComputationOutput<DecisionResult>> {
    let start = Instant::now();
    info!(risk_tolerance = tolerance.as_str(), "decision started");
    let decision = make_decision(npv, tolerance);
    info!(
        recommendation = decision.recommendation.as_str(),
        confidence = decision.confidence_level.label(),
        "decision finished"
    );

    let mut warnings = Vec::new();
    if let Some(msg) = &decision.error_message {
        warnings.push(format!("NPV comparison failed: {msg}"));
    }
    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Threshold classification of the NPV difference with additive confidence and risk scores",
        &serde_json::json!({
            "risk_tolerance": tolerance.as_str(),
            "thresholds": tolerance.thresholds(),
            "confidence_scale": "0-100, five capped sub-scores",
            "risk_scale": "0-100, fixed points per triggered condition",
        }),
        warnings,
        elapsed,
        decision,
    ))
}

fn reasoning(
    recommendation: DecisionRecommendation,
    npv_difference: Money,
    m: &DecisionMetrics,
    risk: &RiskAssessment,
) -> ExecutiveSummary {
    use DecisionRecommendation::*;

    let amount = format_currency(npv_difference.abs());
    let (primary_reason, decision_summary) = match recommendation {
        StrongBuy | Buy => (
            format!("Ownership provides {amount} NPV advantage over rental"),
            "Recommend proceeding with property purchase",
        ),
        MarginalBuy => (
            format!("Ownership shows {amount} NPV advantage, but the margin is moderate"),
            "Lean toward purchase with careful consideration of risks",
        ),
        Neutral => (
            format!("NPV difference is minimal ({amount})"),
            "Either option viable; consider non-financial factors",
        ),
        MarginalRent => (
            format!("Rental shows {amount} NPV advantage, but the margin is small"),
            "Lean toward rental while monitoring market conditions",
        ),
        Rent | StrongRent => (
            format!("Rental provides {amount} NPV advantage over ownership"),
            "Recommend continuing with rental arrangement",
        ),
        Error => (
            "Analysis incomplete or invalid".to_string(),
            "Cannot provide recommendation due to data issues",
        ),
    };

    let mut supporting_factors = Vec::new();
    if let Some(roi) = m.roi_pct {
        let shown = roi.round_dp(1);
        if roi >= dec!(15) {
            supporting_factors.push(format!("Strong ROI of {shown}% on initial investment"));
        } else if roi >= dec!(8) {
            supporting_factors.push(format!("Moderate ROI of {shown}% on initial investment"));
        } else if roi <= dec!(-10) {
            supporting_factors.push(format!("Negative ROI of {shown}% indicates a poor investment"));
        }
    }
    match risk.level {
        RiskLevel::VeryHigh | RiskLevel::High => supporting_factors.push(format!(
            "{} risk level requires careful consideration",
            risk.level.label()
        )),
        RiskLevel::VeryLow => {
            supporting_factors.push("Very low risk profile supports decision confidence".into())
        }
        _ => {}
    }
    let tc = m.terminal_contribution_pct.abs();
    if tc >= dec!(70) {
        supporting_factors
            .push("Decision heavily dependent on long-term property value assumptions".into());
    } else if tc <= dec!(30) {
        supporting_factors.push("Decision based primarily on operational cash flows".into());
    }

    ExecutiveSummary {
        primary_reason,
        decision_summary: decision_summary.to_string(),
        supporting_factors,
        key_considerations: risk.factors.iter().take(3).cloned().collect(),
        confidence_note: Some(confidence_note(risk.level, m).to_string()),
    }
}

fn confidence_note(level: RiskLevel, m: &DecisionMetrics) -> &'static str {
    let margin = m.npv_margin_pct.abs();
    match level {
        RiskLevel::VeryLow if margin >= dec!(25) => {
            "High confidence in recommendation due to large NPV margin and low risk factors"
        }
        RiskLevel::Low | RiskLevel::Moderate if margin >= dec!(15) => {
            "Good confidence in recommendation with manageable risk factors"
        }
        _ if level == RiskLevel::High || margin <= dec!(10) => {
            "Moderate confidence; recommendation sensitive to assumptions"
        }
        _ => "Lower confidence due to high risks or small NPV margins",
    }
}

// ---------------------------------------------------------------------------
// Comparisons
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileComparison {
    /// Conservative, moderate, aggressive.
    pub decisions: Vec<DecisionResult>,
    pub consistent_recommendation: bool,
}

/// The same NPV result under every risk tolerance.
pub fn compare_profiles(npv: &NpvResult) -> ProfileComparison {
    let decisions: Vec<DecisionResult> = RiskTolerance::ALL
        .iter()
        .map(|t| make_decision(npv, *t))
        .collect();
    let consistent_recommendation = decisions
        .windows(2)
        .all(|w| w[0].recommendation == w[1].recommendation);
    ProfileComparison {
        decisions,
        consistent_recommendation,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionComparison {
    pub decisions: Vec<DecisionResult>,
    pub best_index: usize,
    pub best_npv_advantage: Money,
    pub consistent_recommendation: bool,
    /// Decisions leaning towards buying, marginal included.
    pub favouring_buy: usize,
    pub recommendation_distribution: BTreeMap<DecisionRecommendation, usize>,
    pub meta_confidence: ConfidenceLevel,
}

/// Decide each of several NPV results (alternative properties or scenarios)
/// and summarise agreement between them.
pub fn compare_decisions(
    results: &[NpvResult],
    tolerance: RiskTolerance,
) -> LeaseBuyResult<DecisionComparison> {
    if results.is_empty() {
        return Err(LeaseBuyError::InvalidInput {
            field: "results".into(),
            reason: "No results provided for comparison".into(),
        });
    }

    let decisions: Vec<DecisionResult> = results.iter().map(|r| make_decision(r, tolerance)).collect();

    let (best_index, best) = decisions
        .iter()
        .enumerate()
        .filter(|(_, d)| !d.is_error())
        .max_by(|(ia, a), (ib, b)| a.npv_advantage.cmp(&b.npv_advantage).then(ib.cmp(ia)))
        .map(|(i, d)| (i, d.npv_advantage))
        .unwrap_or((0, Money::ZERO));

    let mut recommendation_distribution = BTreeMap::new();
    for d in &decisions {
        *recommendation_distribution.entry(d.recommendation).or_insert(0) += 1;
    }
    let consistent_recommendation = recommendation_distribution.len() == 1;
    let favouring_buy = decisions.iter().filter(|d| d.recommendation.favours_buying()).count();

    Ok(DecisionComparison {
        decisions,
        best_index,
        best_npv_advantage: best,
        consistent_recommendation,
        favouring_buy,
        recommendation_distribution,
        meta_confidence: if consistent_recommendation {
            ConfidenceLevel::High
        } else {
            ConfidenceLevel::Low
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::npv::NpvEngine;
    use crate::params::CalculationParameters;
    use pretty_assertions::assert_eq;

    fn with_difference(diff: Money) -> NpvResult {
        let mut r = NpvEngine::default().compare(&CalculationParameters::default());
        r.npv_difference = diff;
        r
    }

    #[test]
    fn test_moderate_tiers() {
        let t = RiskTolerance::Moderate.thresholds();
        let cases = [
            (dec!(1500000), DecisionRecommendation::StrongBuy),
            (dec!(750000), DecisionRecommendation::Buy),
            (dec!(300000), DecisionRecommendation::MarginalBuy),
            (dec!(100000), DecisionRecommendation::Neutral),
            (dec!(0), DecisionRecommendation::MarginalRent),
            (dec!(-100000), DecisionRecommendation::MarginalRent),
            (dec!(-500000), DecisionRecommendation::Rent),
            (dec!(-500001), DecisionRecommendation::StrongRent),
        ];
        for (diff, expected) in cases {
            assert_eq!(DecisionRecommendation::classify(diff, &t), expected, "{diff}");
        }
    }

    #[test]
    fn test_below_rent_threshold_is_strong_rent_for_every_profile() {
        for tol in RiskTolerance::ALL {
            let diff = tol.thresholds().rent - dec!(1);
            let d = make_decision(&with_difference(diff), tol);
            assert_eq!(d.recommendation, DecisionRecommendation::StrongRent);
        }
    }

    #[test]
    fn test_failed_npv_short_circuits() {
        let r = NpvEngine::default().compare(&CalculationParameters {
            cost_of_capital: dec!(-100),
            ..Default::default()
        });
        let d = make_decision(&r, RiskTolerance::Moderate);
        assert_eq!(d.recommendation, DecisionRecommendation::Error);
        assert_eq!(d.confidence_level, ConfidenceLevel::VeryLow);
        assert!(d.metrics.is_none() && d.confidence.is_none() && d.risk.is_none());
        assert_eq!(d.executive_summary.key_considerations.len(), 1);
    }

    #[test]
    fn test_reasoning_template() {
        let d = make_decision(&with_difference(dec!(800000)), RiskTolerance::Moderate);
        assert_eq!(d.recommendation, DecisionRecommendation::Buy);
        assert_eq!(
            d.executive_summary.primary_reason,
            "Ownership provides $800,000 NPV advantage over rental"
        );
        assert!(d.executive_summary.key_considerations.len() <= 3);
        assert!(d.executive_summary.confidence_note.is_some());
    }

    #[test]
    fn test_profiles_disagree_on_mid_sized_difference() {
        let cmp = compare_profiles(&with_difference(dec!(600000)));
        let recs: Vec<_> = cmp.decisions.iter().map(|d| d.recommendation).collect();
        assert_eq!(
            recs,
            vec![
                DecisionRecommendation::MarginalBuy,
                DecisionRecommendation::MarginalBuy,
                DecisionRecommendation::StrongBuy,
            ]
        );
        assert!(!cmp.consistent_recommendation);
    }

    #[test]
    fn test_compare_decisions_picks_best() {
        let results = vec![
            with_difference(dec!(-200000)),
            with_difference(dec!(900000)),
            with_difference(dec!(100000)),
        ];
        let cmp = compare_decisions(&results, RiskTolerance::Moderate).unwrap();
        assert_eq!(cmp.best_index, 1);
        assert_eq!(cmp.best_npv_advantage, dec!(900000));
        assert!(!cmp.consistent_recommendation);
        assert_eq!(cmp.favouring_buy, 1);
        assert_eq!(cmp.meta_confidence, ConfidenceLevel::Low);
        assert!(compare_decisions(&[], RiskTolerance::Moderate).is_err());
    }

    #[test]
    fn test_tolerance_parsing() {
        assert_eq!("Aggressive".parse::<RiskTolerance>().unwrap(), RiskTolerance::Aggressive);
        assert!("reckless".parse::<RiskTolerance>().is_err());
    }
}
