use lease_buy_core::decision::{
    make_decision, run_decision, ConfidenceLevel, DecisionRecommendation, RiskTolerance,
};
use lease_buy_core::npv::NpvEngine;
use lease_buy_core::CalculationParameters;
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;

// ===========================================================================
// Scenario D: beyond the rent threshold
// ===========================================================================

#[test]
fn test_large_rental_advantage_is_strong_rent() {
    let mut r = NpvEngine::default().compare(&CalculationParameters::default());
    r.npv_difference = dec!(-2500000);

    for tol in RiskTolerance::ALL {
        let d = make_decision(&r, tol);
        assert_eq!(d.recommendation, DecisionRecommendation::StrongRent, "{tol}");
    }
}

#[test]
fn test_decision_from_engine_output() {
    let r = NpvEngine::default().compare(&CalculationParameters::default());
    let out = run_decision(&r, RiskTolerance::Conservative).unwrap();
    let d = out.result;

    assert_eq!(d.npv_advantage, r.npv_difference);
    assert_eq!(
        d.recommendation,
        DecisionRecommendation::classify(r.npv_difference, &RiskTolerance::Conservative.thresholds())
    );
    let c = d.confidence.unwrap();
    assert_eq!(c.total, c.npv_margin + c.terminal_dependency + c.investment_ratio + c.market_assumptions + c.analysis_period);
    assert_eq!(c.level, ConfidenceLevel::from_score(c.total));
    assert!(d.risk.unwrap().score <= 100);
    assert!(out.warnings.is_empty());
}

#[test]
fn test_failed_comparison_yields_error_decision() {
    let r = NpvEngine::default().compare(&CalculationParameters {
        analysis_period: 0,
        ..Default::default()
    });
    assert!(!r.calculation_successful);

    let d = make_decision(&r, RiskTolerance::Aggressive);
    assert_eq!(d.recommendation, DecisionRecommendation::Error);
    assert_eq!(d.confidence_level, ConfidenceLevel::VeryLow);
    assert!(d.error_message.is_some());
}
