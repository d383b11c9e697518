use lease_buy_core::npv::{NpvEngine, Recommendation};
use lease_buy_core::projection::{amortization, cash_flow, terminal_value};
use lease_buy_core::CalculationParameters;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Fixtures
// ===========================================================================

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

fn approx(a: Decimal, b: Decimal, tol: Decimal) -> bool {
    (a - b).abs() <= tol
}

// ===========================================================================
// NPV comparison
// ===========================================================================

#[test]
fn test_scenario_c_is_finite_and_classified() {
    let r = NpvEngine::default().compare(&scenario_c());
    assert!(r.calculation_successful, "{:?}", r.error_message);
    assert!(matches!(
        r.recommendation,
        Recommendation::Buy | Recommendation::Rent | Recommendation::Marginal
    ));
    assert!(approx(r.npv_difference, r.ownership_npv - r.rental_npv, dec!(1)));
}

#[test]
fn test_npv_identity_across_parameter_sets() {
    let engine = NpvEngine::default();
    let variants = [
        scenario_c(),
        CalculationParameters::default(),
        CalculationParameters {
            down_payment_pct: dec!(100),
            ..scenario_c()
        },
        CalculationParameters {
            interest_rate: dec!(0),
            cost_of_capital: dec!(3),
            analysis_period: 35,
            ..scenario_c()
        },
        CalculationParameters {
            security_deposit: dec!(6000),
            moving_costs: dec!(2500),
            rental_commission: dec!(1200),
            subletting_potential: true,
            ownership_property_size: dec!(1000),
            current_space_needed: dec!(800),
            subletting_space_sqm: dec!(150),
            subletting_rate: dec!(20),
            ..CalculationParameters::default()
        },
    ];
    for p in variants {
        let r = engine.compare(&p);
        assert!(r.calculation_successful, "{:?}", r.error_message);
        assert!(approx(r.npv_difference, r.ownership_npv - r.rental_npv, dec!(1)));
    }
}

#[test]
fn test_engine_is_idempotent() {
    let engine = NpvEngine::default();
    let p = CalculationParameters::default();
    assert_eq!(engine.compare(&p), engine.compare(&p));
    assert_eq!(
        NpvEngine::default().analyze(&p).unwrap().result.ownership_flows,
        engine.analyze(&p).unwrap().result.ownership_flows
    );
}

#[test]
fn test_undefined_discount_rate_is_a_structured_failure() {
    let r = NpvEngine::default().compare(&CalculationParameters {
        cost_of_capital: dec!(-100),
        ..scenario_c()
    });
    assert!(!r.calculation_successful);
    assert_eq!(r.recommendation, Recommendation::Error);
    assert!(r.error_message.is_some());
}

#[test]
fn test_unrepresentable_price_is_a_structured_failure() {
    let p = CalculationParameters {
        purchase_price: dec!(50000000000000000000000000000),
        ..Default::default()
    };
    assert!(!p.has_loan());
    assert!(p.validate().is_err());

    let r = NpvEngine::default().compare(&p);
    assert!(!r.calculation_successful);
    assert_eq!(r.recommendation, Recommendation::Error);
    assert!(r.error_message.is_some());
}

// ===========================================================================
// Scenario A: all-cash purchase
// ===========================================================================

#[test]
fn test_all_cash_purchase_ignores_loan_term() {
    let base = CalculationParameters {
        down_payment_pct: dec!(100),
        transaction_costs: dec!(12000),
        ..scenario_c()
    };
    let engine = NpvEngine::default();
    let a = engine.compare(&base);
    let b = engine.compare(&CalculationParameters { loan_term: 7, ..base.clone() });
    assert_eq!(a.npv_difference, b.npv_difference);
    assert_eq!(a.ownership_initial_investment, dec!(512000));

    let flows = cash_flow::project_ownership_flows(&base).unwrap();
    assert!(flows.iter().all(|f| f.mortgage_payment.is_zero()));
}

// ===========================================================================
// Scenario B: zero-interest loan
// ===========================================================================

#[test]
fn test_zero_interest_payment_is_principal_over_term() {
    let p = CalculationParameters {
        interest_rate: dec!(0),
        ..scenario_c()
    };
    let flows = cash_flow::project_ownership_flows(&p).unwrap();
    let expected = p.loan_amount().unwrap() / dec!(20);
    assert_eq!(expected, dec!(17500));
    assert!(flows.iter().all(|f| f.mortgage_payment == expected));
    assert!(flows.iter().all(|f| f.mortgage_interest.is_zero()));
}

// ===========================================================================
// Amortization
// ===========================================================================

#[test]
fn test_schedule_pays_off_principal() {
    let entries = amortization::schedule(dec!(350000), dec!(5), 20).unwrap();
    assert_eq!(entries.len(), 20);
    assert_eq!(entries.last().unwrap().closing_balance, Decimal::ZERO);
    let principal: Decimal = entries.iter().map(|e| e.principal).sum();
    assert!(approx(principal, dec!(350000), dec!(0.000001)));

    // beyond the term the loan is gone
    let p = CalculationParameters {
        loan_term: 10,
        ..scenario_c()
    };
    let flows = cash_flow::project_ownership_flows(&p).unwrap();
    assert_eq!(flows[9].remaining_loan_balance, Decimal::ZERO);
    assert!(flows[10..].iter().all(|f| f.mortgage_payment.is_zero()));
}

// ===========================================================================
// Escalation
// ===========================================================================

#[test]
fn test_year_one_is_unescalated() {
    let p = CalculationParameters::default();
    let own = cash_flow::project_ownership_flows(&p).unwrap();
    let rent = cash_flow::project_rental_flows(&p).unwrap();

    assert_eq!(own[0].insurance, p.insurance_cost);
    assert_eq!(own[0].maintenance, p.annual_maintenance);
    assert_eq!(rent[0].annual_rent, p.current_annual_rent);

    let growth = Decimal::ONE + p.rent_increase_rate / dec!(100);
    for w in rent.windows(2) {
        assert!(approx(w[1].annual_rent, w[0].annual_rent * growth, dec!(0.0001)));
    }
}

// ===========================================================================
// Terminal value
// ===========================================================================

#[test]
fn test_land_share_extremes() {
    let all_land = terminal_value::terminal_value(dec!(500000), dec!(100), dec!(3), 39, 25, dec!(0)).unwrap();
    assert_eq!(all_land.initial_building_value, Decimal::ZERO);
    assert_eq!(all_land.accumulated_depreciation, Decimal::ZERO);

    let no_land = terminal_value::terminal_value(dec!(500000), dec!(0), dec!(3), 39, 25, dec!(0)).unwrap();
    assert_eq!(no_land.initial_land_value, Decimal::ZERO);
    assert_eq!(no_land.land_appreciation, Decimal::ZERO);
}

// ===========================================================================
// Scenario E: appreciation only helps ownership
// ===========================================================================

#[test]
fn test_ownership_npv_non_decreasing_in_appreciation() {
    let engine = NpvEngine::default();
    let base = CalculationParameters {
        market_appreciation_rate: dec!(0),
        ..CalculationParameters::default()
    };
    let series: Vec<Decimal> = (-5..=20)
        .map(|a| {
            let r = engine.compare(&CalculationParameters {
                market_appreciation_rate: Decimal::from(a),
                ..base.clone()
            });
            assert!(r.calculation_successful, "{:?}", r.error_message);
            r.ownership_npv
        })
        .collect();
    assert!(series.windows(2).all(|w| w[1] >= w[0]));
}
