use rust_decimal::prelude::MathematicalOps;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

use crate::error::LeaseBuyError;
use crate::npv::{NpvEngine, NpvResult, Recommendation};
use crate::params::{CalculationParameters, ParameterKey};
use crate::types::*;
use crate::LeaseBuyResult;

// ---------------------------------------------------------------------------
// Scenario definitions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScenarioOp {
    /// Replace the base value.
    Set { value: Decimal },
    /// Add `delta` to the base value, optionally clamped from below.
    Shift {
        delta: Decimal,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        floor: Option<Decimal>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioAdjustment {
    pub parameter: ParameterKey,
    #[serde(flatten)]
    pub op: ScenarioOp,
}

impl ScenarioAdjustment {
    fn set(parameter: ParameterKey, value: Decimal) -> Self {
        Self {
            parameter,
            op: ScenarioOp::Set { value },
        }
    }

    fn shift(parameter: ParameterKey, delta: Decimal) -> Self {
        Self {
            parameter,
            op: ScenarioOp::Shift { delta, floor: None },
        }
    }

    fn shift_floored(parameter: ParameterKey, delta: Decimal, floor: Decimal) -> Self {
        Self {
            parameter,
            op: ScenarioOp::Shift {
                delta,
                floor: Some(floor),
            },
        }
    }

    fn apply(&self, params: &mut CalculationParameters) -> LeaseBuyResult<()> {
        let value = match &self.op {
            ScenarioOp::Set { value } => *value,
            ScenarioOp::Shift { delta, floor } => {
                let shifted = self.parameter.get(params) + *delta;
                match floor {
                    Some(f) => shifted.max(*f),
                    None => shifted,
                }
            }
        };
        self.parameter.apply(params, value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicScenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub probability: Rate,
    #[serde(default)]
    pub adjustments: Vec<ScenarioAdjustment>,
}

impl EconomicScenario {
    pub fn apply(&self, base: &CalculationParameters) -> LeaseBuyResult<CalculationParameters> {
        let mut params = base.clone();
        for adj in &self.adjustments {
            adj.apply(&mut params)?;
        }
        Ok(params)
    }
}

/// Recession, growth, high rates, property boom and stability.
pub fn default_scenarios() -> Vec<EconomicScenario> {
    use ParameterKey::*;
    vec![
        EconomicScenario {
            name: "Economic Recession".into(),
            description: "Higher borrowing costs, falling property values, weak rent growth".into(),
            probability: dec!(0.15),
            adjustments: vec![
                ScenarioAdjustment::shift(InterestRate, dec!(2)),
                ScenarioAdjustment::set(MarketAppreciationRate, dec!(-1)),
                ScenarioAdjustment::set(RentIncreaseRate, dec!(1)),
                ScenarioAdjustment::shift(CostOfCapital, dec!(1.5)),
                ScenarioAdjustment::set(PropertyTaxEscalation, dec!(1)),
                ScenarioAdjustment::set(InflationRate, dec!(1.5)),
            ],
        },
        EconomicScenario {
            name: "Economic Growth".into(),
            description: "Lower rates, strong appreciation and rent growth".into(),
            probability: dec!(0.35),
            adjustments: vec![
                ScenarioAdjustment::shift_floored(InterestRate, dec!(-1), dec!(1)),
                ScenarioAdjustment::shift(MarketAppreciationRate, dec!(2)),
                ScenarioAdjustment::shift(RentIncreaseRate, dec!(1.5)),
                ScenarioAdjustment::shift_floored(CostOfCapital, dec!(-1), dec!(4)),
                ScenarioAdjustment::set(PropertyTaxEscalation, dec!(3)),
                ScenarioAdjustment::set(InflationRate, dec!(4)),
            ],
        },
        EconomicScenario {
            name: "High Interest Rates".into(),
            description: "Tight monetary policy".into(),
            probability: dec!(0.20),
            adjustments: vec![
                ScenarioAdjustment::shift(InterestRate, dec!(4)),
                ScenarioAdjustment::shift(MarketAppreciationRate, dec!(-1)),
                ScenarioAdjustment::shift(CostOfCapital, dec!(2)),
            ],
        },
        EconomicScenario {
            name: "Property Market Boom".into(),
            description: "Rapid property appreciation and rent growth".into(),
            probability: dec!(0.10),
            adjustments: vec![
                ScenarioAdjustment::shift(MarketAppreciationRate, dec!(4)),
                ScenarioAdjustment::shift(RentIncreaseRate, dec!(2)),
                ScenarioAdjustment::set(PropertyTaxEscalation, dec!(4)),
                ScenarioAdjustment::set(InflationRate, dec!(5)),
            ],
        },
        EconomicScenario {
            name: "Economic Stability".into(),
            description: "Base assumptions with moderate inflation".into(),
            probability: dec!(0.20),
            adjustments: vec![ScenarioAdjustment::set(InflationRate, dec!(2.5))],
        },
    ]
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub name: String,
    pub probability: Rate,
    pub calculation_successful: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub ownership_npv: Money,
    pub rental_npv: Money,
    pub npv_difference: Money,
    pub recommendation: Recommendation,
    /// Change in NPV difference against the unadjusted base.
    pub vs_base_case: Money,
    /// 1 is the best successful scenario; failed scenarios are unranked.
    pub rank: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectedValue {
    pub npv_difference: Money,
    pub ownership_npv: Money,
    pub rental_npv: Money,
    pub standard_deviation: Money,
    /// Expected difference per unit of standard deviation; zero when there is no dispersion.
    pub risk_adjusted_ratio: Decimal,
    pub probability_buy_favoured: Rate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioAnalysis {
    pub base_case: NpvResult,
    pub outcomes: Vec<ScenarioOutcome>,
    pub best_scenario: Option<String>,
    pub worst_scenario: Option<String>,
    pub expected: ExpectedValue,
    pub failed_scenarios: usize,
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

const PROBABILITY_TOLERANCE: Decimal = dec!(0.01);

/// Evaluate every scenario against `base` and summarise the distribution.
pub fn run_scenarios(
    engine: &NpvEngine,
    base: &CalculationParameters,
    scenarios: &[EconomicScenario],
) -> LeaseBuyResult<ComputationOutput<ScenarioAnalysis>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if scenarios.is_empty() {
        return Err(LeaseBuyError::InvalidInput {
            field: "scenarios".into(),
            reason: "At least one scenario required".into(),
        });
    }
    for s in scenarios {
        if s.probability < Decimal::ZERO || s.probability > Decimal::ONE {
            return Err(LeaseBuyError::InvalidInput {
                field: format!("scenario:{} probability", s.name),
                reason: "Probability must be between 0 and 1".into(),
            });
        }
    }
    let total_prob: Decimal = scenarios.iter().map(|s| s.probability).sum();
    if (total_prob - Decimal::ONE).abs() > PROBABILITY_TOLERANCE {
        return Err(LeaseBuyError::InvalidInput {
            field: "probabilities".into(),
            reason: format!("Probabilities must sum to 1.0 (got {total_prob})"),
        });
    }

    let base_case = engine.compare(base).into_result()?;
    info!(scenarios = scenarios.len(), "scenario analysis started");

    let mut outcomes: Vec<ScenarioOutcome> = scenarios
        .iter()
        .map(|s| {
            let result = match s.apply(base) {
                Ok(p) => engine.compare(&p),
                Err(e) => {
                    warn!(scenario = %s.name, error = %e, "scenario adjustment failed");
                    return failed_outcome(s, e.to_string());
                }
            };
            if !result.calculation_successful {
                return failed_outcome(s, result.error_message.unwrap_or_default());
            }
            ScenarioOutcome {
                name: s.name.clone(),
                probability: s.probability,
                calculation_successful: true,
                error_message: None,
                ownership_npv: result.ownership_npv,
                rental_npv: result.rental_npv,
                npv_difference: result.npv_difference,
                recommendation: result.recommendation,
                vs_base_case: result.npv_difference - base_case.npv_difference,
                rank: None,
            }
        })
        .collect();

    for o in outcomes.iter().filter(|o| !o.calculation_successful) {
        warnings.push(format!(
            "Scenario '{}' failed: {}",
            o.name,
            o.error_message.as_deref().unwrap_or("unknown error")
        ));
    }

    // Rank by NPV difference, most favourable to buying first
    let mut order: Vec<usize> = (0..outcomes.len())
        .filter(|&i| outcomes[i].calculation_successful)
        .collect();
    order.sort_by(|&a, &b| outcomes[b].npv_difference.cmp(&outcomes[a].npv_difference));
    for (rank, &i) in order.iter().enumerate() {
        outcomes[i].rank = Some(rank + 1);
    }
    let best_scenario = order.first().map(|&i| outcomes[i].name.clone());
    let worst_scenario = order.last().map(|&i| outcomes[i].name.clone());

    let expected = expected_value(&outcomes, &mut warnings);
    let failed_scenarios = outcomes.iter().filter(|o| !o.calculation_successful).count();

    let analysis = ScenarioAnalysis {
        base_case,
        outcomes,
        best_scenario,
        worst_scenario,
        expected,
        failed_scenarios,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Probability-weighted economic scenario analysis of the NPV difference",
        &serde_json::json!({
            "num_scenarios": scenarios.len(),
            "total_probability": total_prob.to_string(),
            "failed_scenarios_excluded": true,
        }),
        warnings,
        elapsed,
        analysis,
    ))
}

fn failed_outcome(s: &EconomicScenario, error: String) -> ScenarioOutcome {
    ScenarioOutcome {
        name: s.name.clone(),
        probability: s.probability,
        calculation_successful: false,
        error_message: Some(error),
        ownership_npv: Decimal::ZERO,
        rental_npv: Decimal::ZERO,
        npv_difference: Decimal::ZERO,
        recommendation: Recommendation::Error,
        vs_base_case: Decimal::ZERO,
        rank: None,
    }
}

/// Weighted moments over successful outcomes, renormalising their probabilities.
fn expected_value(outcomes: &[ScenarioOutcome], warnings: &mut Vec<String>) -> ExpectedValue {
    let ok: Vec<&ScenarioOutcome> = outcomes.iter().filter(|o| o.calculation_successful).collect();
    let weight: Decimal = ok.iter().map(|o| o.probability).sum();
    if weight.is_zero() {
        warnings.push("No successful scenario carries probability weight".into());
        return ExpectedValue {
            npv_difference: Decimal::ZERO,
            ownership_npv: Decimal::ZERO,
            rental_npv: Decimal::ZERO,
            standard_deviation: Decimal::ZERO,
            risk_adjusted_ratio: Decimal::ZERO,
            probability_buy_favoured: Decimal::ZERO,
        };
    }
    if (weight - Decimal::ONE).abs() > PROBABILITY_TOLERANCE {
        warnings.push(format!(
            "Successful scenarios carry {weight} of the probability mass; weights renormalised"
        ));
    }

    let w = |o: &ScenarioOutcome| o.probability / weight;
    let npv_difference: Decimal = ok.iter().map(|o| w(o) * o.npv_difference).sum();
    let ownership_npv: Decimal = ok.iter().map(|o| w(o) * o.ownership_npv).sum();
    let rental_npv: Decimal = ok.iter().map(|o| w(o) * o.rental_npv).sum();
    let variance: Decimal = ok
        .iter()
        .map(|o| {
            let d = o.npv_difference - npv_difference;
            w(o) * d * d
        })
        .sum();
    let standard_deviation = variance.sqrt().unwrap_or(Decimal::ZERO);
    let risk_adjusted_ratio = if standard_deviation.is_zero() {
        Decimal::ZERO
    } else {
        npv_difference / standard_deviation
    };
    let probability_buy_favoured: Decimal = ok
        .iter()
        .filter(|o| o.npv_difference > Decimal::ZERO)
        .map(|o| w(o))
        .sum();

    ExpectedValue {
        npv_difference,
        ownership_npv,
        rental_npv,
        standard_deviation,
        risk_adjusted_ratio,
        probability_buy_favoured,
    }
}
