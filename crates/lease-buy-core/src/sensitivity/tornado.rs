use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{evaluate_override, linspace, NpvMemo, SensitivityEngine, SensitivityResult, SweepPoint};
use crate::config::{SweepRange, SweepSpec};
use crate::npv::Recommendation;
use crate::params::{CalculationParameters, ParameterKey};
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::LeaseBuyResult;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stability {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSensitivity {
    pub parameter: ParameterKey,
    pub label: String,
    pub critical: bool,
    pub result: SensitivityResult,
    /// Whether any successful grid point lands on the other side of zero from the base case.
    pub recommendation_flips: bool,
    pub flip_count: usize,
    pub flip_share: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TornadoBar {
    pub parameter: ParameterKey,
    pub label: String,
    pub low_value: Decimal,
    pub high_value: Decimal,
    pub npv_at_low: Option<Money>,
    pub npv_at_high: Option<Money>,
    pub sensitivity_range: Money,
    pub critical: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakEvenSummary {
    pub parameter: ParameterKey,
    pub label: String,
    pub base_value: Decimal,
    pub break_even_value: Decimal,
    /// Relative move from the base value, in percent. `None` when the base is zero.
    pub change_pct: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComprehensiveSensitivity {
    pub base_npv_difference: Money,
    pub base_recommendation: Recommendation,
    /// Catalogue order.
    pub parameters: Vec<ParameterSensitivity>,
    /// Sorted by sensitivity range, widest first.
    pub tornado: Vec<TornadoBar>,
    pub break_evens: Vec<BreakEvenSummary>,
    pub most_sensitive: Option<ParameterKey>,
    pub least_sensitive: Option<ParameterKey>,
    pub flip_share: Decimal,
    pub stability: Stability,
    pub total_evaluations: usize,
    pub failed_evaluations: usize,
    pub distinct_evaluations: usize,
}

/// Grid values for one catalogue entry around the base parameters.
pub fn grid_values(spec: &SweepSpec, base: &CalculationParameters) -> Vec<Decimal> {
    let (min, max) = match &spec.range {
        SweepRange::Absolute { min, max } => (*min, *max),
        SweepRange::RelativeToBase { pct } => {
            let b = spec.parameter.get(base);
            let shift = *pct / Decimal::ONE_HUNDRED;
            (b * (Decimal::ONE - shift), b * (Decimal::ONE + shift))
        }
    };
    let mut values = linspace(min, max, spec.points);
    if spec.parameter.is_integer() {
        values.iter_mut().for_each(|v| *v = v.round());
        values.dedup();
    }
    values
}

impl SensitivityEngine<'_> {
    /// Sweep every catalogue entry and rank the parameters for a tornado chart.
    pub fn comprehensive(
        &self,
        base: &CalculationParameters,
    ) -> LeaseBuyResult<ComputationOutput<ComprehensiveSensitivity>> {
        let start = Instant::now();
        let memo = NpvMemo::default();

        let base_result = memo.evaluate(self.npv, base.clone()).into_result()?;
        let base_buys = base_result.npv_difference > Decimal::ZERO;

        let specs: Vec<&SweepSpec> = self
            .sweep
            .catalogue
            .iter()
            .filter(|s| !self.sweep.critical_only || s.critical)
            .collect();
        info!(parameters = specs.len(), "comprehensive sensitivity started");

        // (catalogue index, grid index, value)
        let jobs: Vec<(usize, usize, Decimal)> = specs
            .iter()
            .enumerate()
            .flat_map(|(s, spec)| {
                grid_values(spec, base)
                    .into_iter()
                    .enumerate()
                    .map(move |(g, v)| (s, g, v))
            })
            .collect();

        let evaluate = |&(s, g, v): &(usize, usize, Decimal)| {
            (s, g, evaluate_override(&memo, self.npv, base, specs[s].parameter, v))
        };
        #[cfg(feature = "parallel")]
        let mut evaluated: Vec<(usize, usize, SweepPoint)> = jobs.par_iter().map(evaluate).collect();
        #[cfg(not(feature = "parallel"))]
        let mut evaluated: Vec<(usize, usize, SweepPoint)> = jobs.iter().map(evaluate).collect();

        // re-join by key, never by completion order
        evaluated.sort_by_key(|(s, g, _)| (*s, *g));
        let mut buckets: Vec<Vec<SweepPoint>> = vec![Vec::new(); specs.len()];
        for (s, _, point) in evaluated {
            buckets[s].push(point);
        }

        let mut warnings = Vec::new();
        let mut parameters = Vec::with_capacity(specs.len());
        let (mut flips, mut successful, mut failed) = (0usize, 0usize, 0usize);

        for (spec, points) in specs.iter().zip(buckets) {
            let key = spec.parameter;
            for p in points.iter().filter(|p| p.is_error()) {
                warn!(parameter = key.as_str(), value = %p.value, "sensitivity cell failed");
                warnings.push(format!(
                    "{key}={}: {}",
                    p.value,
                    p.error.as_deref().unwrap_or("evaluation failed")
                ));
            }
            let result = SensitivityResult::from_points(key, key.get(base), points);
            let ok = result.points.len() - result.failed_points;
            let flip_count = result
                .points
                .iter()
                .filter_map(|p| p.npv_difference)
                .filter(|d| (*d > Decimal::ZERO) != base_buys)
                .count();

            flips += flip_count;
            successful += ok;
            failed += result.failed_points;

            parameters.push(ParameterSensitivity {
                parameter: key,
                label: key.label(),
                critical: spec.critical,
                recommendation_flips: flip_count > 0,
                flip_count,
                flip_share: share(flip_count, ok),
                result,
            });
        }

        let mut tornado: Vec<TornadoBar> = parameters.iter().map(tornado_bar).collect();
        tornado.sort_by(|a, b| b.sensitivity_range.cmp(&a.sensitivity_range));

        let break_evens: Vec<BreakEvenSummary> = parameters
            .iter()
            .filter_map(|ps| {
                let value = ps.result.break_even_value?;
                let base_value = ps.result.base_value;
                Some(BreakEvenSummary {
                    parameter: ps.parameter,
                    label: ps.label.clone(),
                    base_value,
                    break_even_value: value,
                    change_pct: (!base_value.is_zero())
                        .then(|| (value - base_value) / base_value.abs() * Decimal::ONE_HUNDRED),
                })
            })
            .collect();

        let flip_share = share(flips, successful);
        let stability = if successful == 0 {
            Stability::Low
        } else if flip_share <= self.sweep.high_stability_max_flip {
            Stability::High
        } else if flip_share <= self.sweep.medium_stability_max_flip {
            Stability::Medium
        } else {
            Stability::Low
        };

        let summary = ComprehensiveSensitivity {
            base_npv_difference: base_result.npv_difference,
            base_recommendation: base_result.recommendation,
            most_sensitive: tornado.first().map(|b| b.parameter),
            least_sensitive: tornado.last().map(|b| b.parameter),
            parameters,
            tornado,
            break_evens,
            flip_share,
            stability,
            total_evaluations: jobs.len(),
            failed_evaluations: failed,
            distinct_evaluations: memo.len(),
        };
        info!(
            evaluations = summary.total_evaluations,
            failed = summary.failed_evaluations,
            stability = ?summary.stability,
            "comprehensive sensitivity finished"
        );

        let elapsed = start.elapsed().as_micros() as u64;
        Ok(with_metadata(
            "One-way sweeps over the sensitivity catalogue, ranked by NPV-difference range",
            &serde_json::json!({
                "critical_only": self.sweep.critical_only,
                "parallel": cfg!(feature = "parallel"),
                "stability_thresholds": {
                    "high": self.sweep.high_stability_max_flip.to_string(),
                    "medium": self.sweep.medium_stability_max_flip.to_string(),
                },
            }),
            warnings,
            elapsed,
            summary,
        ))
    }
}

fn tornado_bar(ps: &ParameterSensitivity) -> TornadoBar {
    let first = ps.result.points.first();
    let last = ps.result.points.last();
    TornadoBar {
        parameter: ps.parameter,
        label: ps.label.clone(),
        low_value: first.map(|p| p.value).unwrap_or(ps.result.base_value),
        high_value: last.map(|p| p.value).unwrap_or(ps.result.base_value),
        npv_at_low: first.and_then(|p| p.npv_difference),
        npv_at_high: last.and_then(|p| p.npv_difference),
        sensitivity_range: ps.result.sensitivity_range,
        critical: ps.critical,
    }
}

fn share(count: usize, of: usize) -> Decimal {
    if of == 0 {
        Decimal::ZERO
    } else {
        Decimal::from(count) / Decimal::from(of)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::npv::NpvEngine;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_catalogue_shape() {
        let npv = NpvEngine::default();
        let engine = SensitivityEngine::new(&npv, &EngineConfig::default());
        let out = engine.comprehensive(&CalculationParameters::default()).unwrap();
        let s = out.result;

        assert_eq!(s.parameters.len(), 8);
        assert_eq!(s.total_evaluations, 75);
        assert_eq!(s.failed_evaluations, 0);
        assert!(s.distinct_evaluations <= s.total_evaluations + 1);
        assert!(s
            .tornado
            .windows(2)
            .all(|w| w[0].sensitivity_range >= w[1].sensitivity_range));
        assert_eq!(s.most_sensitive, Some(s.tornado[0].parameter));
        assert!(s.flip_share >= Decimal::ZERO && s.flip_share <= Decimal::ONE);
    }

    #[test]
    fn test_matches_sequential_sweeps() {
        let npv = NpvEngine::default();
        let engine = SensitivityEngine::new(&npv, &EngineConfig::default());
        let base = CalculationParameters::default();
        let out = engine.comprehensive(&base).unwrap();

        for (spec, ps) in EngineConfig::default().sweep.catalogue.iter().zip(&out.result.parameters) {
            let expected = engine.sweep(&base, spec.parameter, &grid_values(spec, &base));
            assert_eq!(ps.result, expected);
        }
    }

    #[test]
    fn test_critical_only() {
        let npv = NpvEngine::default();
        let mut cfg = EngineConfig::default();
        cfg.sweep.critical_only = true;
        let engine = SensitivityEngine::new(&npv, &cfg);
        let out = engine.comprehensive(&CalculationParameters::default()).unwrap();
        assert_eq!(out.result.parameters.len(), 6);
        assert!(out.result.parameters.iter().all(|p| p.critical));
    }

    #[test]
    fn test_relative_grid_around_base() {
        let spec = SweepSpec {
            parameter: ParameterKey::PurchasePrice,
            range: SweepRange::RelativeToBase { pct: dec!(20) },
            points: 9,
            critical: true,
        };
        let grid = grid_values(&spec, &CalculationParameters::default());
        assert_eq!(grid.first(), Some(&dec!(400000)));
        assert_eq!(grid[4], dec!(500000));
        assert_eq!(grid.last(), Some(&dec!(600000)));
    }

    #[test]
    fn test_whole_year_grid_rounds_and_dedups() {
        let spec = SweepSpec {
            parameter: ParameterKey::LoanTerm,
            range: SweepRange::Absolute { min: dec!(10), max: dec!(12) },
            points: 5,
            critical: false,
        };
        let grid = grid_values(&spec, &CalculationParameters::default());
        assert_eq!(grid, vec![dec!(10), dec!(11), dec!(12)]);
    }

    #[test]
    fn test_failing_base_case_is_an_error() {
        let npv = NpvEngine::default();
        let engine = SensitivityEngine::new(&npv, &EngineConfig::default());
        let base = CalculationParameters {
            cost_of_capital: dec!(-100),
            ..Default::default()
        };
        assert!(engine.comprehensive(&base).is_err());
    }
}
