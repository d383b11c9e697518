use std::time::Instant;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{evaluate_override, NpvMemo, SensitivityEngine};
use crate::error::LeaseBuyError;
use crate::npv::{NpvResult, Recommendation};
use crate::params::{CalculationParameters, ParameterKey};
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::LeaseBuyResult;

/// One evaluated grid point. `npv_difference` is `None` for an `ERROR` cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub value: Decimal,
    pub npv_difference: Option<Money>,
    pub ownership_npv: Option<Money>,
    pub rental_npv: Option<Money>,
    pub recommendation: Recommendation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SweepPoint {
    pub(crate) fn from_result(value: Decimal, r: &NpvResult) -> Self {
        if r.calculation_successful {
            Self {
                value,
                npv_difference: Some(r.npv_difference),
                ownership_npv: Some(r.ownership_npv),
                rental_npv: Some(r.rental_npv),
                recommendation: r.recommendation,
                error: None,
            }
        } else {
            Self::failed(value, r.error_message.clone().unwrap_or_default())
        }
    }

    pub(crate) fn failed(value: Decimal, error: String) -> Self {
        Self {
            value,
            npv_difference: None,
            ownership_npv: None,
            rental_npv: None,
            recommendation: Recommendation::Error,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.npv_difference.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensitivityResult {
    pub parameter: ParameterKey,
    pub base_value: Decimal,
    pub points: Vec<SweepPoint>,
    pub min_npv_difference: Option<Money>,
    pub max_npv_difference: Option<Money>,
    /// max - min over successful points; zero when fewer than two succeeded.
    pub sensitivity_range: Money,
    /// Linear interpolation across the first bracketing pair of grid points.
    pub break_even_value: Option<Decimal>,
    pub failed_points: usize,
}

impl SensitivityResult {
    pub fn test_values(&self) -> Vec<Decimal> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn npv_differences(&self) -> Vec<Option<Money>> {
        self.points.iter().map(|p| p.npv_difference).collect()
    }

    pub(crate) fn from_points(
        parameter: ParameterKey,
        base_value: Decimal,
        points: Vec<SweepPoint>,
    ) -> Self {
        let successful: Vec<Money> = points.iter().filter_map(|p| p.npv_difference).collect();
        let min_npv_difference = successful.iter().copied().min();
        let max_npv_difference = successful.iter().copied().max();
        let sensitivity_range = match (min_npv_difference, max_npv_difference) {
            (Some(lo), Some(hi)) => hi - lo,
            _ => Decimal::ZERO,
        };
        let break_even_value = interpolate_break_even(&points);
        let failed_points = points.len() - successful.len();

        Self {
            parameter,
            base_value,
            points,
            min_npv_difference,
            max_npv_difference,
            sensitivity_range,
            break_even_value,
            failed_points,
        }
    }
}

/// First adjacent pair of successful points, in ascending order of value,
/// whose differences bracket zero.
pub fn interpolate_break_even(points: &[SweepPoint]) -> Option<Decimal> {
    let mut ordered: Vec<&SweepPoint> = points.iter().collect();
    ordered.sort_by(|a, b| a.value.cmp(&b.value));
    ordered.windows(2).find_map(|pair| {
        let (a, b) = (pair[0], pair[1]);
        let (ya, yb) = (a.npv_difference?, b.npv_difference?);
        let brackets = (ya <= Decimal::ZERO && Decimal::ZERO <= yb)
            || (yb <= Decimal::ZERO && Decimal::ZERO <= ya);
        if !brackets {
            return None;
        }
        if ya == yb {
            return Some(a.value);
        }
        Some(a.value + (Decimal::ZERO - ya) * (b.value - a.value) / (yb - ya))
    })
}

impl SensitivityEngine<'_> {
    /// Re-run the comparison once per test value with `parameter` overridden.
    pub fn sweep(
        &self,
        base: &CalculationParameters,
        parameter: ParameterKey,
        test_values: &[Decimal],
    ) -> SensitivityResult {
        let memo = NpvMemo::default();
        self.sweep_with(&memo, base, parameter, test_values)
    }

    pub(crate) fn sweep_with(
        &self,
        memo: &NpvMemo,
        base: &CalculationParameters,
        parameter: ParameterKey,
        test_values: &[Decimal],
    ) -> SensitivityResult {
        let points: Vec<SweepPoint> = test_values
            .iter()
            .map(|v| evaluate_override(memo, self.npv, base, parameter, *v))
            .collect();

        for p in points.iter().filter(|p| p.is_error()) {
            warn!(
                parameter = parameter.as_str(),
                value = %p.value,
                error = p.error.as_deref().unwrap_or(""),
                "sensitivity cell failed"
            );
        }

        SensitivityResult::from_points(parameter, parameter.get(base), points)
    }

    /// [`Self::sweep`] wrapped in the computation envelope.
    pub fn run_sweep(
        &self,
        base: &CalculationParameters,
        parameter: ParameterKey,
        test_values: &[Decimal],
    ) -> LeaseBuyResult<ComputationOutput<SensitivityResult>> {
        if test_values.is_empty() {
            return Err(LeaseBuyError::InvalidInput {
                field: "test_values".into(),
                reason: "At least one test value is required".into(),
            });
        }
        let start = Instant::now();
        let result = self.sweep(base, parameter, test_values);

        let warnings: Vec<String> = result
            .points
            .iter()
            .filter_map(|p| {
                p.error
                    .as_ref()
                    .map(|e| format!("{parameter}={}: {e}", p.value))
            })
            .collect();

        let elapsed = start.elapsed().as_micros() as u64;
        Ok(with_metadata(
            "One-way sensitivity of the NPV difference",
            &serde_json::json!({
                "parameter": parameter.as_str(),
                "points": test_values.len(),
                "break_even": "linear interpolation, first bracketing pair",
            }),
            warnings,
            elapsed,
            result,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::npv::NpvEngine;
    use rust_decimal_macros::dec;

    fn point(value: Decimal, diff: Option<Decimal>) -> SweepPoint {
        match diff {
            Some(d) => SweepPoint {
                value,
                npv_difference: Some(d),
                ownership_npv: Some(d),
                rental_npv: Some(Decimal::ZERO),
                recommendation: Recommendation::Marginal,
                error: None,
            },
            None => SweepPoint::failed(value, "boom".into()),
        }
    }

    #[test]
    fn test_interpolation_between_bracketing_pair() {
        let pts = vec![
            point(dec!(1), Some(dec!(-200))),
            point(dec!(2), Some(dec!(-100))),
            point(dec!(3), Some(dec!(100))),
        ];
        assert_eq!(interpolate_break_even(&pts), Some(dec!(2.5)));
    }

    #[test]
    fn test_interpolation_returns_first_crossing() {
        let pts = vec![
            point(dec!(0), Some(dec!(-10))),
            point(dec!(1), Some(dec!(10))),
            point(dec!(2), Some(dec!(-10))),
        ];
        assert_eq!(interpolate_break_even(&pts), Some(dec!(0.5)));
    }

    #[test]
    fn test_interpolation_ignores_caller_order() {
        let pts = vec![
            point(dec!(3), Some(dec!(100))),
            point(dec!(1), Some(dec!(-200))),
            point(dec!(2), Some(dec!(-100))),
        ];
        assert_eq!(interpolate_break_even(&pts), Some(dec!(2.5)));
    }

    #[test]
    fn test_interpolation_skips_error_cells() {
        let pts = vec![
            point(dec!(0), Some(dec!(-10))),
            point(dec!(1), None),
            point(dec!(2), Some(dec!(10))),
        ];
        assert_eq!(interpolate_break_even(&pts), None);
    }

    #[test]
    fn test_sweep_records_errors_and_continues() {
        let npv = NpvEngine::default();
        let engine = SensitivityEngine::new(&npv, &EngineConfig::default());
        let base = CalculationParameters::default();
        let result = engine.sweep(
            &base,
            ParameterKey::CostOfCapital,
            &[dec!(-150), dec!(6), dec!(8), dec!(10)],
        );
        assert_eq!(result.points.len(), 4);
        assert_eq!(result.failed_points, 1);
        assert_eq!(result.points[0].recommendation, Recommendation::Error);
        assert!(result.points[1..].iter().all(|p| !p.is_error()));
        assert!(result.sensitivity_range > Decimal::ZERO);
    }

    #[test]
    fn test_sweep_base_value_recorded() {
        let npv = NpvEngine::default();
        let engine = SensitivityEngine::new(&npv, &EngineConfig::default());
        let base = CalculationParameters::default();
        let result = engine.sweep(&base, ParameterKey::InterestRate, &[dec!(4), dec!(6)]);
        assert_eq!(result.base_value, dec!(5));
        assert_eq!(result.test_values(), vec![dec!(4), dec!(6)]);
    }
}
