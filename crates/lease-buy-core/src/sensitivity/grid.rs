use std::time::Instant;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::{NpvMemo, SensitivityEngine};
use crate::error::LeaseBuyError;
use crate::params::{CalculationParameters, ParameterKey};
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::LeaseBuyResult;

/// Output of a two-way sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwoWaySensitivity {
    pub x_parameter: ParameterKey,
    pub y_parameter: ParameterKey,
    pub x_base: Decimal,
    pub y_base: Decimal,
    pub x_deltas: Vec<Decimal>,
    pub y_deltas: Vec<Decimal>,
    pub x_values: Vec<Decimal>,
    pub y_values: Vec<Decimal>,
    /// matrix[i][j] = NPV difference at (x_deltas[i], y_deltas[j]); `None` marks an ERROR cell.
    pub matrix: Vec<Vec<Option<Money>>>,
    pub base_case_npv_difference: Option<Money>,
    /// Position of the (0, 0) cell when both delta lists contain zero.
    pub base_case_position: Option<(usize, usize)>,
    pub min_npv_difference: Option<Money>,
    pub max_npv_difference: Option<Money>,
    pub failed_cells: usize,
}

/// Additive deltas used when the caller supplies none: -1.5 to +1.5 in 0.5 steps.
pub fn default_deltas() -> Vec<Decimal> {
    vec![
        dec!(-1.5),
        dec!(-1.0),
        dec!(-0.5),
        dec!(0),
        dec!(0.5),
        dec!(1.0),
        dec!(1.5),
    ]
}

impl SensitivityEngine<'_> {
    /// Apply additive deltas to two fields and evaluate every pair. A zero
    /// delta leaves the field untouched, so the (0, 0) cell is the base case.
    pub fn sweep_2d(
        &self,
        base: &CalculationParameters,
        x_param: ParameterKey,
        y_param: ParameterKey,
        x_deltas: &[Decimal],
        y_deltas: &[Decimal],
    ) -> LeaseBuyResult<TwoWaySensitivity> {
        if x_param == y_param {
            return Err(LeaseBuyError::InvalidInput {
                field: "y_param".into(),
                reason: "Two-way sensitivity needs two different parameters".into(),
            });
        }
        if x_deltas.is_empty() || y_deltas.is_empty() {
            return Err(LeaseBuyError::InvalidInput {
                field: "deltas".into(),
                reason: "Both delta lists must be non-empty".into(),
            });
        }

        let memo = NpvMemo::default();
        let x_base = x_param.get(base);
        let y_base = y_param.get(base);
        let base_case = memo.evaluate(self.npv, base.clone());

        let mut matrix = Vec::with_capacity(x_deltas.len());
        let mut failed_cells = 0;

        for dx in x_deltas {
            let mut row = Vec::with_capacity(y_deltas.len());
            for dy in y_deltas {
                let cell = perturb(base, x_param, *dx, y_param, *dy)
                    .map(|p| memo.evaluate(self.npv, p))
                    .ok()
                    .filter(|r| r.calculation_successful)
                    .map(|r| r.npv_difference);
                if cell.is_none() {
                    failed_cells += 1;
                }
                row.push(cell);
            }
            matrix.push(row);
        }

        let flat: Vec<Money> = matrix.iter().flatten().filter_map(|c| *c).collect();
        let base_case_position = x_deltas
            .iter()
            .position(|d| d.is_zero())
            .zip(y_deltas.iter().position(|d| d.is_zero()));

        Ok(TwoWaySensitivity {
            x_parameter: x_param,
            y_parameter: y_param,
            x_base,
            y_base,
            x_deltas: x_deltas.to_vec(),
            y_deltas: y_deltas.to_vec(),
            x_values: x_deltas.iter().map(|d| x_base + d).collect(),
            y_values: y_deltas.iter().map(|d| y_base + d).collect(),
            matrix,
            base_case_npv_difference: base_case
                .calculation_successful
                .then_some(base_case.npv_difference),
            base_case_position,
            min_npv_difference: flat.iter().copied().min(),
            max_npv_difference: flat.iter().copied().max(),
            failed_cells,
        })
    }

    pub fn run_sweep_2d(
        &self,
        base: &CalculationParameters,
        x_param: ParameterKey,
        y_param: ParameterKey,
        x_deltas: &[Decimal],
        y_deltas: &[Decimal],
    ) -> LeaseBuyResult<ComputationOutput<TwoWaySensitivity>> {
        let start = Instant::now();
        let result = self.sweep_2d(base, x_param, y_param, x_deltas, y_deltas)?;
        let mut warnings = Vec::new();
        if result.failed_cells > 0 {
            warnings.push(format!(
                "{} of {} cells failed to evaluate",
                result.failed_cells,
                x_deltas.len() * y_deltas.len()
            ));
        }
        let elapsed = start.elapsed().as_micros() as u64;
        Ok(with_metadata(
            "Two-way sensitivity of the NPV difference (additive deltas)",
            &serde_json::json!({
                "x_parameter": x_param.as_str(),
                "y_parameter": y_param.as_str(),
            }),
            warnings,
            elapsed,
            result,
        ))
    }
}

fn perturb(
    base: &CalculationParameters,
    x_param: ParameterKey,
    dx: Decimal,
    y_param: ParameterKey,
    dy: Decimal,
) -> LeaseBuyResult<CalculationParameters> {
    let mut params = base.clone();
    if !dx.is_zero() {
        x_param.apply(&mut params, x_param.get(base) + dx)?;
    }
    if !dy.is_zero() {
        y_param.apply(&mut params, y_param.get(base) + dy)?;
    }
    Ok(params)
}
