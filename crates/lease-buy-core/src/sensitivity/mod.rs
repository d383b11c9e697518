//! Sensitivity analysis over the NPV comparison.
//!
//! Every sweep re-runs [`NpvEngine::compare`] with one or two fields
//! overridden. A failed cell is recorded as an `ERROR` point and the sweep
//! carries on. Identical parameter sets are evaluated once per sweep.

pub mod break_even;
pub mod grid;
pub mod sweep;
pub mod tornado;

use std::collections::HashMap;
use std::sync::Mutex;

use rust_decimal::Decimal;

use crate::config::{BreakEvenConfig, EngineConfig, SweepConfig};
use crate::npv::{NpvEngine, NpvResult};
use crate::params::{CalculationParameters, ParameterKey};

pub use break_even::{BreakEvenSearch, Termination};
pub use grid::TwoWaySensitivity;
pub use sweep::{SensitivityResult, SweepPoint};
pub use tornado::{
    BreakEvenSummary, ComprehensiveSensitivity, ParameterSensitivity, Stability, TornadoBar,
};

pub struct SensitivityEngine<'a> {
    npv: &'a NpvEngine,
    break_even: BreakEvenConfig,
    sweep: SweepConfig,
}

impl<'a> SensitivityEngine<'a> {
    pub fn new(npv: &'a NpvEngine, config: &EngineConfig) -> Self {
        Self {
            npv,
            break_even: config.break_even.clone(),
            sweep: config.sweep.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-sweep memo
// ---------------------------------------------------------------------------

/// Results keyed by the full parameter record, shared by the workers of one sweep.
#[derive(Default)]
pub(crate) struct NpvMemo {
    cache: Mutex<HashMap<CalculationParameters, NpvResult>>,
}

impl NpvMemo {
    pub(crate) fn evaluate(&self, engine: &NpvEngine, params: CalculationParameters) -> NpvResult {
        if let Some(hit) = self.lock().get(&params) {
            return hit.clone();
        }
        // lock released while evaluating
        let result = engine.compare(&params);
        self.lock().insert(params, result.clone());
        result
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CalculationParameters, NpvResult>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Evaluate the base parameters with one field replaced.
pub(crate) fn evaluate_override(
    memo: &NpvMemo,
    engine: &NpvEngine,
    base: &CalculationParameters,
    key: ParameterKey,
    value: Decimal,
) -> SweepPoint {
    match base.with_override(key, value) {
        Ok(params) => SweepPoint::from_result(value, &memo.evaluate(engine, params)),
        Err(e) => SweepPoint::failed(value, e.to_string()),
    }
}

/// `points` evenly spaced values from `min` to `max`, endpoints included.
pub fn linspace(min: Decimal, max: Decimal, points: u32) -> Vec<Decimal> {
    match points {
        0 => Vec::new(),
        1 => vec![min],
        n => {
            let step = (max - min) / Decimal::from(n - 1);
            (0..n)
                .map(|i| if i == n - 1 { max } else { min + step * Decimal::from(i) })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_linspace_endpoints() {
        let v = linspace(dec!(1), dec!(12), 12);
        assert_eq!(v.len(), 12);
        assert_eq!(v[0], dec!(1));
        assert_eq!(v[1], dec!(2));
        assert_eq!(v[11], dec!(12));
        assert!(linspace(dec!(0), dec!(1), 0).is_empty());
        assert_eq!(linspace(dec!(3), dec!(9), 1), vec![dec!(3)]);
    }

    #[test]
    fn test_memo_reuses_identical_parameters() {
        let engine = NpvEngine::default();
        let memo = NpvMemo::default();
        let p = CalculationParameters::default();
        let a = memo.evaluate(&engine, p.clone());
        let b = memo.evaluate(&engine, p);
        assert_eq!(a, b);
        assert_eq!(memo.len(), 1);
    }
}
