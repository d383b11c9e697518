use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{evaluate_override, NpvMemo, SensitivityEngine};
use crate::error::LeaseBuyError;
use crate::params::{CalculationParameters, ParameterKey};
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::LeaseBuyResult;

/// Why a break-even search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// |NPV difference| fell within tolerance.
    Converged,
    NoSignChange,
    InvalidBracket,
    EvaluationFailed,
    TimedOut,
    /// Bracket narrowed below the convergence fraction without meeting tolerance.
    BracketConverged,
    IterationLimit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakEvenSearch {
    pub parameter: ParameterKey,
    pub lower_bound: Decimal,
    pub upper_bound: Decimal,
    pub tolerance: Money,
    /// Set only when `termination == Converged`.
    pub value: Option<Decimal>,
    pub npv_difference_at_value: Option<Money>,
    pub last_npv_difference: Option<Money>,
    pub iterations: u32,
    pub termination: Termination,
}

impl BreakEvenSearch {
    fn start(parameter: ParameterKey, lo: Decimal, hi: Decimal, tolerance: Money) -> Self {
        Self {
            parameter,
            lower_bound: lo,
            upper_bound: hi,
            tolerance,
            value: None,
            npv_difference_at_value: None,
            last_npv_difference: None,
            iterations: 0,
            termination: Termination::IterationLimit,
        }
    }

    fn found(mut self, value: Decimal, npv_difference: Money) -> Self {
        self.value = Some(value);
        self.npv_difference_at_value = Some(npv_difference);
        self.last_npv_difference = Some(npv_difference);
        self.termination = Termination::Converged;
        self
    }

    fn stop(mut self, termination: Termination) -> Self {
        self.termination = termination;
        self
    }

    pub fn is_converged(&self) -> bool {
        self.termination == Termination::Converged
    }

    /// `Err(ConvergenceFailure)` when no value was found.
    pub fn into_result(self) -> LeaseBuyResult<Decimal> {
        match self.value {
            Some(v) => Ok(v),
            None => Err(LeaseBuyError::ConvergenceFailure {
                function: format!("find_break_even({})", self.parameter),
                iterations: self.iterations,
                last_delta: self.last_npv_difference.unwrap_or(Decimal::ZERO),
            }),
        }
    }
}

impl SensitivityEngine<'_> {
    /// Bounded bisection for the value of `parameter` where the NPV
    /// difference crosses zero. Returns `None` unless the difference at the
    /// returned value is within `tolerance`.
    pub fn find_break_even(
        &self,
        base: &CalculationParameters,
        parameter: ParameterKey,
        lo: Decimal,
        hi: Decimal,
        tolerance: Money,
        timeout: Duration,
    ) -> Option<Decimal> {
        self.search_with(base, parameter, lo, hi, tolerance, timeout)
            .value
    }

    /// Search using the configured tolerance and timeout.
    pub fn search_break_even(
        &self,
        base: &CalculationParameters,
        parameter: ParameterKey,
        lo: Decimal,
        hi: Decimal,
    ) -> BreakEvenSearch {
        self.search_with(
            base,
            parameter,
            lo,
            hi,
            self.break_even.tolerance,
            Duration::from_millis(self.break_even.timeout_ms),
        )
    }

    pub fn run_break_even(
        &self,
        base: &CalculationParameters,
        parameter: ParameterKey,
        lo: Decimal,
        hi: Decimal,
    ) -> LeaseBuyResult<ComputationOutput<BreakEvenSearch>> {
        let start = Instant::now();
        let search = self.search_break_even(base, parameter, lo, hi);
        let mut warnings = Vec::new();
        if !search.is_converged() {
            warnings.push(format!(
                "No break-even for {parameter} in [{lo}, {hi}]: {:?}",
                search.termination
            ));
        }
        let elapsed = start.elapsed().as_micros() as u64;
        Ok(with_metadata(
            "Bounded bisection on the NPV difference with one interpolation refinement",
            &serde_json::json!({
                "parameter": parameter.as_str(),
                "tolerance": self.break_even.tolerance.to_string(),
                "timeout_ms": self.break_even.timeout_ms,
                "max_iterations": self.break_even.max_iterations,
                "convergence_fraction": self.break_even.convergence_fraction.to_string(),
            }),
            warnings,
            elapsed,
            search,
        ))
    }

    fn search_with(
        &self,
        base: &CalculationParameters,
        parameter: ParameterKey,
        lo: Decimal,
        hi: Decimal,
        tolerance: Money,
        timeout: Duration,
    ) -> BreakEvenSearch {
        let search = BreakEvenSearch::start(parameter, lo, hi, tolerance);
        let result = self.bisect(search, base, tolerance, timeout);
        match result.value {
            Some(v) => debug!(parameter = parameter.as_str(), value = %v, "break-even found"),
            None => warn!(
                parameter = parameter.as_str(),
                iterations = result.iterations,
                termination = ?result.termination,
                "break-even search stopped without converging"
            ),
        }
        result
    }

    fn bisect(
        &self,
        mut search: BreakEvenSearch,
        base: &CalculationParameters,
        tolerance: Money,
        timeout: Duration,
    ) -> BreakEvenSearch {
        let started = Instant::now();
        let memo = NpvMemo::default();
        let parameter = search.parameter;
        let (lo, hi) = (search.lower_bound, search.upper_bound);
        let eval = |v: Decimal| {
            evaluate_override(&memo, self.npv, base, parameter, v).npv_difference
        };
        let timed_out = || started.elapsed() >= timeout;

        if lo >= hi {
            return search.stop(Termination::InvalidBracket);
        }

        // Endpoints
        if timed_out() {
            return search.stop(Termination::TimedOut);
        }
        let Some(f_lo) = eval(lo) else {
            return search.stop(Termination::EvaluationFailed);
        };
        search.last_npv_difference = Some(f_lo);
        if f_lo.abs() <= tolerance {
            return search.found(lo, f_lo);
        }
        if timed_out() {
            return search.stop(Termination::TimedOut);
        }
        let Some(f_hi) = eval(hi) else {
            return search.stop(Termination::EvaluationFailed);
        };
        search.last_npv_difference = Some(f_hi);
        if f_hi.abs() <= tolerance {
            return search.found(hi, f_hi);
        }
        if (f_lo > Decimal::ZERO) == (f_hi > Decimal::ZERO) {
            return search.stop(Termination::NoSignChange);
        }

        let min_width = (hi - lo) * self.break_even.convergence_fraction;
        let (mut a, mut b, mut fa, mut fb) = (lo, hi, f_lo, f_hi);

        while search.iterations < self.break_even.max_iterations {
            if b - a < min_width {
                break;
            }
            if timed_out() {
                return search.stop(Termination::TimedOut);
            }
            let mid = (a + b) / Decimal::TWO;
            search.iterations += 1;
            let Some(fm) = eval(mid) else {
                return search.stop(Termination::EvaluationFailed);
            };
            search.last_npv_difference = Some(fm);
            if fm.abs() <= tolerance {
                return search.found(mid, fm);
            }
            if (fm > Decimal::ZERO) == (fa > Decimal::ZERO) {
                a = mid;
                fa = fm;
            } else {
                b = mid;
                fb = fm;
            }
        }

        let exhausted = if b - a < min_width {
            Termination::BracketConverged
        } else {
            Termination::IterationLimit
        };

        // One secant step inside the final bracket; kept only if it meets tolerance.
        if timed_out() {
            return search.stop(Termination::TimedOut);
        }
        let x = a - fa * (b - a) / (fb - fa);
        search.iterations += 1;
        match eval(x) {
            Some(fx) if fx.abs() <= tolerance => search.found(x, fx),
            Some(fx) => {
                search.last_npv_difference = Some(fx);
                search.stop(exhausted)
            }
            None => search.stop(exhausted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::npv::NpvEngine;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn engine_pair() -> (NpvEngine, EngineConfig) {
        (NpvEngine::default(), EngineConfig::default())
    }

    #[test]
    fn test_rent_break_even_substitutes_back_within_tolerance() {
        let (npv, cfg) = engine_pair();
        let engine = SensitivityEngine::new(&npv, &cfg);
        let base = CalculationParameters::default();

        let value = engine
            .find_break_even(
                &base,
                ParameterKey::CurrentAnnualRent,
                dec!(0),
                dec!(500000),
                dec!(1000),
                Duration::from_secs(30),
            )
            .expect("rent crossing should be found");

        let check = npv.compare(&base.with_override(ParameterKey::CurrentAnnualRent, value).unwrap());
        assert!(check.npv_difference.abs() <= dec!(1000));
    }

    #[test]
    fn test_zero_timeout_returns_none() {
        let (npv, cfg) = engine_pair();
        let engine = SensitivityEngine::new(&npv, &cfg);
        let base = CalculationParameters::default();
        let search = engine.search_with(
            &base,
            ParameterKey::CurrentAnnualRent,
            dec!(0),
            dec!(500000),
            dec!(1000),
            Duration::ZERO,
        );
        assert_eq!(search.termination, Termination::TimedOut);
        assert_eq!(search.value, None);
        assert!(search.into_result().is_err());
    }

    #[test]
    fn test_no_sign_change() {
        let (npv, cfg) = engine_pair();
        let engine = SensitivityEngine::new(&npv, &cfg);
        let search = engine.search_break_even(
            &CalculationParameters::default(),
            ParameterKey::CurrentAnnualRent,
            dec!(0),
            dec!(1),
        );
        assert_eq!(search.termination, Termination::NoSignChange);
        assert_eq!(search.value, None);
    }

    #[test]
    fn test_inverted_bracket() {
        let (npv, cfg) = engine_pair();
        let engine = SensitivityEngine::new(&npv, &cfg);
        let search = engine.search_break_even(
            &CalculationParameters::default(),
            ParameterKey::InterestRate,
            dec!(8),
            dec!(2),
        );
        assert_eq!(search.termination, Termination::InvalidBracket);
        assert_eq!(search.iterations, 0);
    }

    #[test]
    fn test_failed_endpoint_stops_search() {
        let (npv, cfg) = engine_pair();
        let engine = SensitivityEngine::new(&npv, &cfg);
        let search = engine.search_break_even(
            &CalculationParameters::default(),
            ParameterKey::CostOfCapital,
            dec!(-150),
            dec!(10),
        );
        assert_eq!(search.termination, Termination::EvaluationFailed);
        match search.into_result() {
            Err(LeaseBuyError::ConvergenceFailure { iterations, .. }) => assert_eq!(iterations, 0),
            other => panic!("unexpected {other:?}"),
        }
    }
}
