//! Engine tuning knobs, supplied once by the caller and passed down
//! explicitly. Every section has a serde default so partial files work.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::params::ParameterKey;
use crate::types::Money;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub npv: NpvConfig,
    pub break_even: BreakEvenConfig,
    pub sweep: SweepConfig,
}

/// Coarse BUY / RENT / MARGINAL mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NpvConfig {
    /// Half-width of the MARGINAL dead band around zero.
    pub marginal_band: Money,
    /// |difference| / |rental NPV| at or above which confidence is High.
    pub high_confidence_ratio: Decimal,
    pub medium_confidence_ratio: Decimal,
}

impl Default for NpvConfig {
    fn default() -> Self {
        Self {
            marginal_band: dec!(500000),
            high_confidence_ratio: dec!(0.25),
            medium_confidence_ratio: dec!(0.10),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakEvenConfig {
    /// Largest |NPV difference| accepted as a crossing.
    pub tolerance: Money,
    pub timeout_ms: u64,
    pub max_iterations: u32,
    /// Stop bisecting once the bracket is narrower than this share of the
    /// starting span.
    pub convergence_fraction: Decimal,
}

impl Default for BreakEvenConfig {
    fn default() -> Self {
        Self {
            tolerance: dec!(1000),
            timeout_ms: 30_000,
            max_iterations: 20,
            convergence_fraction: dec!(0.01),
        }
    }
}

/// How a catalogue entry's grid bounds are derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SweepRange {
    Absolute { min: Decimal, max: Decimal },
    /// Base value scaled by `1 - pct/100` and `1 + pct/100`.
    RelativeToBase { pct: Decimal },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSpec {
    pub parameter: ParameterKey,
    pub range: SweepRange,
    /// Number of evenly spaced grid points, endpoints included.
    pub points: u32,
    #[serde(default)]
    pub critical: bool,
}

impl SweepSpec {
    fn absolute(parameter: ParameterKey, min: Decimal, max: Decimal, points: u32, critical: bool) -> Self {
        Self {
            parameter,
            range: SweepRange::Absolute { min, max },
            points,
            critical,
        }
    }

    fn relative(parameter: ParameterKey, pct: Decimal, points: u32, critical: bool) -> Self {
        Self {
            parameter,
            range: SweepRange::RelativeToBase { pct },
            points,
            critical,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub catalogue: Vec<SweepSpec>,
    /// Restrict the comprehensive sweep to critical entries.
    pub critical_only: bool,
    /// Flip share at or below which stability is High.
    pub high_stability_max_flip: Decimal,
    pub medium_stability_max_flip: Decimal,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            catalogue: vec![
                SweepSpec::absolute(ParameterKey::InterestRate, dec!(1), dec!(12), 11, true),
                SweepSpec::absolute(ParameterKey::MarketAppreciationRate, dec!(0), dec!(8), 9, true),
                SweepSpec::absolute(ParameterKey::RentIncreaseRate, dec!(0), dec!(8), 9, true),
                SweepSpec::absolute(ParameterKey::CostOfCapital, dec!(4), dec!(15), 12, true),
                SweepSpec::absolute(ParameterKey::DownPaymentPct, dec!(10), dec!(100), 10, false),
                SweepSpec::absolute(ParameterKey::PropertyTaxRate, dec!(0.5), dec!(3), 6, false),
                SweepSpec::relative(ParameterKey::PurchasePrice, dec!(20), 9, true),
                SweepSpec::relative(ParameterKey::CurrentAnnualRent, dec!(20), 9, true),
            ],
            critical_only: false,
            high_stability_max_flip: dec!(0.1),
            medium_stability_max_flip: dec!(0.3),
        }
    }
}
