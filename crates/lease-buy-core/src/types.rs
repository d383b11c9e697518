use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Currency amounts. Decimal throughout so cent-level sums stay exact.
pub type Money = Decimal;

/// Whole-number percentages (5 = 5%). Converted to a `Rate` only at the point of use.
pub type Percent = Decimal;

/// Rates expressed as decimals (0.05 = 5%).
pub type Rate = Decimal;

/// Area in square metres
pub type SquareMetres = Decimal;

/// Envelope returned by every reporting entry point: the payload plus the
/// assumptions it was computed under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub engine: String,
    pub version: String,
    pub computed_at: DateTime<Utc>,
    pub computation_time_us: u64,
    pub precision: String,
}

pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    let assumptions = serde_json::to_value(assumptions).unwrap_or(serde_json::Value::Null);
    ComputationOutput {
        result,
        methodology: methodology.into(),
        assumptions,
        warnings,
        metadata: ComputationMetadata {
            engine: env!("CARGO_PKG_NAME").into(),
            version: env!("CARGO_PKG_VERSION").into(),
            computed_at: Utc::now(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_96bit_mantissa".into(),
        },
    }
}
