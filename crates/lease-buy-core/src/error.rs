use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LeaseBuyError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Parameter validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Invalid loan terms: {0}")]
    InvalidLoanTerms(String),

    #[error("Invalid terminal value inputs: {0}")]
    InvalidTerminalValueInputs(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Convergence failure: {function} did not converge after {iterations} iterations (delta: {last_delta})")]
    ConvergenceFailure {
        function: String,
        iterations: u32,
        last_delta: Decimal,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl LeaseBuyError {
    /// Individual messages for the structured failure result.
    pub fn validation_errors(&self) -> Vec<String> {
        match self {
            LeaseBuyError::Validation(errors) => errors.clone(),
            LeaseBuyError::InvalidInput { field, reason } => vec![format!("{field}: {reason}")],
            _ => Vec::new(),
        }
    }
}

impl From<serde_json::Error> for LeaseBuyError {
    fn from(e: serde_json::Error) -> Self {
        LeaseBuyError::SerializationError(e.to_string())
    }
}
