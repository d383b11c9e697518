pub mod config;
pub mod error;
pub mod npv;
pub mod params;
pub mod projection;
pub mod time_value;
pub mod types;

#[cfg(feature = "sensitivity")]
pub mod sensitivity;

#[cfg(feature = "decision")]
pub mod decision;

#[cfg(feature = "scenarios")]
pub mod scenarios;

pub use config::EngineConfig;
pub use error::LeaseBuyError;
pub use params::{CalculationParameters, ParameterKey};
pub use types::*;

/// Standard result type for all lease-buy operations
pub type LeaseBuyResult<T> = Result<T, LeaseBuyError>;
