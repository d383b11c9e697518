pub mod file;
pub mod stdin;

use lease_buy_core::{CalculationParameters, EngineConfig};
use tracing::debug;

/// Parameters from `--input` or piped stdin, checked at the boundary.
pub fn load_params(path: Option<&str>) -> Result<CalculationParameters, Box<dyn std::error::Error>> {
    let params: CalculationParameters = if let Some(path) = path {
        file::read_structured(path)?
    } else if let Some(data) = stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file.json|file.yaml> or stdin required".into());
    };
    params.validate()?;
    Ok(params)
}

/// Engine configuration from `--config`, or the built-in defaults.
pub fn load_config(path: Option<&str>) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            debug!(path = p, "loading engine config");
            file::read_toml(p)
        }
        None => Ok(EngineConfig::default()),
    }
}
