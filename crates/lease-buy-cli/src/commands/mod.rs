pub mod analysis;
pub mod decision;
pub mod scenarios;
pub mod sensitivity;

use clap::Args;

/// Arguments shared by commands that only need a parameter set
#[derive(Args)]
pub struct ParamsArgs {
    /// Path to a JSON or YAML parameter file (otherwise read from stdin)
    #[arg(long)]
    pub input: Option<String>,
}
