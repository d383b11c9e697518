mod commands;
mod input;
mod logging;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::analysis::AmortizeArgs;
use commands::decision::DecideArgs;
use commands::scenarios::ScenariosArgs;
use commands::sensitivity::{BreakEvenArgs, Sensitivity2dArgs, SensitivityArgs, TornadoArgs};
use commands::ParamsArgs;

/// Buy-versus-lease analysis for commercial property
#[derive(Parser)]
#[command(
    name = "lbx",
    version,
    about = "Buy-versus-lease analysis for commercial property",
    long_about = "Compares purchasing a commercial property with leasing equivalent space \
                  over a fixed horizon, in decimal precision. Covers NPV comparison, loan \
                  amortization, terminal values, sensitivity and break-even analysis, \
                  economic scenarios and a risk-adjusted recommendation."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// TOML engine configuration (thresholds, break-even limits, sweep catalogue)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log filter for stderr, e.g. "info" or "lease_buy_core=debug"
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Ownership NPV, rental NPV and the difference between them
    Compare(ParamsArgs),
    /// Full NPV breakdown with yearly flows and terminal values
    Analyze(ParamsArgs),
    /// Annual loan amortization schedule
    Amortize(AmortizeArgs),
    /// Year-by-year ownership and rental cash flows
    CashFlows(ParamsArgs),
    /// Ownership and rental terminal values at the horizon
    TerminalValue(ParamsArgs),
    /// Buy/rent recommendation with confidence and risk scores
    Decide(DecideArgs),
    /// One-way sensitivity sweep over a single parameter
    Sensitivity(SensitivityArgs),
    /// Two-way sensitivity grid over a pair of parameters
    #[command(name = "sensitivity-2d")]
    Sensitivity2d(Sensitivity2dArgs),
    /// Solve for the parameter value where buying and renting break even
    BreakEven(BreakEvenArgs),
    /// Sweep the parameter catalogue and rank parameters by impact
    Tornado(TornadoArgs),
    /// Probability-weighted economic scenarios
    Scenarios(ScenariosArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(&cli.log_level) {
        eprintln!("{}: {}", "warning".yellow().bold(), e);
    }

    let config = match input::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Compare(args) => commands::analysis::run_compare(args, &config),
        Commands::Analyze(args) => commands::analysis::run_analyze(args, &config),
        Commands::Amortize(args) => commands::analysis::run_amortize(args),
        Commands::CashFlows(args) => commands::analysis::run_cash_flows(args, &config),
        Commands::TerminalValue(args) => commands::analysis::run_terminal_value(args, &config),
        Commands::Decide(args) => commands::decision::run_decide(args, &config),
        Commands::Sensitivity(args) => commands::sensitivity::run_sensitivity(args, &config),
        Commands::Sensitivity2d(args) => commands::sensitivity::run_sensitivity_2d(args, &config),
        Commands::BreakEven(args) => commands::sensitivity::run_break_even(args, &config),
        Commands::Tornado(args) => commands::sensitivity::run_tornado(args, &config),
        Commands::Scenarios(args) => commands::scenarios::run_scenario_analysis(args, &config),
        Commands::Version => {
            println!("lbx {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
