//! CLI entry point for the coinbalance rebalancer.

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

use coinbalance_rebalancer::config::Config;
use coinbalance_rebalancer::error::Error;
use coinbalance_rebalancer::execution::{self, RunOptions};
use coinbalance_rebalancer::target::TargetSpec;

/// Exit code for a run that left orders unfilled, with `--strict`.
const EXIT_INCOMPLETE: i32 = 3;

#[derive(Parser)]
#[command(name = "rebalancer")]
#[command(about = "Target-weight portfolio rebalancer for Poloniex BTC markets")]
#[command(version)]
struct Cli {
    /// Path to config.toml (defaults apply when omitted and ./config.toml is absent)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Plan, confirm, and execute rebalance orders
    Run(RunArgs),

    /// Show current balances and their BTC value
    Balances,

    /// Check exchange connectivity and credentials
    Status,

    /// Cancel every open order
    Cancel,
}

#[derive(Args)]
struct RunArgs {
    /// Path to target.json
    #[arg(long, conflicts_with_all = ["coins", "parts"])]
    target: Option<PathBuf>,

    /// Coin symbols, several values
    #[arg(short, long, num_args = 1.., requires = "parts")]
    coins: Vec<String>,

    /// Relative parts for each coin, several values
    #[arg(short, long, num_args = 1.., requires = "coins")]
    parts: Vec<f64>,

    /// Deviation from target that triggers an order (0.1 = 10%)
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Order timeout in minutes
    #[arg(long)]
    timeout: Option<u64>,

    /// Show plan without executing
    #[arg(long)]
    dry_run: bool,

    /// Skip confirmation prompt (for automation/cron)
    #[arg(long)]
    force: bool,

    /// Exit with code 3 if any order was still open at the timeout
    #[arg(long)]
    strict: bool,
}

fn load_config(path: Option<&PathBuf>) -> Result<Config, Error> {
    let mut config = match path {
        Some(path) => Config::load(path)?,
        None => {
            let default = PathBuf::from("config.toml");
            if default.exists() {
                Config::load(&default)?
            } else {
                Config::default()
            }
        }
    };
    config.apply_env();
    Ok(config)
}

fn load_target(args: &RunArgs) -> Result<(TargetSpec, String), Error> {
    match &args.target {
        Some(path) => Ok((TargetSpec::load(path)?, path.display().to_string())),
        None if !args.coins.is_empty() => Ok((
            TargetSpec::from_parts(&args.coins, &args.parts)?,
            "command line".to_string(),
        )),
        None => Err(Error::Target(
            "either --target or --coins/--parts is required".into(),
        )),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let mut config = match load_config(cli.config.as_ref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Run(args) => {
            let (spec, source) = match load_target(&args) {
                Ok(t) => t,
                Err(e) => {
                    eprintln!("Error loading target: {e}");
                    process::exit(1);
                }
            };
            if let Some(threshold) = args.threshold {
                config.rebalance.threshold = threshold;
            }
            if let Some(minutes) = args.timeout {
                config.rebalance.timeout_minutes = minutes;
            }
            if let Err(e) = config.validate() {
                eprintln!("Error: {e}");
                process::exit(1);
            }

            let opts = RunOptions {
                dry_run: args.dry_run,
                force: args.force,
                target_source: source,
            };
            match execution::run(&config, &spec, &opts) {
                Ok(summary) if args.strict && summary.had_incomplete() => {
                    eprintln!("Some orders did not fill before the timeout");
                    process::exit(EXIT_INCOMPLETE);
                }
                Ok(_) => Ok(()),
                Err(e) => Err(e),
            }
        }
        Command::Balances => execution::show_balances(&config),
        Command::Status => execution::check_status(&config),
        Command::Cancel => execution::cancel_all(&config),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
