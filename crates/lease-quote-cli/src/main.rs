mod commands;
mod config;
mod input;
mod output;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use lease_quote_core::settings::QuoteSettings;

use commands::deal::{AllocateArgs, PaymentArgs, SolveArgs};
use commands::quote::{BalanceArgs, GridArgs, OptionsArgs, QuoteArgs};

/// Dealership lease quoting
#[derive(Parser)]
#[command(
    name = "lq",
    version,
    about = "Dealership lease payment quoting",
    long_about = "Quote vehicle leases with decimal precision. Computes monthly payments, \
                  allocates customer incentives, solves for a due-at-signing target, and \
                  ranks term x mileage options from lease program data."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Settings file (TOML); lease-quote.toml is read when present
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log to stderr (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Monthly payment for one deal, with fund allocation
    Payment(PaymentArgs),
    /// Split an amount across customer funds in priority order
    Allocate(AllocateArgs),
    /// Solve the cap cost reduction for a total due at signing
    Solve(SolveArgs),
    /// Price and rank options from explicit lease program rows
    Options(OptionsArgs),
    /// Full quote for a vehicle from a dataset
    Quote(QuoteArgs),
    /// Monthly payments across cash-down levels
    Grid(GridArgs),
    /// Solve one option of a vehicle for a due-at-signing target
    Balance(BalanceArgs),
    /// Show version information
    Version,
}

#[derive(Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(
    command: Commands,
    settings: &QuoteSettings,
) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    match command {
        Commands::Payment(args) => commands::deal::run_payment(args, settings),
        Commands::Allocate(args) => commands::deal::run_allocate(args, settings),
        Commands::Solve(args) => commands::deal::run_solve(args, settings),
        Commands::Options(args) => commands::quote::run_options(args),
        Commands::Quote(args) => commands::quote::run_quote(args, settings),
        Commands::Grid(args) => commands::quote::run_grid(args, settings),
        Commands::Balance(args) => commands::quote::run_balance(args, settings),
        Commands::Version => Ok(serde_json::json!({ "version": env!("CARGO_PKG_VERSION") })),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::Version = cli.command {
        println!("lq {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let result = config::load_settings(cli.config.as_deref())
        .and_then(|settings| run(cli.command, &settings));

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
