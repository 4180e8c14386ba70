//! # Fuelbook CLI
//!
//! Station books for a fuel pump: dip-to-volume conversion, stock ledger
//! audits and shift cash reconciliation.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Parse arguments (clap)                                              │
//! │  2. Load fuelbook.toml + FUELBOOK_* overrides                           │
//! │  3. Initialize tracing (RUST_LOG wins over [logging] level)             │
//! │  4. Open SQLite, run migrations                                        │
//! │  5. Dispatch the command                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod calibration;
mod cli;
mod commands;
mod config;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use config::FuelbookConfig;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match FuelbookConfig::load(cli.config.clone()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&config, cli.verbose);

    if let Err(e) = commands::execute(cli, config).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=fuelbook_db=trace` - Trace for the storage layer only
/// - Default: `[logging] level` from config, `debug` with `--verbose`
///
/// Logs go to stderr so `--format json` output stays parseable.
fn init_tracing(config: &FuelbookConfig, verbose: bool) {
    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,fuelbook_db={level},fuelbook={level},sqlx=warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
