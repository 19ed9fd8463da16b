//! CLI Commands
//!
//! Argument definitions for the harvester binary.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Coin Harvester - daily pump.fun migration dataset builder
#[derive(Parser, Debug)]
#[command(
    name = "coin-harvester",
    version = env!("CARGO_PKG_VERSION"),
    about = "Builds a daily dataset of pump.fun tokens that migrated to Raydium",
    long_about = "Coin Harvester exports the day's migration activity, enriches every \
                  token with metadata, holder stats and market-cap history, and appends \
                  the results to a per-day CSV file."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Harvest one day of migrations
    Run(RunCmd),

    /// List tokens in an activity snapshot that are absent from a result file
    Missing(MissingCmd),

    /// Print the epoch bounds of a day's activity window
    Window(WindowCmd),
}

/// Harvest one day
#[derive(Parser, Debug)]
pub struct RunCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/harvester.toml")]
    pub config: PathBuf,

    /// Day to harvest (YYYY-MM-DD or "yesterday", US Eastern)
    #[arg(short, long, value_name = "DATE", default_value = "yesterday")]
    pub date: String,

    /// Override the number of concurrent workers
    #[arg(short, long, value_name = "N")]
    pub workers: Option<usize>,

    /// Connect directly, ignoring configured proxies
    #[arg(long)]
    pub no_proxy: bool,
}

/// Reconcile a snapshot against a result file
#[derive(Parser, Debug)]
pub struct MissingCmd {
    /// Activity snapshot CSV
    #[arg(short, long, value_name = "FILE")]
    pub activities: PathBuf,

    /// Result CSV
    #[arg(short, long, value_name = "FILE")]
    pub results: PathBuf,
}

/// Show a day's window
#[derive(Parser, Debug)]
pub struct WindowCmd {
    /// Day (YYYY-MM-DD or "yesterday", US Eastern)
    #[arg(short, long, value_name = "DATE", default_value = "yesterday")]
    pub date: String,
}
