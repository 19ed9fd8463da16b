//! CLI Adapter
//!
//! Command-line interface for the harvester.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{CliApp, Command, MissingCmd, RunCmd, WindowCmd};
