//! Command-line interface for flightlog.
//!
//! This module provides the CLI structure and output formatting for the
//! `ofl` binary.

mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, ExportCommand, ListCommand, OutputFormat, ServeCommand, StatsCommand,
    StatusCommand,
};

/// ofl - Open Flight Log
///
/// A personal pilot logbook: record flights in the browser, review totals,
/// and export everything to CSV.
#[derive(Debug, Parser)]
#[command(name = "ofl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the web application
    Serve(ServeCommand),

    /// Show logbook statistics
    Stats(StatsCommand),

    /// List logged flights
    List(ListCommand),

    /// Export all flights to CSV
    Export(ExportCommand),

    /// Show database location and state
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
