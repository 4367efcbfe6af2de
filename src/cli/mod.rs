//! CLI module for switchpush
//!
//! Argument parsing and subcommand dispatch for the `switchpush` binary.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use switchpush::config::{Config, InventoryConfig};
use switchpush::logging::LogLevel;
use switchpush::output::OutputFormat;

/// switchpush - push configuration to fleets of network switches
///
/// Selects hosts from a SimpleInventory (hosts/groups/defaults YAML files)
/// and sends a configuration batch to each of them concurrently.
#[derive(Parser, Debug, Clone)]
#[command(name = "switchpush")]
#[command(version)]
#[command(about = "Concurrent configuration push to network switches", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true, env = "SWITCHPUSH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory containing hosts.yaml, groups.yaml and defaults.yaml
    #[arg(short = 'i', long, global = true)]
    pub inventory: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(long, global = true)]
    pub output: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Push a configuration plan to the selected hosts
    Run(commands::run::RunArgs),

    /// Show the resolved inventory
    Inventory(commands::inventory::InventoryArgs),

    /// Validate the configuration and print the effective settings
    #[command(name = "check-config")]
    CheckConfig(commands::check_config::CheckConfigArgs),
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }

    /// Apply global flags on top of the loaded configuration.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(dir) = &self.inventory {
            config.inventory = InventoryConfig::from_dir(dir);
        }
        if let Some(format) = self.output {
            config.output.format = format;
        }
        if self.no_color {
            config.output.color = false;
            config.logging.ansi = false;
        }
        if self.verbose > 0 {
            config.logging.level = LogLevel::from_verbosity(self.verbosity());
        }
    }
}
