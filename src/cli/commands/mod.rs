//! Subcommands module for the switchpush CLI

pub mod check_config;
pub mod inventory;
pub mod run;

use anyhow::Result;
use colored::Colorize;

use switchpush::config::Config;
use switchpush::inventory::{Inventory, InventoryPlugin};
use switchpush::output::{OutputFormat, ResultPrinter};

/// Common context shared between commands
pub struct CommandContext {
    /// Effective configuration (file, environment and global flags)
    pub config: Config,
    /// Result renderer
    pub printer: ResultPrinter,
    /// Verbosity level
    pub verbosity: u8,
}

impl CommandContext {
    pub fn new(config: Config, verbosity: u8) -> Self {
        let printer = ResultPrinter::new(config.output.format, config.output.color);
        Self {
            config,
            printer,
            verbosity,
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.printer.format()
    }

    fn use_color(&self) -> bool {
        self.config.output.color && std::env::var_os("NO_COLOR").is_none()
    }

    /// Load the inventory named by the configuration.
    pub async fn load_inventory(&self) -> switchpush::Result<Inventory> {
        let plugin = self.config.inventory.plugin();
        Ok(plugin.parse().await?)
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        if self.use_color() {
            println!("\n{}", title.cyan().bold());
            println!("{}", "-".repeat(title.len()).cyan());
        } else {
            println!("\n{}", title);
            println!("{}", "-".repeat(title.len()));
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.use_color() {
            eprintln!("{} {}", "WARNING:".yellow().bold(), message);
        } else {
            eprintln!("WARNING: {}", message);
        }
    }

    /// Print an informational message
    pub fn info(&self, message: &str) {
        if self.use_color() {
            println!("{}", message.green());
        } else {
            println!("{}", message);
        }
    }
}

/// Trait for runnable commands
#[async_trait::async_trait]
pub trait Runnable {
    /// Execute the command and return the process exit code
    async fn execute(&self, ctx: &CommandContext) -> Result<i32>;
}
