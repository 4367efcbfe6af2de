//! Check-config command - validate configuration
//!
//! This module implements the `check-config` subcommand.

use super::{CommandContext, Runnable};
use anyhow::Result;
use clap::Parser;

use switchpush::output::OutputFormat;

/// Arguments for the check-config command
#[derive(Parser, Debug, Clone)]
pub struct CheckConfigArgs {
    /// Also load the inventory and check every plan selects hosts
    #[arg(long = "resolve-inventory")]
    pub resolve_inventory: bool,

    /// Do not print the effective configuration
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

#[async_trait::async_trait]
impl Runnable for CheckConfigArgs {
    async fn execute(&self, ctx: &CommandContext) -> Result<i32> {
        let config = &ctx.config;
        config
            .validate()
            .map_err(|e| switchpush::Error::config(format!("{:#}", e)))?;

        if self.resolve_inventory {
            let inventory = ctx.load_inventory().await?;
            for plan in &config.push {
                let hosts = inventory.filter(&plan.filter()?);
                if hosts.is_empty() {
                    ctx.warning(&format!("Push plan '{}' selects no hosts", plan.name));
                } else if ctx.verbosity > 0 {
                    println!("{}: {}", plan.name, hosts.names().join(", "));
                }
            }
        }

        if !self.quiet {
            match ctx.format() {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
                OutputFormat::Yaml => print!("{}", serde_yaml::to_string(config)?),
                OutputFormat::Human | OutputFormat::Minimal => {
                    print!("{}", toml::to_string_pretty(config)?)
                }
            }
        }

        ctx.info("Configuration OK");
        Ok(0)
    }
}
