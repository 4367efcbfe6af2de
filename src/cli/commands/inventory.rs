//! Inventory command - show resolved hosts
//!
//! This module implements the `inventory` subcommand. Without `--host` it
//! lists every host selected by `--limit`.

use super::{CommandContext, Runnable};
use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::sync::Arc;

use switchpush::inventory::{Host, HostSet};
use switchpush::output::OutputFormat;

/// Arguments for the inventory command
#[derive(Parser, Debug, Clone)]
pub struct InventoryArgs {
    /// Show one host with its inherited settings
    #[arg(long)]
    pub host: Option<String>,

    /// Limit to hosts matching this pattern
    #[arg(short = 'l', long, default_value = "all")]
    pub limit: String,
}

#[derive(Serialize)]
struct HostRow<'a> {
    name: &'a str,
    address: &'a str,
    port: u16,
    platform: Option<&'a str>,
    groups: &'a [String],
}

impl<'a> From<&'a Arc<Host>> for HostRow<'a> {
    fn from(host: &'a Arc<Host>) -> Self {
        Self {
            name: &host.name,
            address: host.address(),
            port: host.port(),
            platform: host.platform(),
            groups: &host.groups,
        }
    }
}

impl InventoryArgs {
    fn show_host(&self, ctx: &CommandContext, host: &Host) -> Result<()> {
        match ctx.format() {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(host)?),
            _ => print!("{}", serde_yaml::to_string(host)?),
        }
        Ok(())
    }

    fn list_hosts(&self, ctx: &CommandContext, hosts: &HostSet) -> Result<()> {
        let rows: Vec<HostRow<'_>> = hosts.iter().map(HostRow::from).collect();
        match ctx.format() {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&rows)?),
            OutputFormat::Minimal => {
                for row in &rows {
                    println!("{}", row.name);
                }
            }
            OutputFormat::Human => {
                ctx.section(&format!("Hosts ({})", rows.len()));
                for row in &rows {
                    println!(
                        "{:<24} {:<24} {:<14} {}",
                        row.name,
                        format!("{}:{}", row.address, row.port),
                        row.platform.unwrap_or("-"),
                        row.groups.join(",")
                    );
                }
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Runnable for InventoryArgs {
    async fn execute(&self, ctx: &CommandContext) -> Result<i32> {
        let inventory = ctx.load_inventory().await?;

        if let Some(name) = &self.host {
            let host = inventory.get_host(name).map_err(switchpush::Error::from)?;
            self.show_host(ctx, host)?;
            return Ok(0);
        }

        let hosts = inventory
            .select(&self.limit)
            .map_err(switchpush::Error::from)
            .with_context(|| format!("Selecting hosts with '{}'", self.limit))?;
        self.list_hosts(ctx, &hosts)?;
        Ok(0)
    }
}
