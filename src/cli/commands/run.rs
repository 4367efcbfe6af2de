//! Run command - push a configuration plan
//!
//! This module implements the `run` subcommand.

use super::{CommandContext, Runnable};
use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use switchpush::executor::{Engine, RunParams};
use switchpush::inventory::HostFilter;
use switchpush::output::exit_status;
use switchpush::tasks::InterfacePush;
use switchpush::transport::SshTransport;

/// Arguments for the run command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Push plan to run (defaults to the first configured plan)
    #[arg(long)]
    pub plan: Option<String>,

    /// Only hosts in this group, directly or through a parent group
    #[arg(short = 'g', long)]
    pub group: Option<String>,

    /// Limit to hosts matching this pattern
    #[arg(short = 'l', long)]
    pub limit: Option<String>,

    /// Number of hosts to run at once
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Return the batch without sending it (`--dry-run=false` to send)
    #[arg(long, num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    pub dry_run: Option<bool>,

    /// Per-host time budget, e.g. `90s` or `5m`
    #[arg(long, value_parser = humantime_serde::re::humantime::parse_duration)]
    pub timeout: Option<Duration>,
}

impl RunArgs {
    fn host_filter(&self, plan_filter: HostFilter) -> switchpush::Result<HostFilter> {
        let mut filter = plan_filter;
        if let Some(group) = &self.group {
            filter = filter & HostFilter::group_tree(group.as_str());
        }
        if let Some(limit) = &self.limit {
            filter = filter & HostFilter::parse(limit)?;
        }
        Ok(filter)
    }
}

#[async_trait::async_trait]
impl Runnable for RunArgs {
    async fn execute(&self, ctx: &CommandContext) -> Result<i32> {
        let config = &ctx.config;
        let plan = config.plan(self.plan.as_deref())?;
        let filter = self.host_filter(plan.filter()?)?;

        let inventory = ctx.load_inventory().await?;
        let hosts = inventory.filter(&filter);
        info!(plan = %plan.name, filter = %filter, hosts = hosts.len(), "Selected hosts");
        if hosts.is_empty() {
            ctx.warning(&format!("No hosts matched {}", filter));
        }

        let mut settings = config.transport.clone();
        settings.save_config = settings.save_config || plan.save;
        let transport = Arc::new(SshTransport::new(settings)?);
        let task = Arc::new(InterfacePush::new(transport, plan.commands.clone()));

        let mut engine_config = config.runner.engine_config();
        if let Some(workers) = self.workers {
            engine_config.num_workers = workers;
        }
        if let Some(timeout) = self.timeout {
            engine_config.task_timeout = Some(timeout);
        }
        let dry_run = self.dry_run.unwrap_or(engine_config.dry_run);
        if !dry_run {
            warn!(plan = %plan.name, "Dry run disabled, configuration will be sent");
        }

        let engine = Engine::new(engine_config);
        let params = RunParams::new(dry_run).with_var("plan", plan.name.as_str());
        let run = engine
            .run_with(&format!("Push plan {}", plan.name), task, &hosts, params)
            .await;

        ctx.printer.print(&run)?;
        Ok(exit_status(&run))
    }
}
