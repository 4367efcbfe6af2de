//! Configuration module for switchpush
//!
//! Handles loading configuration from the first source found:
//! - An explicit `--config` path
//! - Project configuration (./switchpush.toml, ./switchpush.yaml, ./switchpush.yml)
//! - User configuration (~/.config/switchpush/config.toml)
//! - Built-in defaults
//!
//! Environment variables are applied on top, and command-line arguments on
//! top of those.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::executor::EngineConfig;
use crate::inventory::{HostFilter, SimpleInventory};
use crate::logging::{LogLevel, LoggingConfig};
use crate::output::OutputFormat;
use crate::tasks::DEFAULT_NXOS_COMMANDS;
use crate::transport::TransportSettings;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Worker pool and run defaults
    pub runner: RunnerConfig,

    /// Inventory files
    pub inventory: InventoryConfig,

    /// Logging
    pub logging: LoggingConfig,

    /// Result rendering
    pub output: OutputConfig,

    /// Device transport
    pub transport: TransportSettings,

    /// Named configuration batches
    pub push: Vec<PushPlan>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            runner: RunnerConfig::default(),
            inventory: InventoryConfig::default(),
            logging: LoggingConfig::default(),
            output: OutputConfig::default(),
            transport: TransportSettings::default(),
            push: vec![PushPlan::default()],
        }
    }
}

/// Runner settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Maximum number of hosts running at once
    pub num_workers: usize,

    /// Return the batch instead of sending it
    pub dry_run: bool,

    /// Per-host time budget; unset means no limit
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub task_timeout: Option<Duration>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            num_workers: 30,
            dry_run: true,
            task_timeout: None,
        }
    }
}

impl RunnerConfig {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new(self.num_workers)
            .with_dry_run(self.dry_run)
            .with_task_timeout(self.task_timeout)
    }
}

/// Inventory file locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    pub host_file: PathBuf,
    pub group_file: PathBuf,
    pub defaults_file: PathBuf,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self::from_dir("inventory")
    }
}

impl InventoryConfig {
    /// `hosts.yaml`, `groups.yaml` and `defaults.yaml` inside `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            host_file: dir.join("hosts.yaml"),
            group_file: dir.join("groups.yaml"),
            defaults_file: dir.join("defaults.yaml"),
        }
    }

    pub fn plugin(&self) -> SimpleInventory {
        SimpleInventory::new(&self.host_file, &self.group_file, &self.defaults_file)
    }
}

/// Output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Human,
            color: true,
        }
    }
}

/// A named batch of configuration lines and the hosts it targets.
///
/// Target selectors combine by intersection; a plan with none targets
/// every host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushPlan {
    pub name: String,

    /// Hosts in this group, directly or through a parent group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// Hosts with this platform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    /// Host pattern, see [`HostFilter::parse`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,

    /// Lines sent verbatim in configuration mode
    pub commands: Vec<String>,

    /// Persist the running configuration afterwards
    #[serde(default)]
    pub save: bool,
}

impl Default for PushPlan {
    fn default() -> Self {
        Self {
            name: "nxos_ports".to_string(),
            group: Some("cisco_nxos".to_string()),
            platform: None,
            limit: None,
            commands: DEFAULT_NXOS_COMMANDS.iter().map(|c| c.to_string()).collect(),
            save: true,
        }
    }
}

impl PushPlan {
    /// Host filter selecting this plan's targets.
    pub fn filter(&self) -> crate::error::Result<HostFilter> {
        let mut filter = HostFilter::All;
        if let Some(group) = &self.group {
            filter = filter & HostFilter::group_tree(group.as_str());
        }
        if let Some(platform) = &self.platform {
            filter = filter & HostFilter::platform(platform.as_str());
        }
        if let Some(limit) = &self.limit {
            filter = filter & HostFilter::parse(limit)?;
        }
        Ok(filter)
    }
}

impl Config {
    /// Load configuration from the first existing source, then apply
    /// environment overrides.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file not found: {}", path.display());
                }
                Self::from_file(path)?
            }
            None => match Self::get_config_paths().into_iter().find(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Config::default(),
            },
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Candidate config paths, in lookup order.
    fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from("switchpush.toml"),
            PathBuf::from("switchpush.yaml"),
            PathBuf::from("switchpush.yml"),
        ];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("switchpush").join("config.toml"));
        }

        paths
    }

    /// Parse a config file; the format is chosen by extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let config = match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            _ => toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
        };

        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // SWITCHPUSH_NUM_WORKERS
        if let Ok(workers) = std::env::var("SWITCHPUSH_NUM_WORKERS") {
            if let Ok(n) = workers.parse() {
                self.runner.num_workers = n;
            }
        }

        // SWITCHPUSH_DRY_RUN
        if let Ok(value) = std::env::var("SWITCHPUSH_DRY_RUN") {
            if let Some(flag) = parse_flag(&value) {
                self.runner.dry_run = flag;
            }
        }

        // SWITCHPUSH_INVENTORY
        if let Ok(dir) = std::env::var("SWITCHPUSH_INVENTORY") {
            self.inventory = InventoryConfig::from_dir(dir);
        }

        // SWITCHPUSH_LOG_FILE
        if let Ok(path) = std::env::var("SWITCHPUSH_LOG_FILE") {
            self.logging.log_file = Some(PathBuf::from(path));
        }

        // SWITCHPUSH_LOG_LEVEL
        if let Ok(level) = std::env::var("SWITCHPUSH_LOG_LEVEL") {
            if let Ok(level) = level.parse::<LogLevel>() {
                self.logging.level = level;
            }
        }

        // NO_COLOR
        if std::env::var_os("NO_COLOR").is_some() {
            self.output.color = false;
            self.logging.ansi = false;
        }
    }

    /// Look up a push plan by name, or the first plan when `name` is `None`.
    pub fn plan(&self, name: Option<&str>) -> crate::error::Result<&PushPlan> {
        match name {
            Some(name) => self
                .push
                .iter()
                .find(|p| p.name == name)
                .ok_or_else(|| crate::error::Error::PlanNotFound(name.to_string())),
            None => self
                .push
                .first()
                .ok_or_else(|| crate::error::Error::PlanNotFound("<default>".to_string())),
        }
    }

    /// Check settings that deserialize fine but cannot be used.
    pub fn validate(&self) -> Result<()> {
        if self.runner.num_workers == 0 {
            bail!("runner.num_workers must be at least 1");
        }

        let mut seen = std::collections::HashSet::new();
        for plan in &self.push {
            if !seen.insert(plan.name.as_str()) {
                bail!("Duplicate push plan '{}'", plan.name);
            }
            if plan.commands.is_empty() {
                bail!("Push plan '{}' has no commands", plan.name);
            }
            plan.filter()
                .with_context(|| format!("Push plan '{}' has an invalid target", plan.name))?;
        }

        crate::transport::RejectionDetector::new(&self.transport.error_patterns)
            .context("Invalid transport.error_patterns")?;

        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
