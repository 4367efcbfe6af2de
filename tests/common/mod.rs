//! Shared test utilities and fixtures for the switchpush test suite.
//!
//! This module provides:
//! - A recording mock [`Transport`] with per-host failures
//! - Inventory fixtures written to temporary directories
//! - Host set builders
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::collections::HashSet;
use std::fs;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tempfile::TempDir;

use switchpush::inventory::{Host, HostSet, Inventory, InventoryPlugin, SimpleInventory};
use switchpush::transport::{Transport, TransportError, TransportResult};

// ============================================================================
// Mock Transport Implementation
// ============================================================================

/// One recorded `push_config` call.
#[derive(Debug, Clone, PartialEq)]
pub struct PushCall {
    pub host: String,
    pub commands: Vec<String>,
}

/// Transport that records every batch instead of talking to a device.
#[derive(Default)]
pub struct MockTransport {
    calls: RwLock<Vec<PushCall>>,
    failing_hosts: RwLock<HashSet<String>>,
    delay: Option<Duration>,
    call_count: AtomicU32,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every call for `host` with a connection error.
    pub fn fail_host(self, host: &str) -> Self {
        self.failing_hosts.write().insert(host.to_string());
        self
    }

    pub fn calls(&self) -> Vec<PushCall> {
        self.calls.read().clone()
    }

    pub fn calls_for(&self, host: &str) -> Vec<PushCall> {
        self.calls
            .read()
            .iter()
            .filter(|c| c.host == host)
            .cloned()
            .collect()
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Highest number of concurrent calls observed.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn push_config(&self, host: &Host, commands: &[String]) -> TransportResult<String> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let outcome = if self.failing_hosts.read().contains(&host.name) {
            Err(TransportError::ConnectionFailed {
                host: host.name.clone(),
                message: "connection refused".to_string(),
            })
        } else {
            self.calls.write().push(PushCall {
                host: host.name.clone(),
                commands: commands.to_vec(),
            });
            Ok(commands
                .iter()
                .map(|c| format!("{}(config)# {}", host.name, c))
                .collect::<Vec<_>>()
                .join("\n"))
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

// ============================================================================
// Inventory Fixtures
// ============================================================================

pub const HOSTS_YAML: &str = r#"
leaf01:
  hostname: 10.0.0.11
  groups: [cisco_nxos]
leaf02:
  hostname: 10.0.0.12
  groups: [cisco_nxos]
spine01:
  hostname: 10.0.0.1
  groups: [arista_eos]
  data:
    role: spine
"#;

pub const GROUPS_YAML: &str = r#"
cisco_nxos:
  platform: nxos
  groups: [datacenter]
arista_eos:
  platform: eos
  groups: [datacenter]
datacenter:
  data:
    site: ams1
"#;

pub const DEFAULTS_YAML: &str = r#"
username: admin
password: secret
port: 22
data:
  ntp_server: 10.0.0.254
"#;

/// Temporary directory holding hosts/groups/defaults YAML files.
pub struct InventoryFixture {
    pub dir: TempDir,
}

impl InventoryFixture {
    /// The three-host, three-group fixture.
    pub fn standard() -> Self {
        Self::with_files(HOSTS_YAML, Some(GROUPS_YAML), Some(DEFAULTS_YAML))
    }

    pub fn with_files(hosts: &str, groups: Option<&str>, defaults: Option<&str>) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        fs::write(dir.path().join("hosts.yaml"), hosts).expect("write hosts.yaml");
        if let Some(groups) = groups {
            fs::write(dir.path().join("groups.yaml"), groups).expect("write groups.yaml");
        }
        if let Some(defaults) = defaults {
            fs::write(dir.path().join("defaults.yaml"), defaults).expect("write defaults.yaml");
        }
        Self { dir }
    }

    pub fn plugin(&self) -> SimpleInventory {
        SimpleInventory::from_dir(self.dir.path())
    }

    pub async fn load(&self) -> Inventory {
        self.plugin().parse().await.expect("load inventory fixture")
    }
}

// ============================================================================
// Host Set Builders
// ============================================================================

/// Hosts named `names`, with no groups or connection settings.
pub fn host_set(names: &[&str]) -> HostSet {
    names.iter().map(|n| Host::new(*n)).collect()
}

/// `count` hosts named `leaf00`, `leaf01`, ...
pub fn numbered_hosts(count: usize) -> HostSet {
    (0..count).map(|i| Host::new(format!("leaf{:02}", i))).collect()
}

/// Shared mock transport handle.
pub fn mock() -> Arc<MockTransport> {
    Arc::new(MockTransport::new())
}

pub fn commands(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|l| l.to_string()).collect()
}
