//! Host definition for the switchpush inventory.
//!
//! A [`HostDef`] is what `hosts.yaml` declares. A [`Host`] is the resolved,
//! read-only record the engine hands to tasks: connection attributes and
//! variables have already been merged from groups and defaults.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default SSH port for management connections.
pub const DEFAULT_PORT: u16 = 22;

/// Connection attributes that can be declared on a host, a group or the
/// defaults record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionParams {
    /// Management address (IP or DNS name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    /// Management port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Login user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Login password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Private key used for public key authentication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_file: Option<String>,

    /// Platform/vendor tag (e.g. `nxos`, `ios`, `eos`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

impl ConnectionParams {
    /// Fill every unset attribute from `other`, keeping values already set.
    pub fn fill_from(&mut self, other: &ConnectionParams) {
        fn fill<T: Clone>(slot: &mut Option<T>, from: &Option<T>) {
            if slot.is_none() {
                slot.clone_from(from);
            }
        }

        fill(&mut self.hostname, &other.hostname);
        fill(&mut self.port, &other.port);
        fill(&mut self.username, &other.username);
        fill(&mut self.password, &other.password);
        fill(&mut self.private_key_file, &other.private_key_file);
        fill(&mut self.platform, &other.platform);
    }

    /// True when every attribute is set.
    pub fn is_complete(&self) -> bool {
        self.hostname.is_some()
            && self.port.is_some()
            && self.username.is_some()
            && self.password.is_some()
            && self.private_key_file.is_some()
            && self.platform.is_some()
    }
}

/// A host as declared in `hosts.yaml`, before inheritance is applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostDef {
    /// Host name; filled from the map key when loading from YAML
    #[serde(skip)]
    pub name: String,

    /// Connection attributes set directly on the host
    #[serde(flatten)]
    pub connection: ConnectionParams,

    /// Direct group memberships, in priority order
    #[serde(default)]
    pub groups: Vec<String>,

    /// Host-level variables
    #[serde(default)]
    pub data: IndexMap<String, serde_yaml::Value>,
}

impl HostDef {
    /// Create a bare host definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a group membership.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    /// Set the management address.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.connection.hostname = Some(hostname.into());
        self
    }

    /// Set the platform tag.
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.connection.platform = Some(platform.into());
        self
    }

    /// Set a host variable.
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<serde_yaml::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// A resolved, read-only inventory host.
///
/// Hosts are shared between concurrently running tasks as `Arc<Host>` and
/// are never mutated after the inventory is built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Host {
    /// Unique host name
    pub name: String,

    /// Direct group memberships, in declaration order
    pub groups: Vec<String>,

    /// Every group the host inherits from: direct groups in order, each
    /// followed depth-first by its parents
    pub lineage: Vec<String>,

    /// Resolved connection attributes
    pub connection: ConnectionParams,

    /// Resolved variables (host over groups over defaults)
    pub vars: IndexMap<String, serde_yaml::Value>,
}

impl Host {
    /// Build a host with no groups, no variables and default connection.
    ///
    /// Mostly useful in tests; real hosts come from [`crate::inventory::Inventory`].
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: Vec::new(),
            lineage: Vec::new(),
            connection: ConnectionParams::default(),
            vars: IndexMap::new(),
        }
    }

    /// Address to connect to; falls back to the host name.
    pub fn address(&self) -> &str {
        self.connection.hostname.as_deref().unwrap_or(&self.name)
    }

    /// Port to connect to.
    pub fn port(&self) -> u16 {
        self.connection.port.unwrap_or(DEFAULT_PORT)
    }

    /// Login user, if any.
    pub fn username(&self) -> Option<&str> {
        self.connection.username.as_deref()
    }

    /// Platform tag, if any.
    pub fn platform(&self) -> Option<&str> {
        self.connection.platform.as_deref()
    }

    /// True if `group` is one of the host's direct groups.
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    /// True if the host belongs to `group` directly or through a parent.
    pub fn belongs_to(&self, group: &str) -> bool {
        self.lineage.iter().any(|g| g == group)
    }

    /// Look up a resolved variable.
    pub fn var(&self, key: &str) -> Option<&serde_yaml::Value> {
        self.vars.get(key)
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
