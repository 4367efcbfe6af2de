//! Group and defaults records for the switchpush inventory.
//!
//! Groups classify hosts and carry inherited connection attributes and
//! variables. They are never executed.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::host::ConnectionParams;

/// A named group as declared in `groups.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Group name; filled from the map key when loading from YAML
    #[serde(skip)]
    pub name: String,

    /// Parent groups, in priority order
    #[serde(default)]
    pub groups: Vec<String>,

    /// Connection attributes inherited by member hosts
    #[serde(flatten)]
    pub connection: ConnectionParams,

    /// Variables inherited by member hosts
    #[serde(default)]
    pub data: IndexMap<String, serde_yaml::Value>,
}

impl Group {
    /// Create an empty group.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a parent group.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.groups.push(parent.into());
        self
    }

    /// Set the platform tag inherited by member hosts.
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.connection.platform = Some(platform.into());
        self
    }

    /// Set a group variable.
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<serde_yaml::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// Global fallback attributes from `defaults.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Defaults {
    /// Connection attributes applied last
    #[serde(flatten)]
    pub connection: ConnectionParams,

    /// Variables applied last
    #[serde(default)]
    pub data: IndexMap<String, serde_yaml::Value>,
}

impl Defaults {
    /// Set a default variable.
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<serde_yaml::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}
