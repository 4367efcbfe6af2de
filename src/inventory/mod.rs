//! Inventory management for switchpush.
//!
//! This module provides:
//! - Host, group and defaults records ([`Host`], [`Group`], [`Defaults`])
//! - Inheritance resolution into flat, read-only hosts
//! - Host selection with composable filters and host patterns ([`filter`])
//! - A plugin seam for inventory sources ([`plugin`])
//!
//! Inheritance is resolved once, when the [`Inventory`] is built. For every
//! connection attribute and variable the first value found wins, looking at
//! the host, then each of its groups in listed order (depth-first through
//! parents), then the defaults.

pub mod filter;
pub mod group;
pub mod host;
pub mod plugin;

pub use filter::{HostFilter, HostSet};
pub use group::{Defaults, Group};
pub use host::{ConnectionParams, Host, HostDef};
pub use plugin::{InventoryPlugin, SimpleInventory};

use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while resolving an inventory.
///
/// All of them are fatal: no partial inventory is ever returned.
#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("Failed to read inventory file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed inventory file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{referrer} references undefined group '{group}'")]
    UndefinedGroup { referrer: String, group: String },

    #[error("Duplicate host: {0}")]
    DuplicateHost(String),

    #[error("Circular group hierarchy: {}", .0.join(" -> "))]
    CircularGroups(Vec<String>),

    #[error("Host not found: {0}")]
    HostNotFound(String),

    #[error("Invalid host pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// Result type for inventory operations
pub type InventoryResult<T> = Result<T, InventoryError>;

/// A resolved inventory.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    hosts: IndexMap<String, Arc<Host>>,
    groups: IndexMap<String, Group>,
    defaults: Defaults,
}

impl Inventory {
    /// Build an inventory from raw definitions, validating group references
    /// and resolving inheritance.
    pub fn from_parts(
        hosts: Vec<HostDef>,
        groups: Vec<Group>,
        defaults: Defaults,
    ) -> InventoryResult<Self> {
        let mut group_map: IndexMap<String, Group> = IndexMap::with_capacity(groups.len());
        for group in groups {
            group_map.insert(group.name.clone(), group);
        }

        validate_groups(&group_map)?;

        let mut resolved: IndexMap<String, Arc<Host>> = IndexMap::with_capacity(hosts.len());
        for def in hosts {
            if resolved.contains_key(&def.name) {
                return Err(InventoryError::DuplicateHost(def.name));
            }
            for group in &def.groups {
                if !group_map.contains_key(group) {
                    return Err(InventoryError::UndefinedGroup {
                        referrer: format!("host '{}'", def.name),
                        group: group.clone(),
                    });
                }
            }

            let host = resolve_host(def, &group_map, &defaults);
            resolved.insert(host.name.clone(), Arc::new(host));
        }

        debug!(
            hosts = resolved.len(),
            groups = group_map.len(),
            "Resolved inventory"
        );

        Ok(Self {
            hosts: resolved,
            groups: group_map,
            defaults,
        })
    }

    /// Build an inventory from the YAML text of the three inventory files.
    ///
    /// Each document is paired with the path it came from, used to label
    /// parse errors. Group and defaults documents are optional.
    pub fn from_yaml_files(
        hosts: (&str, &Path),
        groups: Option<(&str, &Path)>,
        defaults: Option<(&str, &Path)>,
    ) -> InventoryResult<Self> {
        let host_defs: Vec<HostDef> = parse_named_map(hosts.0, hosts.1)?
            .into_iter()
            .map(|(name, def): (String, Option<HostDef>)| HostDef {
                name,
                ..def.unwrap_or_default()
            })
            .collect();

        let group_defs: Vec<Group> = match groups {
            Some((text, path)) => parse_named_map(text, path)?
                .into_iter()
                .map(|(name, group): (String, Option<Group>)| Group {
                    name,
                    ..group.unwrap_or_default()
                })
                .collect(),
            None => Vec::new(),
        };

        let defaults = match defaults {
            Some((text, path)) if !text.trim().is_empty() => {
                serde_yaml::from_str::<Option<Defaults>>(text)
                    .map_err(|source| InventoryError::Parse {
                        path: path.to_path_buf(),
                        source,
                    })?
                    .unwrap_or_default()
            }
            _ => Defaults::default(),
        };

        Self::from_parts(host_defs, group_defs, defaults)
    }

    /// All hosts, in declaration order.
    pub fn hosts(&self) -> HostSet {
        self.hosts.values().cloned().collect()
    }

    /// Look up a host by name.
    pub fn host(&self, name: &str) -> Option<&Arc<Host>> {
        self.hosts.get(name)
    }

    /// Look up a host by name, failing if it does not exist.
    pub fn get_host(&self, name: &str) -> InventoryResult<&Arc<Host>> {
        self.hosts
            .get(name)
            .ok_or_else(|| InventoryError::HostNotFound(name.to_string()))
    }

    /// Look up a group by name.
    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    /// All groups, in declaration order.
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    /// The defaults record.
    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    /// Number of hosts.
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// True if there are no hosts.
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Hosts matching `filter`, in declaration order.
    pub fn filter(&self, filter: &HostFilter) -> HostSet {
        self.hosts().filter_by(filter)
    }

    /// Hosts matching a host pattern (see [`HostFilter::parse`]).
    ///
    /// Unlike [`Inventory::filter`], a pattern that selects nothing is an
    /// error, since it almost always means a typo on the command line.
    pub fn select(&self, pattern: &str) -> InventoryResult<HostSet> {
        let filter = HostFilter::parse(pattern)?;
        let selected = self.filter(&filter);
        if selected.is_empty() && !self.is_empty() {
            return Err(InventoryError::InvalidPattern {
                pattern: pattern.to_string(),
                message: "no hosts matched".to_string(),
            });
        }
        Ok(selected)
    }
}

/// Parse a YAML mapping of name to optional record, tolerating an empty file.
fn parse_named_map<T>(text: &str, path: &Path) -> InventoryResult<IndexMap<String, Option<T>>>
where
    T: serde::de::DeserializeOwned,
{
    if text.trim().is_empty() {
        return Ok(IndexMap::new());
    }
    serde_yaml::from_str::<Option<IndexMap<String, Option<T>>>>(text)
        .map(Option::unwrap_or_default)
        .map_err(|source| InventoryError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// Check that every parent group exists and the hierarchy has no cycles.
fn validate_groups(groups: &IndexMap<String, Group>) -> InventoryResult<()> {
    for group in groups.values() {
        for parent in &group.groups {
            if !groups.contains_key(parent) {
                return Err(InventoryError::UndefinedGroup {
                    referrer: format!("group '{}'", group.name),
                    group: parent.clone(),
                });
            }
        }
    }

    fn visit(
        name: &str,
        groups: &IndexMap<String, Group>,
        stack: &mut Vec<String>,
        done: &mut HashSet<String>,
    ) -> InventoryResult<()> {
        if done.contains(name) {
            return Ok(());
        }
        if let Some(pos) = stack.iter().position(|g| g == name) {
            let mut cycle = stack[pos..].to_vec();
            cycle.push(name.to_string());
            return Err(InventoryError::CircularGroups(cycle));
        }

        stack.push(name.to_string());
        if let Some(group) = groups.get(name) {
            for parent in &group.groups {
                visit(parent, groups, stack, done)?;
            }
        }
        stack.pop();
        done.insert(name.to_string());
        Ok(())
    }

    let mut done = HashSet::new();
    for name in groups.keys() {
        visit(name, groups, &mut Vec::new(), &mut done)?;
    }
    Ok(())
}

/// Direct groups in order, each followed depth-first by its parents.
fn lineage(direct: &[String], groups: &IndexMap<String, Group>) -> Vec<String> {
    fn walk(name: &str, groups: &IndexMap<String, Group>, out: &mut Vec<String>) {
        if out.iter().any(|g| g == name) {
            return;
        }
        out.push(name.to_string());
        if let Some(group) = groups.get(name) {
            for parent in &group.groups {
                walk(parent, groups, out);
            }
        }
    }

    let mut out = Vec::new();
    for name in direct {
        walk(name, groups, &mut out);
    }
    out
}

fn resolve_host(def: HostDef, groups: &IndexMap<String, Group>, defaults: &Defaults) -> Host {
    let lineage = lineage(&def.groups, groups);

    let mut connection = def.connection;
    let mut vars = def.data;

    for group in lineage.iter().filter_map(|name| groups.get(name)) {
        connection.fill_from(&group.connection);
        for (key, value) in &group.data {
            vars.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }

    connection.fill_from(&defaults.connection);
    for (key, value) in &defaults.data {
        vars.entry(key.clone()).or_insert_with(|| value.clone());
    }

    Host {
        name: def.name,
        groups: def.groups,
        lineage,
        connection,
        vars,
    }
}
