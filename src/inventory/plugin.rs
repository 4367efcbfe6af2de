//! Inventory sources.
//!
//! An [`InventoryPlugin`] turns some external description of the fleet into
//! a resolved [`Inventory`]. [`SimpleInventory`] reads the classic three
//! YAML files: `hosts.yaml`, `groups.yaml` and `defaults.yaml`.

use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{Inventory, InventoryError, InventoryResult};

/// A source of inventory data.
#[async_trait]
pub trait InventoryPlugin: Send + Sync + fmt::Debug {
    /// Plugin name, used in logs.
    fn name(&self) -> &str;

    /// Load and resolve the inventory.
    ///
    /// Must fail as a whole: a plugin never returns a partial inventory.
    async fn parse(&self) -> InventoryResult<Inventory>;
}

/// File-backed inventory made of a host file plus optional group and
/// defaults files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleInventory {
    host_file: PathBuf,
    group_file: PathBuf,
    defaults_file: PathBuf,
}

impl SimpleInventory {
    /// Use explicit file paths.
    pub fn new(
        host_file: impl Into<PathBuf>,
        group_file: impl Into<PathBuf>,
        defaults_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            host_file: host_file.into(),
            group_file: group_file.into(),
            defaults_file: defaults_file.into(),
        }
    }

    /// Use `hosts.yaml`, `groups.yaml` and `defaults.yaml` inside `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(
            dir.join("hosts.yaml"),
            dir.join("groups.yaml"),
            dir.join("defaults.yaml"),
        )
    }

    pub fn host_file(&self) -> &Path {
        &self.host_file
    }

    /// Read a required file.
    async fn read(path: &Path) -> InventoryResult<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|source| InventoryError::Io {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Read a file that may legitimately be absent.
    async fn read_optional(path: &Path) -> InventoryResult<Option<String>> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Optional inventory file not found, using empty");
                Ok(None)
            }
            Err(source) => Err(InventoryError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

#[async_trait]
impl InventoryPlugin for SimpleInventory {
    fn name(&self) -> &str {
        "simple"
    }

    async fn parse(&self) -> InventoryResult<Inventory> {
        let hosts = Self::read(&self.host_file).await?;
        let groups = Self::read_optional(&self.group_file).await?;
        let defaults = Self::read_optional(&self.defaults_file).await?;

        let inventory = Inventory::from_yaml_files(
            (hosts.as_str(), self.host_file.as_path()),
            groups.as_deref().map(|text| (text, self.group_file.as_path())),
            defaults.as_deref().map(|text| (text, self.defaults_file.as_path())),
        )?;

        info!(
            plugin = self.name(),
            hosts = inventory.len(),
            source = %self.host_file.display(),
            "Loaded inventory"
        );
        Ok(inventory)
    }
}
