//! Error types for switchpush.
//!
//! Per-module errors (`InventoryError`, `TransportError`, `TaskError`) live
//! next to the code that raises them. This module defines the crate-level
//! [`Error`] that the CLI and library entry points return, plus the mapping
//! from errors to process exit codes.

use std::path::PathBuf;
use thiserror::Error;

use crate::inventory::InventoryError;
use crate::transport::TransportError;

/// Result type alias for switchpush operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for switchpush.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Inventory Errors
    // ========================================================================
    /// Inventory could not be resolved. Always fatal: no host is scheduled.
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    // ========================================================================
    // Run Errors
    // ========================================================================
    /// One or more hosts finished a run with a failed top-level result.
    #[error("Run '{run}' failed on {} host(s): {}", failed_hosts.len(), failed_hosts.join(", "))]
    RunFailed {
        /// Run name
        run: String,
        /// Hosts whose top-level result failed, in submission order
        failed_hosts: Vec<String>,
    },

    /// A named push plan does not exist in the configuration.
    #[error("Push plan '{0}' not found in configuration")]
    PlanNotFound(String),

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Transport failure outside of a task boundary (e.g. building a transport).
    #[error(transparent)]
    Transport(#[from] TransportError),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Logging subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    // ========================================================================
    // I/O and Serialization Errors
    // ========================================================================
    /// File I/O error with path context.
    #[error("I/O error on '{path}': {source}")]
    FileIo {
        /// File path
        path: PathBuf,
        /// Source error
        #[source]
        source: std::io::Error,
    },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    /// Creates a file I/O error.
    pub fn file_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::FileIo {
            path: path.into(),
            source,
        }
    }

    /// Returns the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::RunFailed { .. } => 2,
            Error::Transport(_) => 3,
            Error::Config(_) | Error::PlanNotFound(_) | Error::Toml(_) => 4,
            Error::Inventory(_) => 5,
            _ => 1,
        }
    }

    /// Returns true if this error was raised before any host was scheduled.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::RunFailed { .. })
    }
}
