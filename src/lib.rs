//! # switchpush - Concurrent configuration push for network switches
//!
//! switchpush applies the same configuration batch to many network devices
//! at once, talking to each device's native CLI over SSH. It reads a
//! three-file inventory (hosts, groups, defaults), selects hosts by group or
//! pattern, and runs a composable task against every selected host on a
//! bounded worker pool. Each host produces a tree of results; one host's
//! failure never stops another.
//!
//! ## Core Concepts
//!
//! - **Inventory**: Hosts and groups with inherited connection settings
//! - **Filters**: Composable host predicates and host patterns
//! - **Tasks**: Named units of work run once per host, able to run subtasks
//! - **Results**: Per-host result trees collected into one aggregated run
//! - **Transport**: Sends ordered configuration lines to a device
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        CLI Interface                         │
//! │                  (clap-based command parsing)                │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//!          ┌────────────────────┼─────────────────────┐
//!          ▼                    ▼                     ▼
//! ┌─────────────────┐  ┌─────────────────┐  ┌──────────────────┐
//! │    Inventory    │  │     Engine      │  │     Reporter     │
//! │ (hosts, groups, │  │ (bounded pool,  │  │ (result trees,   │
//! │    filters)     │  │  result trees)  │  │  recap)          │
//! └─────────────────┘  └─────────────────┘  └──────────────────┘
//!                               │
//!                               ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 Transport (SSH interactive CLI)              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use switchpush::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let inventory = SimpleInventory::from_dir("inventory").parse().await?;
//!     let hosts = inventory.filter(&HostFilter::group_tree("cisco_nxos"));
//!
//!     let transport = Arc::new(SshTransport::new(TransportSettings::default())?);
//!     let task = Arc::new(InterfacePush::new(transport, vec!["interface Ethernet1/13".into()]));
//!
//!     let run = Engine::new(EngineConfig::new(30)).run("push", task, &hosts).await;
//!     ResultPrinter::default().print(&run)?;
//!     run.ensure_success()
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

// Re-export commonly used items in prelude
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    // Error handling
    pub use crate::error::{Error, Result};

    // Inventory
    pub use crate::inventory::{
        Group, Host, HostFilter, HostSet, Inventory, InventoryPlugin, SimpleInventory,
    };

    // Execution engine
    pub use crate::executor::{
        task_fn, AggregatedRun, Engine, EngineConfig, RunParams, Task, TaskContext, TaskError,
        TaskOutcome, TaskOutput, TaskResult,
    };

    // Transport
    #[cfg(feature = "russh")]
    pub use crate::transport::SshTransport;
    pub use crate::transport::{Platform, Transport, TransportError, TransportSettings};

    // Business tasks
    pub use crate::tasks::{InterfacePush, LogGreeting, PushConfig};

    // Reporting
    pub use crate::output::{OutputFormat, ResultPrinter};
}

// ============================================================================
// Core Modules
// ============================================================================

/// Error types and result aliases for switchpush operations.
pub mod error;

/// Hosts, groups, defaults and host selection.
pub mod inventory;

/// Bounded-concurrency task engine and result trees.
pub mod executor;

/// Device transports and CLI dialects.
pub mod transport;

/// Built-in tasks for pushing interface configuration.
pub mod tasks;

// ============================================================================
// Ambient
// ============================================================================

/// Layered configuration loading.
pub mod config;

/// tracing subscriber setup.
pub mod logging;

/// Result rendering and exit status.
pub mod output;

pub use error::{Error, Result};
