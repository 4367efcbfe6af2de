//! Task execution engine for switchpush
//!
//! This module runs one top-level task against every host of a host set:
//! - Bounded worker pool: at most `num_workers` hosts in flight
//! - Hosts start in submission order
//! - One host's failure, panic or timeout never affects another host
//! - Subtasks run sequentially inside their host's execution unit
//! - Results are collected into a single [`AggregatedRun`]

pub mod result;
pub mod task;

pub use result::{AggregatedRun, HostStats, RunSummary, TaskResult};
pub use task::{task_fn, FnTask, RunParams, Task, TaskContext, TaskError, TaskOutcome, TaskOutput};

use chrono::Utc;
use futures::future::join_all;
use indexmap::IndexMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use crate::inventory::HostSet;

/// Default size of the worker pool
pub const DEFAULT_NUM_WORKERS: usize = 20;

/// Configuration for the engine
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Maximum number of hosts executing at once
    pub num_workers: usize,
    /// Default dry-run flag for [`Engine::run`]
    pub dry_run: bool,
    /// Per-host budget for the top-level task, subtasks included
    pub task_timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            num_workers: DEFAULT_NUM_WORKERS,
            dry_run: false,
            task_timeout: None,
        }
    }
}

impl EngineConfig {
    pub fn new(num_workers: usize) -> Self {
        Self {
            num_workers,
            ..Default::default()
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_task_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.task_timeout = timeout;
        self
    }
}

/// Runs tasks across hosts with bounded concurrency.
pub struct Engine {
    config: EngineConfig,
    semaphore: Arc<Semaphore>,
}

impl Engine {
    /// Create an engine. A worker count of zero is raised to one.
    pub fn new(mut config: EngineConfig) -> Self {
        if config.num_workers == 0 {
            warn!("num_workers must be at least 1, using 1");
            config.num_workers = 1;
        }
        let workers = config.num_workers;
        Self {
            config,
            semaphore: Arc::new(Semaphore::new(workers)),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn num_workers(&self) -> usize {
        self.config.num_workers
    }

    /// Run `task` once per host using the engine's default dry-run flag.
    pub async fn run(&self, name: &str, task: Arc<dyn Task>, hosts: &HostSet) -> AggregatedRun {
        self.run_with(name, task, hosts, RunParams::new(self.config.dry_run))
            .await
    }

    /// Run `task` once per host with explicit run parameters.
    ///
    /// Returns after every host has finished. Each host gets exactly one
    /// top-level result named `name`, keyed by host name in the order the
    /// hosts were given. An empty host set yields an empty run.
    #[instrument(skip(self, task, hosts, params), fields(run = %name, hosts = hosts.len()))]
    pub async fn run_with(
        &self,
        name: &str,
        task: Arc<dyn Task>,
        hosts: &HostSet,
        params: RunParams,
    ) -> AggregatedRun {
        let started_at = Utc::now();
        let start = Instant::now();
        let dry_run = params.dry_run;
        let params = Arc::new(params);
        let run_name: Arc<str> = Arc::from(name);

        info!(
            workers = self.config.num_workers,
            dry_run, "Starting run on {} hosts", hosts.len()
        );

        let mut handles = Vec::with_capacity(hosts.len());
        for host in hosts {
            // Permits are taken here, in host order, so hosts start FIFO.
            let permit = Arc::clone(&self.semaphore).acquire_owned().await.ok();
            let task = Arc::clone(&task);
            let ctx = TaskContext::new(Arc::clone(host), Arc::clone(&run_name), Arc::clone(&params));
            let task_name = name.to_string();
            let timeout = self.config.task_timeout;

            debug!(host = %host.name, "Dispatching host");
            let handle = tokio::spawn(async move {
                let _permit = permit;
                task::invoke(task.as_ref(), task_name, ctx, timeout).await
            });
            handles.push((host.name.clone(), handle));
        }

        let (names, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
        let joined = join_all(handles).await;

        let mut results = IndexMap::with_capacity(names.len());
        for (host, joined) in names.into_iter().zip(joined) {
            let result = joined.unwrap_or_else(|e| {
                warn!(host = %host, error = %e, "Host execution unit aborted");
                TaskResult::failure(
                    host.clone(),
                    name,
                    TaskError::Aborted(e.to_string()),
                    Vec::new(),
                )
            });
            results.insert(host, result);
        }

        let run = AggregatedRun::new(name, dry_run, started_at, start.elapsed(), results);
        let summary = run.summary();
        info!(
            ok = summary.ok,
            changed = summary.changed,
            failed = summary.failed,
            elapsed_ms = run.elapsed().as_millis() as u64,
            "Run completed"
        );
        run
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
