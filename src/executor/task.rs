//! Task definitions for the engine.
//!
//! A [`Task`] is a named unit of work run once per host. Its body receives a
//! [`TaskContext`] exposing the host, the run parameters, and
//! [`TaskContext::run_subtask`] for composing further tasks against the same
//! host. Each invocation boundary turns the body's outcome, including a
//! panic, into a [`TaskResult`].

use async_trait::async_trait;
use futures::FutureExt;
use humantime_serde::re::humantime::format_duration;
use indexmap::IndexMap;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use super::result::TaskResult;
use crate::inventory::Host;
use crate::transport::TransportError;

/// Errors a task body can end with.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaskError {
    /// The transport could not deliver the batch
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The body decided it failed
    #[error("{0}")]
    Failed(String),

    /// The body failed because a subtask it depends on failed
    #[error("Subtask '{name}' failed")]
    Subtask { name: String },

    /// The body panicked; the payload message is kept
    #[error("Task panicked: {0}")]
    Panicked(String),

    /// The per-host time budget elapsed
    #[error("Task timed out after {}", format_duration(*.limit))]
    Timeout { limit: Duration },

    /// The host's execution unit was torn down before finishing
    #[error("Host execution aborted: {0}")]
    Aborted(String),
}

impl TaskError {
    /// Create a task logic failure.
    pub fn failed(message: impl Into<String>) -> Self {
        TaskError::Failed(message.into())
    }

    /// Error category, as shown in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            TaskError::Transport(_) => "TransportError",
            TaskError::Failed(_) | TaskError::Subtask { .. } => "TaskLogicError",
            TaskError::Panicked(_) => "TaskPanic",
            TaskError::Timeout { .. } => "TaskTimeout",
            TaskError::Aborted(_) => "TaskAborted",
        }
    }
}

impl Serialize for TaskError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TaskError", 2)?;
        state.serialize_field("kind", self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// What a task body returns when it succeeds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskOutput {
    pub value: JsonValue,
    pub changed: bool,
}

impl TaskOutput {
    /// Success with no payload and no change.
    pub fn ok() -> Self {
        Self::default()
    }

    /// Success that changed something on the device.
    pub fn changed() -> Self {
        Self {
            changed: true,
            ..Default::default()
        }
    }

    /// Success carrying a text payload.
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            value: JsonValue::String(text.into()),
            changed: false,
        }
    }

    pub fn with_value(mut self, value: impl Into<JsonValue>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_changed(mut self, changed: bool) -> Self {
        self.changed = changed;
        self
    }
}

/// Outcome of a task body.
pub type TaskOutcome = Result<TaskOutput, TaskError>;

/// A named unit of work executed once per host.
#[async_trait]
pub trait Task: Send + Sync {
    /// Default name used when the task is run with [`TaskContext::run_task`].
    fn name(&self) -> &str;

    /// Task body.
    async fn run(&self, ctx: &mut TaskContext) -> TaskOutcome;
}

/// Parameters shared by every host in a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunParams {
    /// Tasks must not call mutating transport operations when set
    pub dry_run: bool,
    /// Free-form run-scoped parameters
    pub vars: IndexMap<String, JsonValue>,
}

impl RunParams {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            vars: IndexMap::new(),
        }
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

/// Per-host, per-invocation execution context.
///
/// Owned by a single host's execution unit; children are appended without
/// any cross-host synchronization.
#[derive(Debug)]
pub struct TaskContext {
    host: Arc<Host>,
    run_name: Arc<str>,
    params: Arc<RunParams>,
    children: Vec<TaskResult>,
    depth: usize,
}

impl TaskContext {
    /// Create a top-level context for `host`.
    pub fn new(host: Arc<Host>, run_name: impl Into<Arc<str>>, params: Arc<RunParams>) -> Self {
        Self {
            host,
            run_name: run_name.into(),
            params,
            children: Vec::new(),
            depth: 0,
        }
    }

    /// The host this task runs against.
    pub fn host(&self) -> &Arc<Host> {
        &self.host
    }

    /// Name of the enclosing run.
    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    pub fn params(&self) -> &RunParams {
        &self.params
    }

    /// Run-scoped parameter by key.
    pub fn param(&self, key: &str) -> Option<&JsonValue> {
        self.params.vars.get(key)
    }

    /// Whether the run is a dry run.
    pub fn dry_run(&self) -> bool {
        self.params.dry_run
    }

    /// Nesting depth; top-level tasks are at 0.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Results of subtasks run so far, in invocation order.
    pub fn children(&self) -> &[TaskResult] {
        &self.children
    }

    /// Run `task` as a named subtask against the same host.
    ///
    /// The subtask runs to completion before this returns. Its result is
    /// appended to this context's children and handed back so the caller
    /// can decide its own outcome; a failed subtask does not fail the
    /// caller by itself.
    pub async fn run_subtask<T>(&mut self, name: impl Into<String>, task: &T) -> &TaskResult
    where
        T: Task + ?Sized,
    {
        let child = TaskContext {
            host: Arc::clone(&self.host),
            run_name: Arc::clone(&self.run_name),
            params: Arc::clone(&self.params),
            children: Vec::new(),
            depth: self.depth + 1,
        };

        let result = invoke(task, name.into(), child, None).await;
        let index = self.children.len();
        self.children.push(result);
        &self.children[index]
    }

    /// Run `task` as a subtask under its own name.
    pub async fn run_task<T>(&mut self, task: &T) -> &TaskResult
    where
        T: Task + ?Sized,
    {
        let name = task.name().to_string();
        self.run_subtask(name, task).await
    }
}

/// Run one task invocation and turn its outcome into a result.
///
/// Errors, panics and an elapsed `timeout` all produce a failed result.
/// Subtask results recorded before the failure are kept.
pub(crate) async fn invoke<T>(
    task: &T,
    name: String,
    mut ctx: TaskContext,
    timeout: Option<Duration>,
) -> TaskResult
where
    T: Task + ?Sized,
{
    let host = ctx.host.name.clone();
    debug!(host = %host, task = %name, depth = ctx.depth, "Running task");

    let outcome = {
        let guarded = AssertUnwindSafe(task.run(&mut ctx)).catch_unwind();
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, guarded).await {
                Ok(caught) => caught,
                Err(_) => Ok(Err(TaskError::Timeout { limit })),
            },
            None => guarded.await,
        }
    };

    let outcome = outcome.unwrap_or_else(|payload| Err(TaskError::Panicked(panic_message(&*payload))));

    match outcome {
        Ok(output) => TaskResult::success(host, name, output, ctx.children),
        Err(error) => {
            warn!(host = %host, task = %name, error = %error, "Task failed");
            TaskResult::failure(host, name, error, ctx.children)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Adapts a synchronous closure into a [`Task`].
pub struct FnTask<F> {
    name: String,
    f: F,
}

impl<F> FnTask<F>
where
    F: Fn(&TaskContext) -> TaskOutcome + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

#[async_trait]
impl<F> Task for FnTask<F>
where
    F: Fn(&TaskContext) -> TaskOutcome + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: &mut TaskContext) -> TaskOutcome {
        (self.f)(ctx)
    }
}

/// Shorthand for [`FnTask::new`].
pub fn task_fn<F>(name: impl Into<String>, f: F) -> FnTask<F>
where
    F: Fn(&TaskContext) -> TaskOutcome + Send + Sync,
{
    FnTask::new(name, f)
}
