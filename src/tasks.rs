//! Business tasks for pushing interface configuration.
//!
//! [`InterfacePush`] is the top-level task: it greets the host through
//! [`LogGreeting`] and then sends a command batch through [`PushConfig`],
//! both as subtasks, and fails only when the push step failed.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::executor::{Task, TaskContext, TaskError, TaskOutcome, TaskOutput};
use crate::transport::Transport;

/// Name of the logging subtask.
pub const LOG_TASK_NAME: &str = "Logging outputs";

/// Name of the push subtask.
pub const PUSH_TASK_NAME: &str = "push_config";

/// Interface batch applied to NX-OS leaves when no plan says otherwise.
pub const DEFAULT_NXOS_COMMANDS: &[&str] = &[
    "default interface Ethernet1/13 - 14",
    "interface Ethernet1/13",
    "switchport mode trunk",
    "switchport trunk allowed vlan 100, 200",
    "description compute01.example.com data",
    "no shutdown",
    "interface Ethernet1/14",
    "switchport mode trunk",
    "switchport trunk allowed vlan 300, 400",
    "description compute02.example.com data",
    "no shutdown",
];

/// Writes a greeting for the host to the log.
#[derive(Debug, Clone)]
pub struct LogGreeting {
    name: String,
}

impl LogGreeting {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for LogGreeting {
    fn default() -> Self {
        Self::new(LOG_TASK_NAME)
    }
}

#[async_trait]
impl Task for LogGreeting {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: &mut TaskContext) -> TaskOutcome {
        let host = &ctx.host().name;
        info!("{} says hi!", host);
        warn!("Warning {:?} is running task {:?}", host, self.name);
        Ok(TaskOutput::message(format!(
            "Task {} made some log updates",
            self.name
        )))
    }
}

/// Sends a configuration batch to the host through a [`Transport`].
///
/// In dry-run mode the batch is returned as the value and nothing is sent.
#[derive(Clone)]
pub struct PushConfig {
    transport: Arc<dyn Transport>,
    commands: Vec<String>,
}

impl PushConfig {
    pub fn new(transport: Arc<dyn Transport>, commands: Vec<String>) -> Self {
        Self {
            transport,
            commands,
        }
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }
}

impl std::fmt::Debug for PushConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushConfig")
            .field("commands", &self.commands)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Task for PushConfig {
    fn name(&self) -> &str {
        PUSH_TASK_NAME
    }

    async fn run(&self, ctx: &mut TaskContext) -> TaskOutcome {
        if ctx.dry_run() {
            debug!(host = %ctx.host().name, commands = self.commands.len(), "Dry run, not sending");
            let batch = self
                .commands
                .iter()
                .cloned()
                .map(JsonValue::String)
                .collect::<Vec<_>>();
            return Ok(TaskOutput::ok().with_value(batch));
        }

        let output = self
            .transport
            .push_config(ctx.host(), &self.commands)
            .await?;
        Ok(TaskOutput::changed().with_value(output))
    }
}

/// Greets the host, then pushes the configured batch.
#[derive(Debug, Clone)]
pub struct InterfacePush {
    greeting: LogGreeting,
    push: PushConfig,
}

impl InterfacePush {
    pub fn new(transport: Arc<dyn Transport>, commands: Vec<String>) -> Self {
        Self {
            greeting: LogGreeting::default(),
            push: PushConfig::new(transport, commands),
        }
    }

    pub fn commands(&self) -> &[String] {
        self.push.commands()
    }
}

#[async_trait]
impl Task for InterfacePush {
    fn name(&self) -> &str {
        "interface_push"
    }

    async fn run(&self, ctx: &mut TaskContext) -> TaskOutcome {
        let greeting = ctx.run_task(&self.greeting).await;
        if greeting.failed {
            debug!(host = %greeting.host, "Greeting failed, continuing");
        }

        let push = ctx.run_task(&self.push).await;
        if push.failed {
            return Err(TaskError::Subtask {
                name: push.name.clone(),
            });
        }
        let changed = push.changed;

        Ok(TaskOutput::message("task finished").with_changed(changed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{Engine, EngineConfig, RunParams};
    use crate::inventory::{Host, HostSet};
    use crate::transport::{TransportError, TransportResult};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(String, Vec<String>)>>,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl Transport for Recorder {
        async fn push_config(&self, host: &Host, commands: &[String]) -> TransportResult<String> {
            if self.fail_on.as_deref() == Some(host.name.as_str()) {
                return Err(TransportError::ConnectionFailed {
                    host: host.name.clone(),
                    message: "connection refused".into(),
                });
            }
            self.sent.lock().push((host.name.clone(), commands.to_vec()));
            Ok(format!("{}(config)# end", host.name))
        }
    }

    fn commands() -> Vec<String> {
        DEFAULT_NXOS_COMMANDS.iter().map(|c| c.to_string()).collect()
    }

    fn two_hosts() -> HostSet {
        vec![Host::new("leaf01"), Host::new("leaf02")].into_iter().collect()
    }

    #[tokio::test]
    async fn test_push_sends_batch_verbatim() {
        let transport = Arc::new(Recorder::default());
        let task = Arc::new(InterfacePush::new(transport.clone(), commands()));

        let run = Engine::default()
            .run_with("push", task, &two_hosts(), RunParams::new(false))
            .await;

        assert!(!run.failed());
        let sent = transport.sent.lock();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|(_, batch)| *batch == commands()));

        let leaf01 = run.get("leaf01").unwrap();
        assert!(leaf01.changed);
        assert_eq!(leaf01.value_str(), Some("task finished"));
        assert_eq!(leaf01.children[0].name, LOG_TASK_NAME);
        assert_eq!(
            leaf01.children[0].value_str(),
            Some("Task Logging outputs made some log updates")
        );
        assert_eq!(leaf01.children[1].name, PUSH_TASK_NAME);
        assert_eq!(leaf01.children[1].value_str(), Some("leaf01(config)# end"));
    }

    #[tokio::test]
    async fn test_dry_run_sends_nothing() {
        let transport = Arc::new(Recorder::default());
        let task = Arc::new(InterfacePush::new(transport.clone(), commands()));

        let run = Engine::new(EngineConfig::default().with_dry_run(true))
            .run("push", task, &two_hosts())
            .await;

        assert!(!run.failed());
        assert!(transport.sent.lock().is_empty());
        let push = run.get("leaf02").and_then(|r| r.child(PUSH_TASK_NAME)).unwrap();
        assert!(!push.changed);
        assert_eq!(push.value.as_array().map(Vec::len), Some(DEFAULT_NXOS_COMMANDS.len()));
    }

    #[tokio::test]
    async fn test_push_failure_fails_parent_only_on_that_host() {
        let transport = Arc::new(Recorder {
            fail_on: Some("leaf01".into()),
            ..Default::default()
        });
        let task = Arc::new(InterfacePush::new(transport.clone(), commands()));

        let run = Engine::default()
            .run_with("push", task, &two_hosts(), RunParams::new(false))
            .await;

        let leaf01 = run.get("leaf01").unwrap();
        assert!(leaf01.failed);
        assert_eq!(
            leaf01.exception,
            Some(TaskError::Subtask {
                name: PUSH_TASK_NAME.into()
            })
        );
        assert!(!leaf01.children[0].failed);
        assert!(matches!(
            leaf01.children[1].exception,
            Some(TaskError::Transport(TransportError::ConnectionFailed { .. }))
        ));

        let leaf02 = run.get("leaf02").unwrap();
        assert!(!leaf02.any_failed());
        assert_eq!(transport.sent.lock().len(), 1);
    }
}
