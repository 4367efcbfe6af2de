//! Result tree types.
//!
//! Every task invocation produces one [`TaskResult`]; subtasks invoked from
//! its body hang below it in invocation order. One engine run produces one
//! [`AggregatedRun`], keyed by host name in submission order.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::time::Duration;
use uuid::Uuid;

use super::task::{TaskError, TaskOutput};
use crate::error::{Error, Result};

/// Outcome of one task or subtask on one host.
///
/// `failed` is true exactly when `exception` is set. A parent's `failed`
/// flag reflects only its own body: a failed child never fails its parent
/// implicitly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskResult {
    /// Name of the host the task ran against
    pub host: String,
    /// Name of the task that produced this result
    pub name: String,
    /// Payload: log text, command output, or null
    pub value: JsonValue,
    /// Whether the task reported a change on the device
    pub changed: bool,
    /// Whether the task's own body failed
    pub failed: bool,
    /// Captured error, present iff `failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<TaskError>,
    /// Results of subtasks, in invocation order
    pub children: Vec<TaskResult>,
}

impl TaskResult {
    /// Result of a task body that returned successfully.
    pub fn success(
        host: impl Into<String>,
        name: impl Into<String>,
        output: TaskOutput,
        children: Vec<TaskResult>,
    ) -> Self {
        Self {
            host: host.into(),
            name: name.into(),
            value: output.value,
            changed: output.changed,
            failed: false,
            exception: None,
            children,
        }
    }

    /// Result of a task body that failed, panicked or timed out.
    pub fn failure(
        host: impl Into<String>,
        name: impl Into<String>,
        error: TaskError,
        children: Vec<TaskResult>,
    ) -> Self {
        Self {
            host: host.into(),
            name: name.into(),
            value: JsonValue::Null,
            changed: false,
            failed: true,
            exception: Some(error),
            children,
        }
    }

    /// First direct child with the given name.
    pub fn child(&self, name: &str) -> Option<&TaskResult> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Direct children that failed.
    pub fn failed_children(&self) -> impl Iterator<Item = &TaskResult> {
        self.children.iter().filter(|c| c.failed)
    }

    /// True if this result or any descendant failed.
    pub fn any_failed(&self) -> bool {
        self.failed || self.children.iter().any(TaskResult::any_failed)
    }

    /// True if this result or any descendant changed something.
    pub fn any_changed(&self) -> bool {
        self.changed || self.children.iter().any(TaskResult::any_changed)
    }

    /// Payload as text, when it is a JSON string.
    pub fn value_str(&self) -> Option<&str> {
        self.value.as_str()
    }

    /// Depth-first, pre-order walk of the tree with each node's depth.
    pub fn walk(&self) -> Vec<(usize, &TaskResult)> {
        fn visit<'a>(node: &'a TaskResult, depth: usize, out: &mut Vec<(usize, &'a TaskResult)>) {
            out.push((depth, node));
            for child in &node.children {
                visit(child, depth + 1, out);
            }
        }

        let mut out = Vec::new();
        visit(self, 0, &mut out);
        out
    }
}

/// Node counts for one host's result tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HostStats {
    pub ok: u32,
    pub changed: u32,
    pub failed: u32,
}

impl HostStats {
    fn from_tree(result: &TaskResult) -> Self {
        let mut stats = HostStats::default();
        for (_, node) in result.walk() {
            if node.failed {
                stats.failed += 1;
            } else {
                stats.ok += 1;
            }
            if node.changed {
                stats.changed += 1;
            }
        }
        stats
    }
}

/// Per-run counts, for recaps and machine-readable output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Hosts in the run
    pub hosts: usize,
    /// Hosts whose top-level result succeeded
    pub ok: usize,
    /// Hosts whose tree reports a change
    pub changed: usize,
    /// Hosts whose top-level result failed
    pub failed: usize,
    /// Node counts per host, in submission order
    pub per_host: IndexMap<String, HostStats>,
}

/// Every host's top-level result from one engine run.
///
/// Built by the engine at the join point and read-only afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedRun {
    id: Uuid,
    name: String,
    dry_run: bool,
    started_at: DateTime<Utc>,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    elapsed: Duration,
    results: IndexMap<String, TaskResult>,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

impl AggregatedRun {
    pub(crate) fn new(
        name: impl Into<String>,
        dry_run: bool,
        started_at: DateTime<Utc>,
        elapsed: Duration,
        results: IndexMap<String, TaskResult>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            dry_run,
            started_at,
            elapsed,
            results,
        }
    }

    /// Unique identifier of this run.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Run name (also the name of every top-level result).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the run was a dry run.
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Top-level result of a host.
    pub fn get(&self, host: &str) -> Option<&TaskResult> {
        self.results.get(host)
    }

    /// `(host, result)` pairs in submission order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, TaskResult> {
        self.results.iter()
    }

    /// Host names in submission order.
    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.results.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// True if any host's top-level result failed.
    pub fn failed(&self) -> bool {
        self.results.values().any(|r| r.failed)
    }

    /// Hosts whose top-level result failed, in submission order.
    pub fn failed_hosts(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|(_, r)| r.failed)
            .map(|(host, _)| host.as_str())
            .collect()
    }

    /// Hosts where anything in the tree reported a change.
    pub fn changed_hosts(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|(_, r)| r.any_changed())
            .map(|(host, _)| host.as_str())
            .collect()
    }

    /// Aggregate counts for the run.
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            hosts: self.results.len(),
            ..Default::default()
        };
        for (host, result) in &self.results {
            if result.failed {
                summary.failed += 1;
            } else {
                summary.ok += 1;
            }
            if result.any_changed() {
                summary.changed += 1;
            }
            summary
                .per_host
                .insert(host.clone(), HostStats::from_tree(result));
        }
        summary
    }

    /// Fail with [`Error::RunFailed`] if any host's top-level result failed.
    pub fn ensure_success(&self) -> Result<()> {
        let failed = self.failed_hosts();
        if failed.is_empty() {
            Ok(())
        } else {
            Err(Error::RunFailed {
                run: self.name.clone(),
                failed_hosts: failed.into_iter().map(str::to_string).collect(),
            })
        }
    }
}

impl<'a> IntoIterator for &'a AggregatedRun {
    type Item = (&'a String, &'a TaskResult);
    type IntoIter = indexmap::map::Iter<'a, String, TaskResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}
