//! Output and reporting for switchpush
//!
//! Renders an [`AggregatedRun`] as a per-host result tree, as JSON/YAML
//! documents, or as one line per host, followed by a recap table.

use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Result;
use crate::executor::{AggregatedRun, RunSummary, TaskResult};

const WIDTH: usize = 80;

/// Exit status for a run with at least one failed host
pub const EXIT_RUN_FAILED: i32 = 2;

/// How results are rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Result tree per host, then a recap
    #[default]
    Human,
    /// Pretty-printed JSON document
    Json,
    /// YAML document
    Yaml,
    /// One line per host
    Minimal,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Human => "human",
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
            OutputFormat::Minimal => "minimal",
        };
        f.write_str(name)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "default" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            "minimal" | "oneline" => Ok(OutputFormat::Minimal),
            _ => Err(format!(
                "Unknown output format '{}'. Valid options: human, json, yaml, minimal",
                s
            )),
        }
    }
}

/// Process exit status for a finished run: 0 when every host's top-level
/// result succeeded, [`EXIT_RUN_FAILED`] otherwise.
pub fn exit_status(run: &AggregatedRun) -> i32 {
    if run.failed() {
        EXIT_RUN_FAILED
    } else {
        0
    }
}

#[derive(Serialize)]
struct Report<'a> {
    run: &'a AggregatedRun,
    summary: RunSummary,
}

/// Renders runs in the configured format.
#[derive(Debug, Clone)]
pub struct ResultPrinter {
    format: OutputFormat,
    use_color: bool,
}

impl ResultPrinter {
    /// Create a printer. Color is disabled when `NO_COLOR` is set.
    pub fn new(format: OutputFormat, use_color: bool) -> Self {
        let use_color = use_color && std::env::var_os("NO_COLOR").is_none();
        Self { format, use_color }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Print the rendered run to stdout.
    pub fn print(&self, run: &AggregatedRun) -> Result<()> {
        print!("{}", self.render(run)?);
        Ok(())
    }

    /// Render the run as text.
    pub fn render(&self, run: &AggregatedRun) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(self.render_tree(run)),
            OutputFormat::Minimal => Ok(self.render_minimal(run)),
            OutputFormat::Json => {
                let report = Report {
                    run,
                    summary: run.summary(),
                };
                Ok(format!("{}\n", serde_json::to_string_pretty(&report)?))
            }
            OutputFormat::Yaml => {
                let report = Report {
                    run,
                    summary: run.summary(),
                };
                Ok(serde_yaml::to_string(&report)?)
            }
        }
    }

    fn render_tree(&self, run: &AggregatedRun) -> String {
        let mut lines = Vec::new();

        let banner = fill(run.name(), '*');
        lines.push(self.paint(&banner, Paint::Banner));

        for (host, result) in run {
            let header = fill(
                &format!("* {} ** changed : {} ", host, result.any_changed()),
                '*',
            );
            let state = if result.any_failed() {
                Paint::Failed
            } else if result.any_changed() {
                Paint::Changed
            } else {
                Paint::Ok
            };
            lines.push(self.paint(&header, state));

            for (depth, node) in result.walk() {
                self.render_node(&mut lines, depth, node);
            }

            let footer = fill(&format!("^^^^ END {} ", result.name), '^');
            lines.push(self.paint(&footer, state));
        }

        lines.push(String::new());
        lines.extend(self.render_recap(run));

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }

    fn render_node(&self, lines: &mut Vec<String>, depth: usize, node: &TaskResult) {
        let (marker, filler) = if depth == 0 { ("vvvv", 'v') } else { ("----", '-') };
        let level = if node.failed { "ERROR" } else { "INFO" };
        let indent = "  ".repeat(depth.saturating_sub(1));

        let head = format!("{}{} {} ** changed : {} ", indent, marker, node.name, node.changed);
        let line = format!("{} {}", fill_to(&head, filler, WIDTH - level.len() - 1), level);
        let state = if node.failed {
            Paint::Failed
        } else if node.changed {
            Paint::Changed
        } else {
            Paint::Ok
        };
        lines.push(self.paint(&line, state));

        let body = match &node.exception {
            Some(error) => format!("{}: {}", error.kind(), error),
            None => value_text(node),
        };
        if !body.is_empty() {
            for text in body.lines() {
                lines.push(format!("{}{}", indent, text));
            }
        }
    }

    fn render_minimal(&self, run: &AggregatedRun) -> String {
        let mut out = String::new();
        for (host, result) in run {
            let line = match &result.exception {
                Some(error) => self.paint(&format!("{} | FAILED | {}", host, error), Paint::Failed),
                None if result.any_changed() => {
                    self.paint(&format!("{} | CHANGED", host), Paint::Changed)
                }
                None => self.paint(&format!("{} | OK", host), Paint::Ok),
            };
            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    /// Recap table lines: one per host with node counts, then run totals.
    pub fn render_recap(&self, run: &AggregatedRun) -> Vec<String> {
        let summary = run.summary();
        let mut lines = vec![self.paint(&fill("RECAP ", '*'), Paint::Banner)];

        for (host, stats) in &summary.per_host {
            let line = format!(
                "{:<30} : ok={:<4} changed={:<4} failed={:<4}",
                host, stats.ok, stats.changed, stats.failed
            );
            let state = if stats.failed > 0 {
                Paint::Failed
            } else if stats.changed > 0 {
                Paint::Changed
            } else {
                Paint::Ok
            };
            lines.push(self.paint(&line, state));
        }

        let totals = format!(
            "{} hosts, {} ok, {} changed, {} failed in {:.2}s{}",
            summary.hosts,
            summary.ok,
            summary.changed,
            summary.failed,
            run.elapsed().as_secs_f64(),
            if run.dry_run() { " (dry run)" } else { "" }
        );
        lines.push(String::new());
        lines.push(self.paint(&totals, Paint::Banner));
        lines
    }

    fn paint(&self, text: &str, paint: Paint) -> String {
        if !self.use_color {
            return text.to_string();
        }
        match paint {
            Paint::Banner => text.bright_white().bold().to_string(),
            Paint::Ok => text.green().to_string(),
            Paint::Changed => text.yellow().to_string(),
            Paint::Failed => text.red().bold().to_string(),
        }
    }
}

impl Default for ResultPrinter {
    fn default() -> Self {
        Self::new(OutputFormat::Human, true)
    }
}

#[derive(Debug, Clone, Copy)]
enum Paint {
    Banner,
    Ok,
    Changed,
    Failed,
}

fn fill(head: &str, filler: char) -> String {
    fill_to(head, filler, WIDTH)
}

fn fill_to(head: &str, filler: char, width: usize) -> String {
    let pad = width.saturating_sub(head.chars().count());
    let mut line = head.to_string();
    line.extend(std::iter::repeat(filler).take(pad));
    line
}

fn value_text(node: &TaskResult) -> String {
    match &node.value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) if items.iter().all(|v| v.is_string()) => items
            .iter()
            .filter_map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}
