//! Transport layer for switchpush.
//!
//! A [`Transport`] turns an ordered batch of configuration lines into
//! device-side effects and returns the raw CLI output. Every connectivity,
//! authentication or command-rejection problem surfaces as a single
//! [`TransportError`], which task bodies convert into failed results.
//!
//! Available transports:
//! - [`ssh::SshTransport`] (feature `russh`): interactive CLI over SSH

pub mod platform;
#[cfg(feature = "russh")]
pub mod ssh;

pub use platform::{Platform, UnknownPlatform};
#[cfg(feature = "russh")]
pub use ssh::SshTransport;

use async_trait::async_trait;
use humantime_serde::re::humantime::format_duration;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::inventory::Host;

/// Errors raised while talking to a device.
///
/// Cloneable so it can be stored in result trees and reported more than once.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Connection to '{host}' failed: {message}")]
    ConnectionFailed { host: String, message: String },

    #[error("Authentication failed for '{user}@{host}': {message}")]
    AuthenticationFailed {
        host: String,
        user: String,
        message: String,
    },

    #[error("Timed out after {} waiting for '{host}'", format_duration(*.limit))]
    Timeout { host: String, limit: Duration },

    #[error("'{host}' rejected command '{command}': {output}")]
    CommandRejected {
        host: String,
        command: String,
        output: String,
    },

    #[error("Channel error on '{host}': {message}")]
    Channel { host: String, message: String },

    #[error("No credentials for '{0}': set a username and a password or private_key_file")]
    MissingCredentials(String),

    #[error("Unsupported platform '{platform}' on '{host}'")]
    UnsupportedPlatform { host: String, platform: String },
}

impl TransportError {
    /// Host the error relates to.
    pub fn host(&self) -> &str {
        match self {
            TransportError::ConnectionFailed { host, .. }
            | TransportError::AuthenticationFailed { host, .. }
            | TransportError::Timeout { host, .. }
            | TransportError::CommandRejected { host, .. }
            | TransportError::Channel { host, .. }
            | TransportError::UnsupportedPlatform { host, .. } => host,
            TransportError::MissingCredentials(host) => host,
        }
    }
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Sends configuration to a device's native CLI.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue `commands` to `host` in order, verbatim, inside configuration
    /// mode, and return the raw output.
    async fn push_config(&self, host: &Host, commands: &[String]) -> TransportResult<String>;
}

/// Resolve the CLI dialect of a host from its platform tag.
pub fn platform_for(host: &Host) -> TransportResult<Platform> {
    let tag = host
        .platform()
        .ok_or_else(|| TransportError::UnsupportedPlatform {
            host: host.name.clone(),
            platform: "<unset>".to_string(),
        })?;

    tag.parse::<Platform>().map_err(|UnknownPlatform(platform)| {
        TransportError::UnsupportedPlatform {
            host: host.name.clone(),
            platform,
        }
    })
}

// ============================================================================
// Settings
// ============================================================================

/// Tunables shared by CLI transports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    /// TCP connect plus SSH handshake budget
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Budget for sending the whole batch and reading the output back
    #[serde(with = "humantime_serde")]
    pub command_timeout: Duration,

    /// Accept host keys that are not in known_hosts yet
    pub accept_unknown_host_keys: bool,

    /// Append the platform's save command after leaving config mode
    pub save_config: bool,

    /// Output patterns that mean the device rejected a line
    pub error_patterns: Vec<String>,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            command_timeout: Duration::from_secs(60),
            accept_unknown_host_keys: true,
            save_config: false,
            error_patterns: DEFAULT_ERROR_PATTERNS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

// ============================================================================
// Rejection detection
// ============================================================================

/// Output markers printed by common network operating systems when a line
/// is not accepted.
pub const DEFAULT_ERROR_PATTERNS: &[&str] = &[
    r"^\s*% ?Invalid",
    r"^\s*% ?Incomplete command",
    r"^\s*% ?Ambiguous command",
    r"^\s*% ?Permission denied",
    r"^\s*syntax error",
    r"^\s*error:",
];

static DEFAULT_DETECTOR: Lazy<RejectionDetector> = Lazy::new(|| {
    // The built-in patterns are known to compile.
    RejectionDetector::new(DEFAULT_ERROR_PATTERNS).unwrap_or_else(|_| RejectionDetector::empty())
});

/// Scans device output for command rejection markers.
#[derive(Debug, Clone)]
pub struct RejectionDetector {
    patterns: Vec<Regex>,
}

/// A rejected line found in device output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Last command echoed before the marker
    pub command: String,
    /// The marker line itself
    pub line: String,
}

impl RejectionDetector {
    /// Compile a detector from regex sources.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// A detector that never reports anything.
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// The detector for [`DEFAULT_ERROR_PATTERNS`].
    pub fn builtin() -> Self {
        DEFAULT_DETECTOR.clone()
    }

    /// Find the first rejection in `output`.
    ///
    /// `sent` is the line sequence written to the device. The rejected
    /// command is taken to be the last sent line echoed before the marker.
    pub fn scan<S: AsRef<str>>(&self, output: &str, sent: &[S]) -> Option<Rejection> {
        if self.patterns.is_empty() {
            return None;
        }

        let mut last_command: Option<&str> = None;
        for line in output.lines() {
            let line = line.trim_end_matches('\r');
            if self.patterns.iter().any(|re| re.is_match(line)) {
                return Some(Rejection {
                    command: last_command.unwrap_or("<unknown>").to_string(),
                    line: line.trim().to_string(),
                });
            }
            if let Some(cmd) = sent
                .iter()
                .map(|cmd| cmd.as_ref())
                .filter(|cmd| !cmd.is_empty())
                .find(|cmd| line.trim_end().ends_with(*cmd))
            {
                last_command = Some(cmd);
            }
        }
        None
    }
}
