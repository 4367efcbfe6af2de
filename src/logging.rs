//! Structured logging using the tracing crate.
//!
//! Console output goes to stderr in one of several formats. An optional
//! file sink receives the same events without ANSI colors, so a run leaves
//! a log behind even when the console is quiet.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::error::{Error, Result};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Log verbosity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Level for a `-v` count: 0 warn, 1 info, 2 debug, 3+ trace.
    pub fn from_verbosity(count: u8) -> Self {
        match count {
            0 => LogLevel::Warn,
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Unknown log level '{}'", s)),
        }
    }
}

/// Console log format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    #[default]
    Compact,
    Json,
    Full,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level used when `RUST_LOG` is not set
    pub level: LogLevel,

    /// Console format
    pub format: LogFormat,

    /// Append events to this file as well
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    /// Colored console output
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            log_file: None,
            ansi: true,
        }
    }
}

/// Builder for the global tracing subscriber.
#[derive(Debug, Clone, Default)]
pub struct LoggingBuilder {
    config: LoggingConfig,
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: LoggingConfig) -> Self {
        Self { config }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn with_ansi(mut self, enabled: bool) -> Self {
        self.config.ansi = enabled;
        self
    }

    /// Also write events to `path`.
    pub fn with_file_output(mut self, path: impl AsRef<Path>) -> Self {
        self.config.log_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Install the subscriber globally.
    pub fn init(self) -> Result<()> {
        let layers = self.build_layers()?;
        tracing_subscriber::registry()
            .with(layers)
            .try_init()
            .map_err(|e| Error::Logging(e.to_string()))
    }

    /// Console layer plus the file layer, if configured, each with its own
    /// level filter.
    pub fn build_layers(&self) -> Result<Vec<BoxedLayer>> {
        let mut layers = vec![self.console_layer()];
        if let Some(path) = &self.config.log_file {
            layers.push(self.file_layer(path)?);
        }
        Ok(layers)
    }

    fn build_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.config.level.as_str()))
    }

    fn console_layer(&self) -> BoxedLayer {
        let base = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(self.config.ansi);

        match self.config.format {
            LogFormat::Pretty => base.pretty().with_filter(self.build_filter()).boxed(),
            LogFormat::Compact => base
                .compact()
                .with_target(false)
                .with_filter(self.build_filter())
                .boxed(),
            LogFormat::Json => base.json().with_filter(self.build_filter()).boxed(),
            LogFormat::Full => base
                .with_thread_ids(true)
                .with_filter(self.build_filter())
                .boxed(),
        }
    }

    fn file_layer(&self, path: &Path) -> Result<BoxedLayer> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::file_io(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| Error::file_io(path, e))?;

        let base = tracing_subscriber::fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false);

        let layer = match self.config.format {
            LogFormat::Json => base.json().with_filter(self.build_filter()).boxed(),
            _ => base.with_filter(self.build_filter()).boxed(),
        };
        Ok(layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{debug, info};

    #[test]
    fn test_level_parsing() {
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_verbosity_mapping() {
        assert_eq!(LogLevel::from_verbosity(0), LogLevel::Warn);
        assert_eq!(LogLevel::from_verbosity(1), LogLevel::Info);
        assert_eq!(LogLevel::from_verbosity(2), LogLevel::Debug);
        assert_eq!(LogLevel::from_verbosity(9), LogLevel::Trace);
    }

    #[test]
    fn test_config_from_toml() {
        let config: LoggingConfig =
            toml::from_str("level = \"debug\"\nformat = \"json\"\nlog_file = \"run.log\"\n").unwrap();
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.log_file, Some(PathBuf::from("run.log")));
        assert!(config.ansi);
    }

    #[test]
    fn test_file_sink_receives_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("switchpush.log");

        let layers = LoggingBuilder::new()
            .with_level(LogLevel::Info)
            .with_ansi(false)
            .with_file_output(&path)
            .build_layers()
            .unwrap();
        assert_eq!(layers.len(), 2);

        let subscriber = Registry::default().with(layers);
        tracing::subscriber::with_default(subscriber, || {
            info!("leaf01 says hi!");
            debug!("not at info");
        });

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("leaf01 says hi!"));
        assert!(!content.contains("not at info"));
    }
}
