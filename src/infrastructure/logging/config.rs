use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Logging configuration for the CLI binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format for stdout logs.
    #[serde(default = "default_format")]
    pub format: LogFormat,

    /// Directory for a JSON log file. `None` logs to stdout only.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Enable stdout logging in addition to the file, if any.
    #[serde(default = "default_true")]
    pub enable_stdout: bool,
}

/// Stdout log rendering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Human-readable, for an interactive terminal.
    Pretty,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_format(),
            log_dir: None,
            enable_stdout: true,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_true() -> bool {
    true
}
