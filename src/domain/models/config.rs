//! Engine configuration: the checks to run and the knobs that govern how
//! the orchestrator schedules and caches them.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::task::Task;

/// How strict a run must be to report [`super::report::OverallStatus::Pass`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredPassBar {
    /// Every task must pass (or be marked `allow_fail`). The default.
    Strict,
    /// A run is green as long as no task with `allow_fail = false` both
    /// failed and was not already green in the last recorded run.
    PartialOk,
}

impl Default for RequiredPassBar {
    fn default() -> Self {
        Self::Strict
    }
}

/// One check's configuration as it appears in `firsttry.toml`. Any field
/// left unset falls back to the check's built-in default, if it has one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Check id; must match a built-in id or be fully specified.
    pub id: String,

    /// Overrides the built-in argv, or is required if `id` has no built-in.
    #[serde(default)]
    pub argv: Option<Vec<String>>,

    /// Overrides the built-in dependency list.
    #[serde(default)]
    pub deps: Option<Vec<String>>,

    /// Overrides the built-in input glob patterns.
    #[serde(default)]
    pub input_patterns: Option<Vec<String>>,

    /// Opaque cache-key salt override.
    #[serde(default)]
    pub salt: Option<String>,

    /// Per-task timeout override, in seconds.
    #[serde(default)]
    pub timeout_s: Option<u64>,

    /// Whether a non-zero exit from this task fails the run.
    #[serde(default)]
    pub allow_fail: Option<bool>,

    /// Resource-tag override.
    #[serde(default)]
    pub resources: Option<Vec<String>>,

    /// Drop this check from the plan entirely.
    #[serde(default)]
    pub disabled: bool,
}

/// Full engine configuration for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Root of the repository being checked.
    pub repo_root: PathBuf,

    /// Directory the engine writes its state under (`cache/`, `logs/`,
    /// `last_green_run.json`).
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Upper bound on concurrently running tasks.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Per-check configuration, overriding or extending the built-ins.
    #[serde(default)]
    pub checks: Vec<CheckConfig>,

    /// Bar a run must clear to be reported green.
    #[serde(default)]
    pub required_pass_bar: RequiredPassBar,

    /// Base URL of an optional remote cache backend. `None` disables it.
    #[serde(default)]
    pub remote_cache_url: Option<String>,
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".firsttry")
}

fn default_max_workers() -> usize {
    num_cpus::get().max(1)
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            repo_root: PathBuf::from("."),
            state_dir: default_state_dir(),
            max_workers: default_max_workers(),
            checks: Vec::new(),
            required_pass_bar: RequiredPassBar::default(),
            remote_cache_url: None,
        }
    }
}

/// Built-in default task for a well-known check id, before any
/// `CheckConfig` override is applied. Returns `None` for unrecognized ids,
/// which must then be fully specified in configuration.
pub fn builtin_task(id: &str) -> Option<Task> {
    let task = match id {
        "ruff" => Task {
            id: "ruff".to_string(),
            argv: vec!["ruff".to_string(), "check".to_string(), ".".to_string()],
            deps: vec![],
            input_patterns: vec!["**/*.py".to_string()],
            salt: String::new(),
            timeout_s: Some(120),
            allow_fail: false,
            resources: vec![],
        },
        "black" => Task {
            id: "black".to_string(),
            argv: vec!["black".to_string(), "--check".to_string(), ".".to_string()],
            deps: vec![],
            input_patterns: vec!["**/*.py".to_string()],
            salt: String::new(),
            timeout_s: Some(120),
            allow_fail: false,
            resources: vec![],
        },
        "mypy" => Task {
            id: "mypy".to_string(),
            argv: vec!["mypy".to_string(), ".".to_string()],
            deps: vec!["ruff".to_string()],
            input_patterns: vec!["**/*.py".to_string()],
            salt: String::new(),
            timeout_s: Some(300),
            allow_fail: false,
            resources: vec![],
        },
        "bandit" => Task {
            id: "bandit".to_string(),
            argv: vec![
                "bandit".to_string(),
                "-r".to_string(),
                ".".to_string(),
                "-q".to_string(),
            ],
            deps: vec![],
            input_patterns: vec!["**/*.py".to_string()],
            salt: String::new(),
            timeout_s: Some(180),
            allow_fail: false,
            resources: vec![],
        },
        "pytest" => Task {
            id: "pytest".to_string(),
            argv: vec!["pytest".to_string(), "-q".to_string()],
            deps: vec!["ruff".to_string(), "mypy".to_string()],
            input_patterns: vec!["**/*.py".to_string(), "**/conftest.py".to_string()],
            salt: String::new(),
            timeout_s: Some(600),
            allow_fail: false,
            resources: vec!["pytest".to_string()],
        },
        _ => return None,
    };
    Some(task)
}

/// The ids of every check with a built-in default, in a stable order
/// suitable for documentation and `firsttry clear-cache --all` listings.
pub const BUILTIN_CHECK_IDS: &[&str] = &["ruff", "black", "mypy", "bandit", "pytest"];
