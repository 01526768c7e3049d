//! Task domain model.
//!
//! A task is one runnable check in the verification graph: a command line,
//! its declared dependencies, the file patterns it reads, and the knobs
//! that affect its cache key and execution.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single runnable check node in the task graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Stable identifier, unique within a run (e.g. "ruff", "pytest").
    pub id: String,

    /// Argv to execute. `argv[0]` is the executable, looked up on `PATH`.
    pub argv: Vec<String>,

    /// Ids of tasks that must complete (pass or fail) before this one starts.
    pub deps: Vec<String>,

    /// Glob patterns (relative to the repository root) whose matched files
    /// feed both the fingerprinter's include-set and this task's cache key.
    pub input_patterns: Vec<String>,

    /// Opaque string folded into the cache key. Bump it to force a task to
    /// be considered changed without touching `argv` or `input_patterns`
    /// (e.g. after upgrading a checker's config file format).
    #[serde(default)]
    pub salt: String,

    /// Wall-clock budget for the subprocess. `None` means no timeout.
    #[serde(default)]
    pub timeout_s: Option<u64>,

    /// If true, a non-zero exit from this task does not fail the run.
    #[serde(default)]
    pub allow_fail: bool,

    /// Resource tags this task holds exclusively while running. Two tasks
    /// whose tag sets intersect never execute concurrently.
    #[serde(default)]
    pub resources: Vec<String>,
}

impl Task {
    /// Resource tags as a set, for cheap intersection checks in the executor.
    pub fn resource_set(&self) -> HashSet<&str> {
        self.resources.iter().map(String::as_str).collect()
    }
}
