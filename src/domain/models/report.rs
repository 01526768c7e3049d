//! Run report: the artifact produced by every call to
//! [`crate::services::orchestrator::run`], cached or not.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether a task's result came from a fresh execution, a cache hit, or was
/// never spawned because a blocking dependency failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheState {
    /// The task ran a fresh subprocess this run.
    Miss,
    /// The task's result was reused from the local on-disk cache.
    LocalHit,
    /// The task's result was reused from a configured remote backend.
    RemoteHit,
    /// A blocking (non-`allow_fail`) dependency failed, so this task was
    /// never spawned.
    #[serde(rename = "skipped-dep-fail")]
    SkippedDepFail,
}

/// The outcome of a single task within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    /// The task id this result belongs to.
    pub task_id: String,

    /// The command line this task ran (or would have run).
    pub argv: Vec<String>,

    /// Process exit code, if the task ran to completion. `None` when the
    /// task was killed for exceeding its timeout, or never spawned.
    pub exit_code: Option<i32>,

    /// Whether the process itself exited zero. Unlike `OverallStatus`, this
    /// is never masked by `allowed_to_fail` -- it's the raw outcome.
    pub passed: bool,

    /// Whether a non-zero exit from this task is allowed to not fail the
    /// run (mirrors `Task::allow_fail` at the time this task ran).
    pub allowed_to_fail: bool,

    /// False only when this task was skipped because a blocking dependency
    /// failed; true otherwise, including for tasks with no dependencies.
    pub deps_satisfied: bool,

    /// The content-addressed cache key this task was looked up/stored
    /// under.
    pub cache_key: String,

    /// Where this result came from.
    pub cache_state: CacheState,

    /// When the task started running. Equal to `finished_at` for cache
    /// hits and skipped tasks.
    pub started_at: DateTime<Utc>,

    /// When the task finished running.
    pub finished_at: DateTime<Utc>,

    /// Wall-clock duration of the subprocess, in milliseconds. Zero for
    /// cache hits and skipped tasks.
    pub duration_ms: u64,

    /// Path to the captured stdout log, relative to the run's log
    /// directory. `None` for cache hits and skipped tasks.
    pub stdout_path: Option<String>,

    /// Path to the captured stderr log, relative to the run's log
    /// directory. `None` for cache hits and skipped tasks.
    pub stderr_path: Option<String>,

    /// True if the task was killed after exceeding `timeout_s`.
    pub timed_out: bool,
}

/// The overall verdict of a run, derived from its `required_pass_bar` and
/// the individual `TaskResult` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    /// Every blocking task passed; no allowed-to-fail task failed either.
    Pass,
    /// At least one blocking (non-`allow_fail`) task failed.
    Fail,
    /// No blocking task failed, but at least one `allow_fail` task did.
    Partial,
}

/// The full result of a run: one entry per task plus a verdict, always
/// produced even when every task was served from cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Repository fingerprint this report was computed against.
    pub fingerprint: String,

    /// Engine schema version, bumped whenever the on-disk report/cache
    /// shape changes incompatibly.
    pub schema_version: u32,

    /// When this run started.
    pub started_at: DateTime<Utc>,

    /// When this run finished.
    pub finished_at: DateTime<Utc>,

    /// Per-task results, in the order each task completed (or was skipped).
    pub tasks: Vec<TaskResult>,

    /// The run's final verdict.
    pub overall_status: OverallStatus,

    /// True if this report was returned via the zero-run fast path without
    /// spawning any subprocess.
    pub verified_from_cache: bool,

    /// Wall-clock duration of the whole run, in milliseconds.
    pub duration_ms: u64,
}

impl RunReport {
    /// Compute the overall status from task results under the strict bar:
    /// any blocking (non-`allow_fail`) failure is `Fail`; otherwise any
    /// failure at all is `Partial`; otherwise `Pass`.
    pub fn compute_status(tasks: &[TaskResult]) -> OverallStatus {
        if tasks.iter().any(|t| !t.passed && !t.allowed_to_fail) {
            OverallStatus::Fail
        } else if tasks.iter().any(|t| !t.passed) {
            OverallStatus::Partial
        } else {
            OverallStatus::Pass
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(passed: bool, allowed_to_fail: bool) -> TaskResult {
        let now = Utc::now();
        TaskResult {
            task_id: "ruff".to_string(),
            argv: vec!["ruff".to_string()],
            exit_code: Some(if passed { 0 } else { 1 }),
            passed,
            allowed_to_fail,
            deps_satisfied: true,
            cache_key: "deadbeef".to_string(),
            cache_state: CacheState::Miss,
            started_at: now,
            finished_at: now,
            duration_ms: 10,
            stdout_path: None,
            stderr_path: None,
            timed_out: false,
        }
    }

    #[test]
    fn status_is_pass_when_all_tasks_pass() {
        let tasks = vec![result(true, false), result(true, false)];
        assert_eq!(RunReport::compute_status(&tasks), OverallStatus::Pass);
    }

    #[test]
    fn status_is_fail_when_a_blocking_task_fails() {
        let tasks = vec![result(true, false), result(false, false)];
        assert_eq!(RunReport::compute_status(&tasks), OverallStatus::Fail);
    }

    #[test]
    fn status_is_partial_when_only_an_allowed_to_fail_task_fails() {
        let tasks = vec![result(true, false), result(false, true)];
        assert_eq!(RunReport::compute_status(&tasks), OverallStatus::Partial);
    }
}
