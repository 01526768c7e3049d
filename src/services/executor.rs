//! Bounded-parallelism task executor.
//!
//! Dispatches tasks as soon as their dependencies have finished (pass or
//! fail) and no currently-running task holds a conflicting resource tag,
//! up to `max_workers` concurrent subprocesses. A task is considered ready
//! once every dependency that is actually part of this run's scheduled set
//! has a result; dependencies outside that set (e.g. excluded from a
//! changed-only projection) are treated as already satisfied. A task whose
//! blocking (non-`allow_fail`) dependency failed is never spawned.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fs::File;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{error, warn};

use crate::domain::models::{CacheState, Dag, Task, TaskResult};
use crate::services::task_cache::TaskCache;

/// Runs a [`Dag`] to completion, respecting dependency order, resource-tag
/// exclusion, per-task timeouts, and the task cache.
pub struct Executor {
    max_workers: usize,
    cache: Arc<TaskCache>,
    repo_root: PathBuf,
    log_dir: PathBuf,
}

impl Executor {
    /// Build an executor bounded to `max_workers` concurrent subprocesses,
    /// writing task stdout/stderr under `log_dir`.
    pub fn new(max_workers: usize, cache: Arc<TaskCache>, repo_root: PathBuf, log_dir: PathBuf) -> Self {
        Self {
            max_workers: max_workers.max(1),
            cache,
            repo_root,
            log_dir,
        }
    }

    /// Run every task id in `order` (already topologically sorted), and
    /// return one [`TaskResult`] per task, in the order each task
    /// completed or was skipped.
    pub async fn execute(&self, dag: &Dag, order: &[String]) -> Vec<TaskResult> {
        let scheduled: HashSet<String> = order.iter().cloned().collect();
        let mut results: HashMap<String, TaskResult> = HashMap::new();
        let mut completed: Vec<TaskResult> = Vec::with_capacity(order.len());
        let mut remaining: VecDeque<String> = order.iter().cloned().collect();
        let mut active_resources: HashSet<String> = HashSet::new();
        let mut in_flight = FuturesUnordered::new();

        loop {
            let mut index = 0;
            while index < remaining.len() {
                if in_flight.len() >= self.max_workers {
                    break;
                }
                let id = remaining[index].clone();
                let task = match dag.get(&id) {
                    Some(task) => task.clone(),
                    None => {
                        remaining.remove(index);
                        continue;
                    }
                };

                // A dependency outside this run's scheduled set (e.g.
                // excluded from a changed-only projection) is treated as
                // already satisfied rather than blocking readiness.
                let deps_done = task
                    .deps
                    .iter()
                    .all(|dep| !scheduled.contains(dep) || results.contains_key(dep));
                if !deps_done {
                    index += 1;
                    continue;
                }

                let blocking_failed = task.deps.iter().any(|dep| {
                    scheduled.contains(dep)
                        && dag.get(dep).is_some_and(|d| !d.allow_fail)
                        && results.get(dep).is_some_and(|r| !r.passed)
                });
                if blocking_failed {
                    remaining.remove(index);
                    let skipped = skipped_dep_fail_result(&self.cache, &task, &self.repo_root);
                    results.insert(task.id.clone(), skipped.clone());
                    completed.push(skipped);
                    continue;
                }

                let task_resources: HashSet<String> = task.resources.iter().cloned().collect();
                if !active_resources.is_disjoint(&task_resources) {
                    index += 1;
                    continue;
                }

                remaining.remove(index);
                active_resources.extend(task_resources.iter().cloned());

                let this = self.clone_for_task();
                in_flight.push(async move {
                    let result = this.run_one(&task).await;
                    (task.id, task_resources, result)
                });
            }

            if in_flight.is_empty() {
                if !remaining.is_empty() {
                    error!(
                        remaining = remaining.len(),
                        "executor stalled with unscheduled tasks; this indicates a planner bug"
                    );
                }
                break;
            }

            if let Some((id, task_resources, result)) = in_flight.next().await {
                for tag in task_resources {
                    active_resources.remove(&tag);
                }
                results.insert(id, result.clone());
                completed.push(result);
            }
        }

        completed
    }

    fn clone_for_task(&self) -> ExecutorTask {
        ExecutorTask {
            cache: self.cache.clone(),
            repo_root: self.repo_root.clone(),
            log_dir: self.log_dir.clone(),
        }
    }
}

/// A `TaskResult` for a task that was never spawned because one of its
/// blocking (non-`allow_fail`) dependencies failed.
fn skipped_dep_fail_result(cache: &TaskCache, task: &Task, repo_root: &std::path::Path) -> TaskResult {
    let now = Utc::now();
    TaskResult {
        task_id: task.id.clone(),
        argv: task.argv.clone(),
        exit_code: Some(125),
        passed: false,
        allowed_to_fail: task.allow_fail,
        deps_satisfied: false,
        cache_key: cache.cache_key(task, repo_root),
        cache_state: CacheState::SkippedDepFail,
        started_at: now,
        finished_at: now,
        duration_ms: 0,
        stdout_path: None,
        stderr_path: None,
        timed_out: false,
    }
}

/// Per-task execution context, cheap to clone so each in-flight future owns
/// its copy.
#[derive(Clone)]
struct ExecutorTask {
    cache: Arc<TaskCache>,
    repo_root: PathBuf,
    log_dir: PathBuf,
}

impl ExecutorTask {
    async fn run_one(&self, task: &Task) -> TaskResult {
        let key = self.cache.cache_key(task, &self.repo_root);
        if let Some(hit) = self.cache.get(&task.id, &key).await {
            return hit;
        }

        let result = self.spawn_and_wait(task, &key).await;
        self.cache.put(&task.id, &key, &result).await;
        result
    }

    async fn spawn_and_wait(&self, task: &Task, cache_key: &str) -> TaskResult {
        let start = Utc::now();
        let Some((exe, args)) = task.argv.split_first() else {
            return failed_result(task, cache_key, start, None, None, false, None);
        };

        if let Err(err) = std::fs::create_dir_all(&self.log_dir) {
            warn!(task_id = %task.id, %err, "failed to create log directory");
        }
        let stdout_log = self.log_dir.join(format!("{}.stdout.log", task.id));
        let stderr_log = self.log_dir.join(format!("{}.stderr.log", task.id));

        let stdout_file = File::create(&stdout_log).ok();
        let stderr_file = File::create(&stderr_log).ok();

        let mut command = Command::new(exe);
        command
            .args(args)
            .current_dir(&self.repo_root)
            .stdin(Stdio::null());
        match stdout_file {
            Some(f) => {
                command.stdout(Stdio::from(f));
            }
            None => {
                command.stdout(Stdio::null());
            }
        }
        match stderr_file {
            Some(f) => {
                command.stderr(Stdio::from(f));
            }
            None => {
                command.stderr(Stdio::null());
            }
        }

        let relative_stdout = relative_log_path(&self.log_dir, &stdout_log);
        let relative_stderr = relative_log_path(&self.log_dir, &stderr_log);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(err) => {
                warn!(task_id = %task.id, %err, "failed to spawn task");
                return failed_result(
                    task,
                    cache_key,
                    start,
                    Some(relative_stdout),
                    Some(relative_stderr),
                    false,
                    None,
                );
            }
        };

        let wait = child.wait();
        let outcome = match task.timeout_s {
            Some(secs) => timeout(Duration::from_secs(secs), wait).await,
            None => Ok(wait.await),
        };
        let finished = Utc::now();
        let duration_ms = (finished - start).num_milliseconds().max(0) as u64;

        match outcome {
            Ok(Ok(status)) => {
                let exit_code = status.code();
                let passed = exit_code == Some(0);
                TaskResult {
                    task_id: task.id.clone(),
                    argv: task.argv.clone(),
                    exit_code,
                    passed,
                    allowed_to_fail: task.allow_fail,
                    deps_satisfied: true,
                    cache_key: cache_key.to_string(),
                    cache_state: CacheState::Miss,
                    started_at: start,
                    finished_at: finished,
                    duration_ms,
                    stdout_path: Some(relative_stdout),
                    stderr_path: Some(relative_stderr),
                    timed_out: false,
                }
            }
            Ok(Err(err)) => {
                warn!(task_id = %task.id, %err, "failed to wait on task process");
                failed_result(
                    task,
                    cache_key,
                    start,
                    Some(relative_stdout),
                    Some(relative_stderr),
                    false,
                    None,
                )
            }
            Err(_) => {
                if let Err(err) = child.start_kill() {
                    warn!(task_id = %task.id, %err, "failed to kill timed-out task");
                }
                TaskResult {
                    task_id: task.id.clone(),
                    argv: task.argv.clone(),
                    exit_code: None,
                    passed: false,
                    allowed_to_fail: task.allow_fail,
                    deps_satisfied: true,
                    cache_key: cache_key.to_string(),
                    cache_state: CacheState::Miss,
                    started_at: start,
                    finished_at: finished,
                    duration_ms,
                    stdout_path: Some(relative_stdout),
                    stderr_path: Some(relative_stderr),
                    timed_out: true,
                }
            }
        }
    }
}

fn relative_log_path(log_dir: &std::path::Path, full: &std::path::Path) -> String {
    full.strip_prefix(log_dir).unwrap_or(full).to_string_lossy().to_string()
}

#[allow(clippy::too_many_arguments)]
fn failed_result(
    task: &Task,
    cache_key: &str,
    start: chrono::DateTime<Utc>,
    stdout_path: Option<String>,
    stderr_path: Option<String>,
    timed_out: bool,
    exit_code: Option<i32>,
) -> TaskResult {
    TaskResult {
        task_id: task.id.clone(),
        argv: task.argv.clone(),
        exit_code,
        passed: false,
        allowed_to_fail: task.allow_fail,
        deps_satisfied: true,
        cache_key: cache_key.to_string(),
        cache_state: CacheState::Miss,
        started_at: start,
        finished_at: Utc::now(),
        duration_ms: 0,
        stdout_path,
        stderr_path,
        timed_out,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::NullRemoteBackend;
    use crate::services::state_store::StateStore;
    use tempfile::tempdir;

    fn task(id: &str, argv: &[&str], deps: &[&str]) -> Task {
        Task {
            id: id.to_string(),
            argv: argv.iter().map(|s| s.to_string()).collect(),
            deps: deps.iter().map(|s| s.to_string()).collect(),
            input_patterns: vec![],
            salt: String::new(),
            timeout_s: Some(5),
            allow_fail: false,
            resources: vec![],
        }
    }

    fn executor(repo: &std::path::Path) -> Executor {
        let cache_dir = tempdir().unwrap();
        let cache = Arc::new(TaskCache::new(
            StateStore::new(cache_dir.path()),
            Arc::new(NullRemoteBackend),
        ));
        let log_dir = tempdir().unwrap().into_path();
        Executor::new(4, cache, repo.to_path_buf(), log_dir)
    }

    fn find<'a>(results: &'a [TaskResult], id: &str) -> &'a TaskResult {
        results.iter().find(|t| t.task_id == id).unwrap()
    }

    #[tokio::test]
    async fn runs_tasks_in_dependency_order() {
        let repo = tempdir().unwrap();
        let mut dag = Dag::new();
        dag.add(task("a", &["true"], &[])).unwrap();
        dag.add(task("b", &["true"], &["a"])).unwrap();
        let order = dag.toposort().unwrap();

        let results = executor(repo.path()).execute(&dag, &order).await;
        assert!(find(&results, "a").passed);
        assert!(find(&results, "b").passed);
    }

    #[tokio::test]
    async fn failing_command_is_not_passed() {
        let repo = tempdir().unwrap();
        let mut dag = Dag::new();
        dag.add(task("fails", &["false"], &[])).unwrap();
        let order = dag.toposort().unwrap();

        let results = executor(repo.path()).execute(&dag, &order).await;
        let fails = find(&results, "fails");
        assert!(!fails.passed);
        assert_eq!(fails.exit_code, Some(1));
    }

    #[tokio::test]
    async fn allow_fail_task_is_not_masked_but_is_allowed() {
        let repo = tempdir().unwrap();
        let mut dag = Dag::new();
        let mut t = task("flaky", &["false"], &[]);
        t.allow_fail = true;
        dag.add(t).unwrap();
        let order = dag.toposort().unwrap();

        let results = executor(repo.path()).execute(&dag, &order).await;
        let flaky = find(&results, "flaky");
        assert!(!flaky.passed);
        assert!(flaky.allowed_to_fail);
    }

    #[tokio::test]
    async fn timeout_kills_the_process_and_marks_timed_out() {
        let repo = tempdir().unwrap();
        let mut dag = Dag::new();
        let mut t = task("slow", &["sleep", "5"], &[]);
        t.timeout_s = Some(1);
        dag.add(t).unwrap();
        let order = dag.toposort().unwrap();

        let results = executor(repo.path()).execute(&dag, &order).await;
        let slow = find(&results, "slow");
        assert!(slow.timed_out);
        assert!(!slow.passed);
    }

    #[tokio::test]
    async fn dependent_of_a_failed_blocking_task_is_skipped_not_spawned() {
        let repo = tempdir().unwrap();
        let mut dag = Dag::new();
        dag.add(task("a", &["false"], &[])).unwrap();
        dag.add(task("b", &["true"], &["a"])).unwrap();
        let order = dag.toposort().unwrap();

        let results = executor(repo.path()).execute(&dag, &order).await;
        let b = find(&results, "b");
        assert_eq!(b.cache_state, CacheState::SkippedDepFail);
        assert_eq!(b.exit_code, Some(125));
        assert!(!b.deps_satisfied);
        assert!(!b.passed);
    }

    #[tokio::test]
    async fn dependent_of_an_allow_fail_dep_still_runs() {
        let repo = tempdir().unwrap();
        let mut dag = Dag::new();
        let mut a = task("a", &["false"], &[]);
        a.allow_fail = true;
        dag.add(a).unwrap();
        dag.add(task("b", &["true"], &["a"])).unwrap();
        let order = dag.toposort().unwrap();

        let results = executor(repo.path()).execute(&dag, &order).await;
        let b = find(&results, "b");
        assert_ne!(b.cache_state, CacheState::SkippedDepFail);
        assert!(b.passed);
    }

    #[tokio::test]
    async fn changed_only_projection_does_not_stall_on_excluded_deps() {
        // "a" is excluded from `order` (as happens under a changed-only
        // run scoped to "mypy" when "ruff" is unchanged); "mypy" must
        // still become ready since its dependency isn't part of this run.
        let repo = tempdir().unwrap();
        let mut dag = Dag::new();
        dag.add(task("a", &["true"], &[])).unwrap();
        dag.add(task("b", &["true"], &["a"])).unwrap();
        let order = vec!["b".to_string()];

        let results = executor(repo.path()).execute(&dag, &order).await;
        assert_eq!(results.len(), 1);
        assert!(find(&results, "b").passed);
    }
}
