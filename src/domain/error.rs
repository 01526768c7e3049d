//! Error taxonomy for the firsttry verification engine.
//!
//! Plan-time errors (`PlanError`, and the `FingerprintError::RootUnreadable`
//! case) abort `run()` before any task executes and produce no partial
//! `RunReport`. Execution-time failures (spawn errors, timeouts) are never
//! represented here -- they are captured as `TaskResult` fields so the run
//! always produces a report. Cache errors are always recovered from; the
//! engine behaves as if the cache entry were absent.

use thiserror::Error;

/// Top-level error returned by plan-time failures in [`crate::services::orchestrator::run`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// The repository root could not be walked.
    #[error("failed to fingerprint repository: {0}")]
    Fingerprint(#[from] FingerprintError),

    /// The planner produced an invalid DAG or configuration.
    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// Errors raised while computing a repository fingerprint.
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// The repository root is unreadable (e.g. permission denied walking
    /// the root itself). Individual missing/unreadable files under the
    /// include-set are tolerated and simply skipped; this variant is
    /// reserved for the fatal, whole-repo case.
    #[error("cannot read repository root {path}: {source}")]
    RootUnreadable {
        /// The path that could not be read.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while planning the task DAG, all fatal at plan time.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum PlanError {
    /// A dependency cycle was detected. Names at least one task on the cycle.
    #[error("dependency cycle detected, involving task {0:?}")]
    Cycle(String),

    /// A task id was inserted twice into the same DAG.
    #[error("duplicate task id: {0}")]
    DuplicateTaskId(String),

    /// A task declared a dependency on an id that does not exist in the DAG.
    #[error("task {task} declares unknown dependency {dep}")]
    UnknownDep {
        /// The task that declared the bad dependency.
        task: String,
        /// The dependency id that does not exist.
        dep: String,
    },

    /// A check id has no built-in default and no configured argv override.
    #[error("task {0} has no built-in default and no configured command")]
    UnconfiguredTask(String),
}

/// Non-fatal cache errors. Logged at `warn` and treated as a miss on read,
/// dropped silently on write -- caching is an optimization, never a
/// correctness requirement.
#[derive(Debug, Error)]
pub enum CacheIoError {
    /// The store could not read or write a file (permission error, disk
    /// full, or similar).
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path the store tried to access.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file existed and was readable but did not parse as the expected
    /// JSON shape.
    #[error("cache entry at {path} is malformed: {source}")]
    Malformed {
        /// The path of the malformed entry.
        path: String,
        /// The underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from an optional remote cache backend. Always non-fatal: `get`
/// failures are treated as misses, `put` failures are logged warnings.
#[derive(Debug, Error)]
pub enum RemoteBackendError {
    /// The backend could not be reached, timed out, or returned an error.
    #[error("remote cache backend error: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_error_cycle_display_names_task() {
        let err = PlanError::Cycle("mypy".to_string());
        assert!(err.to_string().contains("mypy"));
    }

    #[test]
    fn plan_error_unknown_dep_display() {
        let err = PlanError::UnknownDep {
            task: "pytest".to_string(),
            dep: "ghost".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "task pytest declares unknown dependency ghost"
        );
    }

    #[test]
    fn plan_error_equality() {
        let a = PlanError::DuplicateTaskId("ruff".to_string());
        let b = PlanError::DuplicateTaskId("ruff".to_string());
        assert_eq!(a, b);
        assert_ne!(a, PlanError::DuplicateTaskId("mypy".to_string()));
    }
}

