//! Persists a completed run: the latest report, the latest green report
//! (for the fast path), and an append-only history log.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;

use tracing::warn;

use crate::domain::models::{OverallStatus, RunReport};
use crate::services::state_store::StateStore;

/// Write `report.json` and `last_run.json`, and append one line to
/// `history.jsonl`. When the run is green and `allow_green_writeback` is
/// set, also refresh `last_green_run.json` so the zero-run fast path can
/// find it. A changed-only run must not refresh the green cache: it only
/// verified a subset of tasks, so a pass there does not mean the whole
/// repository is green.
pub fn persist(store: &StateStore, report: &RunReport, allow_green_writeback: bool) {
    if let Err(err) = store.write_atomic("report.json", report) {
        warn!(%err, "failed to persist report.json");
    }
    if let Err(err) = store.write_atomic("last_run.json", report) {
        warn!(%err, "failed to persist last_run.json");
    }
    if allow_green_writeback && report.overall_status == OverallStatus::Pass {
        if let Err(err) = store.write_atomic("last_green_run.json", report) {
            warn!(%err, "failed to persist last_green_run.json");
        }
    }
    append_history(store.root(), report);
}

fn append_history(root: &Path, report: &RunReport) {
    let path = root.join("history.jsonl");
    let line = match serde_json::to_string(report) {
        Ok(line) => line,
        Err(err) => {
            warn!(%err, "failed to serialize report for history log");
            return;
        }
    };
    let result = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .and_then(|mut file| writeln!(file, "{line}"));
    if let Err(err) = result {
        warn!(%err, path = %path.display(), "failed to append to history log");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::CacheState;
    use chrono::Utc;
    use std::fs;
    use tempfile::tempdir;

    fn report(status: OverallStatus) -> RunReport {
        let now = Utc::now();
        let tasks = vec![crate::domain::models::TaskResult {
            task_id: "ruff".to_string(),
            argv: vec!["ruff".to_string()],
            exit_code: Some(0),
            passed: true,
            allowed_to_fail: false,
            deps_satisfied: true,
            cache_key: "deadbeef".to_string(),
            cache_state: CacheState::Miss,
            started_at: now,
            finished_at: now,
            duration_ms: 1,
            stdout_path: None,
            stderr_path: None,
            timed_out: false,
        }];
        RunReport {
            fingerprint: "deadbeef".to_string(),
            schema_version: 1,
            started_at: now,
            finished_at: now,
            tasks,
            overall_status: status,
            verified_from_cache: false,
            duration_ms: 10,
        }
    }

    #[test]
    fn green_run_writes_all_three_files() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path());
        persist(&store, &report(OverallStatus::Pass), true);
        assert!(dir.path().join("report.json").exists());
        assert!(dir.path().join("last_run.json").exists());
        assert!(dir.path().join("last_green_run.json").exists());
        let history = fs::read_to_string(dir.path().join("history.jsonl")).unwrap();
        assert_eq!(history.lines().count(), 1);
    }

    #[test]
    fn red_run_does_not_touch_last_green_run() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path());
        persist(&store, &report(OverallStatus::Fail), true);
        assert!(!dir.path().join("last_green_run.json").exists());
    }

    #[test]
    fn green_run_with_writeback_disabled_does_not_touch_last_green_run() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path());
        persist(&store, &report(OverallStatus::Pass), false);
        assert!(!dir.path().join("last_green_run.json").exists());
    }

    #[test]
    fn history_accumulates_across_runs() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path());
        persist(&store, &report(OverallStatus::Pass), true);
        persist(&store, &report(OverallStatus::Fail), true);
        let history = fs::read_to_string(dir.path().join("history.jsonl")).unwrap();
        assert_eq!(history.lines().count(), 2);
    }
}
