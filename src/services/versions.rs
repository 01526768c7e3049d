//! Checker-binary version discovery, folded into the engine-level salt so a
//! checker upgrade invalidates every task's cache even though `argv` and
//! `input_patterns` did not change.

use std::collections::BTreeMap;

use tokio::process::Command;
use tracing::debug;

use crate::domain::models::Dag;

/// Resolve and run `--version` for the executable of every task in `dag`,
/// tolerating binaries that are missing or refuse `--version`.
///
/// Returns a stable, sorted-by-task-id string suitable for folding into a
/// fingerprint or cache-key salt.
pub async fn collect_checker_versions(dag: &Dag) -> String {
    let mut versions: BTreeMap<String, String> = BTreeMap::new();

    for task in dag.tasks() {
        let Some(exe) = task.argv.first() else {
            continue;
        };
        let version = resolve_version(exe).await;
        versions.insert(task.id.clone(), version.unwrap_or_default());
    }

    versions
        .into_iter()
        .map(|(id, version)| format!("{id}={version}"))
        .collect::<Vec<_>>()
        .join(";")
}

async fn resolve_version(exe: &str) -> Option<String> {
    let path = which::which(exe).ok()?;
    let output = Command::new(&path).arg("--version").output().await.ok()?;
    if !output.status.success() {
        debug!(exe, "checker --version exited non-zero, treating as unknown");
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout);
    Some(text.lines().next().unwrap_or_default().trim().to_string())
}
