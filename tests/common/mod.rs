//! Shared fixtures for integration tests.

use std::path::PathBuf;
use tempfile::TempDir;

/// Create a temporary directory for test isolation.
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("failed to create temp dir")
}

/// Initialize a test-scoped tracing subscriber. Safe to call from every
/// test; only the first call in a process takes effect.
#[allow(dead_code)]
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Poll `predicate` every 20ms until it returns true or `timeout_ms` elapses.
#[allow(dead_code)]
pub async fn wait_for<F>(mut predicate: F, timeout_ms: u64) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_millis(timeout_ms);
    while start.elapsed() < timeout {
        if predicate() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    false
}

/// Write a minimal Python-shaped file tree so default checks have matching
/// input files to fingerprint and cache against.
#[allow(dead_code)]
pub fn write_sample_repo(root: &std::path::Path) {
    std::fs::write(root.join("main.py"), b"print('hello')\n").unwrap();
}

#[allow(dead_code)]
pub fn temp_path(dir: &TempDir, name: &str) -> PathBuf {
    dir.path().join(name)
}
