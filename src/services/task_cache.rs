//! Per-task cache: computes a task's cache key from its argv, salt, and
//! input files, and looks up/stores results locally first, remote second.

use std::path::Path;
use std::sync::Arc;

use tracing::warn;
use walkdir::WalkDir;

use crate::domain::models::{CacheState, Task, TaskResult};
use crate::domain::ports::RemoteCacheBackend;
use crate::services::state_store::StateStore;

/// Looks up and stores per-task results, content-addressed by a key derived
/// from the task's argv, salt, and the bytes of every file its
/// `input_patterns` match.
pub struct TaskCache {
    store: StateStore,
    remote: Arc<dyn RemoteCacheBackend>,
}

impl TaskCache {
    /// Build a cache backed by `store` for local hits and `remote` for
    /// cross-machine hits.
    pub fn new(store: StateStore, remote: Arc<dyn RemoteCacheBackend>) -> Self {
        Self { store, remote }
    }

    /// Compute the cache key for `task` given the current state of the
    /// repository at `repo_root`.
    ///
    /// A file matched by `input_patterns` that does not exist on disk is
    /// folded in as a zero-length marker rather than skipped, so deleting a
    /// previously-present input file changes the key exactly like editing
    /// it would.
    pub fn cache_key(&self, task: &Task, repo_root: &Path) -> String {
        let mut hasher = blake3::Hasher::new();
        for arg in &task.argv {
            hasher.update(arg.as_bytes());
            hasher.update(b"\0");
        }
        hasher.update(task.salt.as_bytes());
        hasher.update(b"\x1f");

        let globs: Vec<glob::Pattern> = task
            .input_patterns
            .iter()
            .filter_map(|p| glob::Pattern::new(p).ok())
            .collect();

        let mut matched: Vec<String> = WalkDir::new(repo_root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let rel = entry.path().strip_prefix(repo_root).ok()?;
                let rel_str = rel.to_string_lossy().replace('\\', "/");
                globs.iter().any(|g| g.matches(&rel_str)).then_some(rel_str)
            })
            .collect();
        matched.sort();

        for rel in &matched {
            hasher.update(rel.as_bytes());
            hasher.update(b"\0");
            match std::fs::read(repo_root.join(rel)) {
                Ok(bytes) => {
                    hasher.update(&(bytes.len() as u64).to_le_bytes());
                    hasher.update(&bytes);
                }
                Err(_) => hasher.update(&0u64.to_le_bytes()),
            }
            hasher.update(b"\x1e");
        }

        hex::encode(&hasher.finalize().as_bytes()[..16])
    }

    fn relative_path(task_id: &str, key: &str) -> String {
        format!("tasks/{task_id}/{key}.json")
    }

    /// Look up a cached result, trying the local store before the remote
    /// backend. A remote hit is written through to the local store so the
    /// next lookup is local.
    pub async fn get(&self, task_id: &str, key: &str) -> Option<TaskResult> {
        let path = Self::relative_path(task_id, key);
        if let Some(result) = self.store.read_tolerant::<TaskResult>(&path) {
            return Some(TaskResult {
                cache_state: CacheState::LocalHit,
                ..result
            });
        }

        match self.remote.get(&path).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<TaskResult>(&bytes) {
                Ok(result) => {
                    let hit = TaskResult {
                        cache_state: CacheState::RemoteHit,
                        ..result
                    };
                    if let Err(err) = self.store.write_atomic(&path, &hit) {
                        warn!(task_id, %err, "failed to write through remote cache hit");
                    }
                    Some(hit)
                }
                Err(err) => {
                    warn!(task_id, %err, "remote cache entry was malformed, treating as a miss");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(task_id, %err, "remote cache backend unavailable, treating as a miss");
                None
            }
        }
    }

    /// Store a fresh result locally and, best-effort, in the remote backend.
    pub async fn put(&self, task_id: &str, key: &str, result: &TaskResult) {
        let path = Self::relative_path(task_id, key);
        if let Err(err) = self.store.write_atomic(&path, result) {
            warn!(task_id, %err, "failed to persist task cache entry");
            return;
        }
        if let Ok(bytes) = serde_json::to_vec(result) {
            if let Err(err) = self.remote.put(&path, &bytes).await {
                warn!(task_id, %err, "failed to write task result to remote cache");
            }
        }
    }
}
