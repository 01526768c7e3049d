//! Remote cache backend seam.
//!
//! A remote backend lets a task cache hit be shared across machines (e.g. a
//! CI shard and a developer's laptop). It is always optional and always
//! best-effort: failures here are logged and treated as a miss, never as a
//! reason to fail a task or a run.

use async_trait::async_trait;

use crate::domain::error::RemoteBackendError;

/// A content-addressed blob store keyed by cache key.
#[async_trait]
pub trait RemoteCacheBackend: Send + Sync {
    /// Fetch a previously stored task result payload, if present.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, RemoteBackendError>;

    /// Store a task result payload under `key`.
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), RemoteBackendError>;
}

/// A backend that never has anything cached. The default when no
/// `remote_cache_url` is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRemoteBackend;

#[async_trait]
impl RemoteCacheBackend for NullRemoteBackend {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, RemoteBackendError> {
        Ok(None)
    }

    async fn put(&self, _key: &str, _value: &[u8]) -> Result<(), RemoteBackendError> {
        Ok(())
    }
}
