//! Durable JSON state on disk: atomic writes, and reads that degrade to
//! "absent" rather than propagating an error.

use std::fs::{self, File};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::domain::error::CacheIoError;

/// Reads and writes JSON state files under a root directory.
#[derive(Debug, Clone)]
pub struct StateStore {
    root: PathBuf,
}

impl StateStore {
    /// Create a store rooted at `root`, which is created if missing.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory this store writes under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Serialize `value` as JSON and write it to `relative_path` atomically:
    /// write to a sibling temp file, `fsync`, then rename over the target.
    /// A reader never observes a partially written file.
    pub fn write_atomic<T: Serialize>(
        &self,
        relative_path: &str,
        value: &T,
    ) -> Result<(), CacheIoError> {
        let target = self.root.join(relative_path);
        let to_io_err = |source: std::io::Error| CacheIoError::Io {
            path: target.display().to_string(),
            source,
        };

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(to_io_err)?;
        }

        let tmp_path = target.with_extension(format!(
            "{}.tmp",
            target.extension().and_then(|e| e.to_str()).unwrap_or("json")
        ));

        let bytes = serde_json::to_vec_pretty(value).map_err(|source| CacheIoError::Malformed {
            path: target.display().to_string(),
            source,
        })?;

        {
            let mut file = File::create(&tmp_path).map_err(to_io_err)?;
            file.write_all(&bytes).map_err(to_io_err)?;
            file.sync_all().map_err(to_io_err)?;
        }

        fs::rename(&tmp_path, &target).map_err(to_io_err)?;
        Ok(())
    }

    /// Read and deserialize `relative_path`. Returns `Ok(None)` on a missing
    /// file, an I/O error, or malformed JSON -- every failure mode here is
    /// tolerated as a cache miss. The caller should log at `warn` when this
    /// distinction matters; the error is discarded because recovery is
    /// identical in every case.
    pub fn read_tolerant<T: DeserializeOwned>(&self, relative_path: &str) -> Option<T> {
        let target = self.root.join(relative_path);
        let bytes = fs::read(target).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}
