//! Repository fingerprinting: a single BLAKE3 digest over every file that
//! matches the union of all tasks' `input_patterns`, used by the
//! orchestrator's zero-run fast path to detect "nothing changed".

use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::domain::error::FingerprintError;

/// Computes whole-repository content fingerprints from glob patterns.
#[derive(Debug, Default)]
pub struct Fingerprinter;

impl Fingerprinter {
    /// Create a fingerprinter.
    pub fn new() -> Self {
        Self
    }

    /// Hash every file under `repo_root` whose path (relative to the root,
    /// using forward slashes) matches any of `patterns`, in sorted path
    /// order, folding in `salt`.
    ///
    /// Missing or unreadable individual files are skipped; only a failure
    /// to read the repository root itself is fatal.
    pub fn fingerprint(
        &self,
        repo_root: &Path,
        patterns: &[String],
        salt: &str,
    ) -> Result<String, FingerprintError> {
        if let Err(source) = fs::read_dir(repo_root) {
            return Err(FingerprintError::RootUnreadable {
                path: repo_root.display().to_string(),
                source,
            });
        }

        let globs: Vec<glob::Pattern> = patterns
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
                globs
                    .iter()
                    .any(|g| g.matches(&rel_str))
                    .then_some(rel_str)
            })
            .collect();
        matched.sort();

        let mut hasher = blake3::Hasher::new();
        hasher.update(salt.as_bytes());
        hasher.update(b"\0");

        for rel in &matched {
            hasher.update(rel.as_bytes());
            hasher.update(b"\0");
            match fs::read(repo_root.join(rel)) {
                Ok(bytes) => {
                    hasher.update(&(bytes.len() as u64).to_le_bytes());
                    hasher.update(&bytes);
                }
                Err(_) => hasher.update(&0u64.to_le_bytes()),
            }
            hasher.update(b"\x1e");
        }

        let digest = hasher.finalize();
        Ok(hex::encode(&digest.as_bytes()[..16]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn identical_trees_produce_identical_fingerprints() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.py"), b"print(1)\n").unwrap();
        let fp = Fingerprinter::new();
        let patterns = vec!["**/*.py".to_string()];
        let a = fp.fingerprint(dir.path(), &patterns, "").unwrap();
        let b = fp.fingerprint(dir.path(), &patterns, "").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn changing_a_matched_file_changes_the_fingerprint() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.py");
        fs::write(&file, b"print(1)\n").unwrap();
        let fp = Fingerprinter::new();
        let patterns = vec!["**/*.py".to_string()];
        let before = fp.fingerprint(dir.path(), &patterns, "").unwrap();
        fs::write(&file, b"print(2)\n").unwrap();
        let after = fp.fingerprint(dir.path(), &patterns, "").unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn unmatched_files_do_not_affect_the_fingerprint() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.py"), b"print(1)\n").unwrap();
        let fp = Fingerprinter::new();
        let patterns = vec!["**/*.py".to_string()];
        let before = fp.fingerprint(dir.path(), &patterns, "").unwrap();
        fs::write(dir.path().join("notes.txt"), b"irrelevant").unwrap();
        let after = fp.fingerprint(dir.path(), &patterns, "").unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn different_salt_changes_the_fingerprint() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.py"), b"print(1)\n").unwrap();
        let fp = Fingerprinter::new();
        let patterns = vec!["**/*.py".to_string()];
        let a = fp.fingerprint(dir.path(), &patterns, "v1").unwrap();
        let b = fp.fingerprint(dir.path(), &patterns, "v2").unwrap();
        assert_ne!(a, b);
    }
}
