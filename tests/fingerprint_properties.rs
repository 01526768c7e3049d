//! Property tests for the repository fingerprinter: determinism and
//! sensitivity to content changes, independent of any particular file tree.

use proptest::prelude::*;
use std::fs;
use tempfile::tempdir;

use firsttry::services::fingerprint::Fingerprinter;

fn arb_file_contents() -> impl Strategy<Value = Vec<(String, Vec<u8>)>> {
    prop::collection::vec(
        ("[a-z]{1,8}\\.py", prop::collection::vec(any::<u8>(), 0..64)),
        1..6,
    )
}

proptest! {
    #[test]
    fn fingerprint_is_deterministic_for_a_fixed_tree(files in arb_file_contents()) {
        let dir = tempdir().unwrap();
        for (name, bytes) in &files {
            fs::write(dir.path().join(name), bytes).unwrap();
        }
        let fp = Fingerprinter::new();
        let patterns = vec!["**/*.py".to_string()];
        let a = fp.fingerprint(dir.path(), &patterns, "").unwrap();
        let b = fp.fingerprint(dir.path(), &patterns, "").unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn appending_a_byte_to_any_matched_file_changes_the_fingerprint(
        files in arb_file_contents(),
        extra_byte in any::<u8>(),
    ) {
        let dir = tempdir().unwrap();
        for (name, bytes) in &files {
            fs::write(dir.path().join(name), bytes).unwrap();
        }
        let fp = Fingerprinter::new();
        let patterns = vec!["**/*.py".to_string()];
        let before = fp.fingerprint(dir.path(), &patterns, "").unwrap();

        let (first_name, first_bytes) = &files[0];
        let mut mutated = first_bytes.clone();
        mutated.push(extra_byte);
        fs::write(dir.path().join(first_name), &mutated).unwrap();

        let after = fp.fingerprint(dir.path(), &patterns, "").unwrap();
        prop_assert_ne!(before, after);
    }
}
