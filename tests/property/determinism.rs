//! Property-based tests for determinism guarantees

use ::hasher::download::map_url;
use ::hasher::store::{FileRecord, HashStore};
use ::hasher::tree::hasher;
use ::hasher::tree::path::normalize_path_string;
use proptest::prelude::*;
use std::io::Cursor;
use std::path::Component;
use tempfile::TempDir;

/// Test that content hashing is deterministic
#[test]
fn test_content_hash_determinism_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(any::<Vec<u8>>(), any::<Vec<u8>>()),
            |(content1, content2)| {
                let hash1 = hasher::compute_content_hash(&content1);
                let hash2 = hasher::compute_content_hash(&content2);

                if content1 == content2 {
                    assert_eq!(hash1, hash2);
                } else {
                    // Collisions are possible in theory only
                    prop_assume!(hash1 != hash2);
                }

                Ok(())
            },
        )
        .unwrap();
}

proptest! {
    /// The streamed digest does not depend on the read buffer size
    #[test]
    fn streamed_digest_ignores_buffer_size(
        content in proptest::collection::vec(any::<u8>(), 0..4096),
        buffer in 1usize..512,
    ) {
        let digest = hasher::hash_reader(Cursor::new(&content), buffer).unwrap();
        prop_assert_eq!(digest.hash, hasher::compute_content_hash(&content));
        prop_assert_eq!(digest.size, content.len() as u64);
    }

    /// Normalizing a key twice changes nothing
    #[test]
    fn key_normalization_is_idempotent(raw in "[a-zA-Z0-9_./\\\\é ]{0,40}") {
        let once = normalize_path_string(&raw);
        prop_assert_eq!(normalize_path_string(&once), once.clone());
        prop_assert!(!once.contains('\\'));
    }

    /// Mirrored paths stay under the host directory, whatever the URL path holds
    #[test]
    fn mapped_urls_never_escape_the_root(
        segments in proptest::collection::vec("(\\.\\.|\\.|%2e%2e|[a-z0-9%]{1,8})", 0..6),
        trailing_slash in any::<bool>(),
    ) {
        let mut url = format!("https://example.com/{}", segments.join("/"));
        if trailing_slash {
            url.push('/');
        }
        let mapped = map_url(&url).unwrap();

        prop_assert_eq!(map_url(&url).unwrap(), mapped.clone());
        let components: Vec<Component> = mapped.components().collect();
        prop_assert!(components.len() >= 2);
        prop_assert_eq!(components[0], Component::Normal("example.com".as_ref()));
        prop_assert!(components.iter().all(|c| matches!(c, Component::Normal(_))));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Saving and reloading the index preserves every record exactly
    #[test]
    fn saved_index_reloads_identically(
        entries in proptest::collection::btree_map(
            "[a-z]{1,6}(/[a-z]{1,6}){0,2}",
            (any::<[u8; 32]>(), any::<u64>(), any::<u64>()),
            0..20,
        )
    ) {
        let temp = TempDir::new().unwrap();
        let index = temp.path().join("index.bin");
        let mut store = HashStore::new(&index, temp.path());
        for (path, (hash, size, seen)) in &entries {
            store.upsert(FileRecord::new(path.clone(), *hash, *size, *seen));
        }
        store.save().unwrap();

        let reloaded = HashStore::load(&index, temp.path()).unwrap();
        let before: Vec<&FileRecord> = store.query_all().collect();
        let after: Vec<&FileRecord> = reloaded.query_all().collect();
        prop_assert_eq!(before, after);
    }
}
