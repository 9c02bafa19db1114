//! Hash Store
//!
//! Persisted mapping from canonical relative path to `FileRecord`. Owns its own
//! load/save lifecycle; there is no process-wide index.

pub mod persistence;

use crate::error::StorageError;
use crate::tree::path;
use crate::types::Hash;
use crate::verify::{VerificationResult, VerificationStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory holding the index, relative to the working directory.
pub const STORE_DIR_NAME: &str = ".hasher";

/// Index file name inside `STORE_DIR_NAME`.
pub const INDEX_FILE_NAME: &str = "index.bin";

/// One tracked file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Canonical relative path; the store key
    pub path: String,
    pub content_hash: Hash,
    pub size_bytes: u64,
    /// Unix milliseconds of the last successful hash
    pub last_seen: u64,
}

impl FileRecord {
    pub fn new(path: String, content_hash: Hash, size_bytes: u64, last_seen: u64) -> Self {
        Self {
            path,
            content_hash,
            size_bytes,
            last_seen,
        }
    }

    /// Same path, digest and size, ignoring when it was observed.
    pub fn same_content(&self, other: &FileRecord) -> bool {
        self.path == other.path
            && self.content_hash == other.content_hash
            && self.size_bytes == other.size_bytes
    }
}

/// What an upsert did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    /// Digest or size changed
    Updated,
    /// Same content; only `last_seen` may have moved
    Unchanged,
}

/// In-memory index with an explicit persisted location.
#[derive(Debug, Clone)]
pub struct HashStore {
    path: PathBuf,
    base: PathBuf,
    records: BTreeMap<String, FileRecord>,
}

impl HashStore {
    /// Empty store that will persist to `path`; keys are relative to `base`.
    pub fn new(path: impl Into<PathBuf>, base: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            base: base.into(),
            records: BTreeMap::new(),
        }
    }

    /// Default index location for a working directory.
    pub fn default_path(workspace_root: &Path) -> PathBuf {
        workspace_root.join(STORE_DIR_NAME).join(INDEX_FILE_NAME)
    }

    /// Load the index at `path`.
    ///
    /// A missing file yields an empty store. A malformed file is `StoreCorrupt`;
    /// it is never silently replaced.
    pub fn load(path: impl Into<PathBuf>, base: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let mut store = Self::new(path, base);
        match persistence::read_index(&store.path)? {
            Some(records) => {
                for record in records {
                    if store.records.insert(record.path.clone(), record).is_some() {
                        return Err(StorageError::StoreCorrupt {
                            path: store.path.clone(),
                            reason: "duplicate path key".to_string(),
                        });
                    }
                }
                info!(
                    path = %store.path.display(),
                    records = store.records.len(),
                    "Loaded hash store"
                );
            }
            None => {
                debug!(path = %store.path.display(), "No hash store yet, starting empty");
            }
        }
        Ok(store)
    }

    /// Atomically persist the full index (temp file, fsync, rename).
    pub fn save(&self) -> Result<(), StorageError> {
        persistence::write_index(&self.path, self.records.values())?;
        info!(
            path = %self.path.display(),
            records = self.records.len(),
            "Saved hash store"
        );
        Ok(())
    }

    /// Insert or overwrite by path key.
    pub fn upsert(&mut self, record: FileRecord) -> UpsertOutcome {
        let outcome = match self.records.get(&record.path) {
            None => UpsertOutcome::Inserted,
            Some(existing) if existing.same_content(&record) => UpsertOutcome::Unchanged,
            Some(_) => UpsertOutcome::Updated,
        };
        self.records.insert(record.path.clone(), record);
        outcome
    }

    /// Refresh `last_seen` for a key whose content was re-confirmed.
    pub fn touch(&mut self, key: &str, seen_at: u64) -> bool {
        match self.records.get_mut(key) {
            Some(record) => {
                record.last_seen = seen_at;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&FileRecord> {
        self.records.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in key order.
    pub fn query_all(&self) -> impl Iterator<Item = &FileRecord> + '_ {
        self.records.values()
    }

    /// The subset of verification results that are not a clean match.
    pub fn query_mismatches_only(
        results: &[VerificationResult],
    ) -> impl Iterator<Item = &VerificationResult> + '_ {
        results
            .iter()
            .filter(|r| r.status != VerificationStatus::Match)
    }

    /// Persisted location of this index.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory keys are relative to.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Canonical key for a file on disk.
    pub fn key_for(&self, file: &Path) -> Result<String, StorageError> {
        path::path_key(&self.base, file)
    }

    /// Filesystem location of a stored key.
    pub fn resolve(&self, key: &str) -> PathBuf {
        path::resolve_key(&self.base, key)
    }
}
