//! The `hash` pipeline: walk, hash on the worker pool, upsert.
//!
//! Workers only compute digests. The driving task owns the `HashStore` and applies
//! every upsert itself, so the index has a single writer for the whole run.

use crate::concurrency::WorkerPool;
use crate::error::{ApiError, FileIoError};
use crate::report::ItemFailure;
use crate::store::{FileRecord, HashStore, UpsertOutcome};
use crate::tree::hasher::{self, FileDigest};
use crate::tree::path;
use crate::tree::walker::Walker;
use crate::types::now_millis;
use futures::stream::{BoxStream, StreamExt};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

type HashItem = Result<(PathBuf, FileDigest), ItemFailure>;
type HashStream = BoxStream<'static, Result<HashItem, ApiError>>;

/// Outcome of one `hash` run.
#[derive(Debug, Default, Clone)]
pub struct HashReport {
    /// Records written this run, in walk order
    pub records: Vec<FileRecord>,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failures: Vec<ItemFailure>,
}

impl HashReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Hashes trees into a `HashStore`.
#[derive(Debug, Clone)]
pub struct Indexer {
    pool: WorkerPool,
    buffer_size: usize,
}

impl Indexer {
    pub fn new(pool: WorkerPool, buffer_size: usize) -> Self {
        Self { pool, buffer_size }
    }

    /// Hash every file under the walker's root and upsert it into `store`.
    ///
    /// The store's own index file is skipped when it lies under the root. Per-file
    /// failures are collected in the report. The store is not saved here; callers
    /// decide whether to persist (e.g. not on a dry run).
    pub async fn hash_tree(
        &self,
        store: &mut HashStore,
        walker: &Walker,
    ) -> Result<HashReport, ApiError> {
        let started = Instant::now();
        let canonical_base = path::canonicalize_path(store.base())?;
        let canonical_root = path::canonicalize_path(walker.root())?;
        info!(root = %canonical_root.display(), workers = self.pool.size(), "Hashing tree");

        let buffer_size = self.buffer_size;
        let index_file = path::canonicalize_lenient(store.path());
        let files = walker
            .rooted_at(canonical_root)
            .files()
            .filter(move |item| !matches!(item, Ok(file) if file.path == index_file));
        let results = self.pool.map_ordered(files, move |item| -> HashItem {
            let file = item.map_err(|e| ItemFailure::new("<walk>", e))?;
            digest_of(file.path, buffer_size)
        });

        let report = Self::apply(store, &canonical_base, results).await?;
        info!(
            hashed = report.records.len(),
            inserted = report.inserted,
            updated = report.updated,
            failed = report.failures.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Hash run complete"
        );
        Ok(report)
    }

    /// Hash an explicit list of files (e.g. ones just written by copy or
    /// download) and upsert them into `store`.
    pub async fn hash_files(
        &self,
        store: &mut HashStore,
        files: Vec<PathBuf>,
    ) -> Result<HashReport, ApiError> {
        let canonical_base = path::canonicalize_path(store.base())?;
        debug!(files = files.len(), "Recording files");

        let buffer_size = self.buffer_size;
        let results = self.pool.map_ordered(files, move |file| -> HashItem {
            let canonical = path::canonicalize_path(&file)
                .map_err(|e| ItemFailure::new(file.display().to_string(), e))?;
            digest_of(canonical, buffer_size)
        });

        let report = Self::apply(store, &canonical_base, results).await?;
        info!(
            recorded = report.records.len(),
            failed = report.failures.len(),
            "Recorded files in index"
        );
        Ok(report)
    }

    /// Single writer: apply worker results to the store in order.
    async fn apply(
        store: &mut HashStore,
        canonical_base: &Path,
        mut results: HashStream,
    ) -> Result<HashReport, ApiError> {
        let mut report = HashReport::default();
        while let Some(result) = results.next().await {
            match result? {
                Ok((file_path, digest)) => {
                    let record = Self::record_for(canonical_base, file_path, digest);
                    debug!(path = %record.path, size = record.size_bytes, "Hashed file");
                    match store.upsert(record.clone()) {
                        UpsertOutcome::Inserted => report.inserted += 1,
                        UpsertOutcome::Updated => report.updated += 1,
                        UpsertOutcome::Unchanged => report.unchanged += 1,
                    }
                    report.records.push(record);
                }
                Err(failure) => {
                    warn!(
                        item = %failure.item,
                        error = %failure.error,
                        "Failed to hash file, skipping"
                    );
                    report.failures.push(failure);
                }
            }
        }
        Ok(report)
    }

    fn record_for(canonical_base: &Path, file: PathBuf, digest: FileDigest) -> FileRecord {
        FileRecord::new(
            path::key_under(canonical_base, &file),
            digest.hash,
            digest.size,
            now_millis(),
        )
    }
}

fn digest_of(file: PathBuf, buffer_size: usize) -> HashItem {
    match hasher::hash_file(&file, buffer_size) {
        Ok(digest) => Ok((file, digest)),
        Err(e) => {
            let item = file.display().to_string();
            Err(ItemFailure::new(item, FileIoError::new(file, e)))
        }
    }
}
