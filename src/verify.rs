//! Drift detection against a loaded `HashStore`.
//!
//! Every stored path is re-hashed on the worker pool and classified. The driving
//! task applies `last_seen` refreshes itself; mismatched records are left alone so
//! the drift stays visible on the next run.

use crate::concurrency::WorkerPool;
use crate::error::ApiError;
use crate::store::HashStore;
use crate::tree::hasher;
use crate::tree::path;
use crate::tree::walker::Walker;
use crate::types::{hash_to_hex, now_millis, Hash};
use futures::StreamExt;
use serde::{Serialize, Serializer};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Match,
    Mismatch,
    /// Tracked, but no longer on disk
    Missing,
    /// On disk, but not tracked
    Untracked,
    /// Present, but could not be read
    Unreadable,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Match => "match",
            VerificationStatus::Mismatch => "mismatch",
            VerificationStatus::Missing => "missing",
            VerificationStatus::Untracked => "untracked",
            VerificationStatus::Unreadable => "unreadable",
        }
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verification outcome for one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    pub path: String,
    pub status: VerificationStatus,
    #[serde(rename = "stored", serialize_with = "hex_opt")]
    pub stored_hash: Option<Hash>,
    #[serde(rename = "current", serialize_with = "hex_opt")]
    pub current_hash: Option<Hash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VerificationResult {
    fn tracked(path: String, stored: Hash, file: &Path, outcome: io::Result<Hash>) -> Self {
        let (status, current_hash, error) = match outcome {
            Ok(current) if current == stored => (VerificationStatus::Match, Some(current), None),
            Ok(current) => (VerificationStatus::Mismatch, Some(current), None),
            Err(e) if no_longer_exists(file, &e) => (VerificationStatus::Missing, None, None),
            Err(e) => (VerificationStatus::Unreadable, None, Some(e.to_string())),
        };
        Self {
            path,
            status,
            stored_hash: Some(stored),
            current_hash,
            error,
        }
    }

    fn untracked(path: String) -> Self {
        Self {
            path,
            status: VerificationStatus::Untracked,
            stored_hash: None,
            current_hash: None,
            error: None,
        }
    }
}

/// Absent, or an ancestor directory has been replaced by something else.
fn no_longer_exists(file: &Path, error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::NotFound
        || file
            .ancestors()
            .skip(1)
            .any(|dir| dir.metadata().map(|m| !m.is_dir()).unwrap_or(false))
}

fn hex_opt<S: Serializer>(hash: &Option<Hash>, serializer: S) -> Result<S::Ok, S::Error> {
    match hash {
        Some(h) => serializer.serialize_some(&hash_to_hex(h)),
        None => serializer.serialize_none(),
    }
}

/// Outcome of one `verify` run, in store key order followed by untracked paths.
#[derive(Debug, Default, Clone)]
pub struct VerifyReport {
    pub results: Vec<VerificationResult>,
}

impl VerifyReport {
    pub fn count(&self, status: VerificationStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    /// Results that are not a clean match.
    pub fn mismatches(&self) -> impl Iterator<Item = &VerificationResult> + '_ {
        HashStore::query_mismatches_only(&self.results)
    }

    /// False when any file could not be read. Drift alone is a finding, not a failure.
    pub fn is_success(&self) -> bool {
        self.count(VerificationStatus::Unreadable) == 0
    }
}

/// Re-hashes stored paths and classifies drift.
#[derive(Debug, Clone)]
pub struct Verifier {
    pool: WorkerPool,
    buffer_size: usize,
}

impl Verifier {
    pub fn new(pool: WorkerPool, buffer_size: usize) -> Self {
        Self { pool, buffer_size }
    }

    /// Verify every record in `store`.
    ///
    /// With `untracked_root`, files under that root with no stored record are
    /// reported as `Untracked`. Matches refresh `last_seen` in the store; the caller
    /// decides whether to save.
    pub async fn verify(
        &self,
        store: &mut HashStore,
        untracked_root: Option<&Walker>,
    ) -> Result<VerifyReport, ApiError> {
        let started = Instant::now();
        info!(records = store.len(), workers = self.pool.size(), "Verifying store");

        let tracked: Vec<(String, PathBuf, Hash)> = store
            .query_all()
            .map(|r| (r.path.clone(), store.resolve(&r.path), r.content_hash))
            .collect();

        let buffer_size = self.buffer_size;
        let mut outcomes = self.pool.map_ordered(tracked, move |(key, file, stored)| {
            let outcome = hasher::hash_file(&file, buffer_size).map(|d| d.hash);
            VerificationResult::tracked(key, stored, &file, outcome)
        });

        let mut report = VerifyReport::default();
        let seen_at = now_millis();
        while let Some(result) = outcomes.next().await {
            let result = result?;
            match result.status {
                VerificationStatus::Match => {
                    store.touch(&result.path, seen_at);
                }
                VerificationStatus::Unreadable => {
                    warn!(
                        path = %result.path,
                        error = result.error.as_deref().unwrap_or_default(),
                        "Failed to read tracked file"
                    );
                }
                status => debug!(path = %result.path, %status, "Drift detected"),
            }
            report.results.push(result);
        }

        if let Some(walker) = untracked_root {
            let untracked = self.scan_untracked(store, walker).await?;
            report.results.extend(untracked);
        }

        info!(
            checked = report.results.len(),
            matched = report.count(VerificationStatus::Match),
            mismatched = report.count(VerificationStatus::Mismatch),
            missing = report.count(VerificationStatus::Missing),
            untracked = report.count(VerificationStatus::Untracked),
            unreadable = report.count(VerificationStatus::Unreadable),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Verify run complete"
        );
        Ok(report)
    }

    async fn scan_untracked(
        &self,
        store: &HashStore,
        walker: &Walker,
    ) -> Result<Vec<VerificationResult>, ApiError> {
        let canonical_base = path::canonicalize_path(store.base())?;
        let walker = walker.rooted_at(path::canonicalize_path(walker.root())?);
        let root_display = walker.root().display().to_string();
        let index_file = path::canonicalize_lenient(store.path());
        let entries = tokio::task::spawn_blocking(move || {
            walker
                .files()
                .filter(|item| !matches!(item, Ok(file) if file.path == index_file))
                .collect::<Vec<_>>()
        })
        .await?;

        let mut results = Vec::new();
        for entry in entries {
            match entry {
                Ok(file) => {
                    let key = path::key_under(&canonical_base, &file.path);
                    if !store.contains(&key) {
                        results.push(VerificationResult::untracked(key));
                    }
                }
                Err(e) => {
                    warn!(root = %root_display, error = %e, "Walk error during untracked scan");
                    results.push(VerificationResult {
                        path: root_display.clone(),
                        status: VerificationStatus::Unreadable,
                        stored_hash: None,
                        current_hash: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }
        Ok(results)
    }
}
