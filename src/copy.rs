//! Tree copy with optional gzip output.
//!
//! Each file streams through a buffered reader into a temp file next to its
//! destination and is renamed into place once complete. With an `ExistingPolicy`
//! other than `Overwrite`, a destination that already holds the same content is
//! left untouched.

use crate::compression::GzipCompression;
use crate::concurrency::WorkerPool;
use crate::error::{ApiError, FileIoError, StorageError};
use crate::report::ItemFailure;
use crate::tree::hasher;
use crate::tree::path;
use crate::tree::walker::{Walker, WalkerConfig};
use flate2::read::GzDecoder;
use futures::StreamExt;
use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// What to do when a destination file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExistingPolicy {
    /// Always rewrite the destination
    #[default]
    Overwrite,
    /// Keep the destination when its content digest equals the source's
    SkipIdentical,
    /// Keep the destination when its content length equals the source's
    SkipSameSize,
}

impl ExistingPolicy {
    /// `--skip-existing`, optionally narrowed to a size check by `--no-hash-existing`.
    pub fn from_flags(skip_existing: bool, size_only: bool) -> Self {
        match (skip_existing, size_only) {
            (false, _) => ExistingPolicy::Overwrite,
            (true, false) => ExistingPolicy::SkipIdentical,
            (true, true) => ExistingPolicy::SkipSameSize,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyOptions {
    pub compress: bool,
    pub level: u32,
    pub existing: ExistingPolicy,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            compress: false,
            level: crate::compression::DEFAULT_LEVEL,
            existing: ExistingPolicy::Overwrite,
        }
    }
}

/// One file written to the destination tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopiedFile {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Bytes read from the source
    pub bytes: u64,
}

#[derive(Debug, Default, Clone)]
pub struct CopyReport {
    pub copied: Vec<CopiedFile>,
    /// Existing `.gz` artifacts in the source tree
    pub skipped: Vec<PathBuf>,
    /// Destinations kept because they already held the source content
    pub unchanged: Vec<PathBuf>,
    pub failures: Vec<ItemFailure>,
}

impl CopyReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn bytes_copied(&self) -> u64 {
        self.copied.iter().map(|c| c.bytes).sum()
    }
}

type CopyOutcome = Result<CopyItem, ItemFailure>;

enum CopyItem {
    Copied(CopiedFile),
    Skipped(PathBuf),
    Unchanged(PathBuf),
}

/// Mirrors a source tree into a destination tree.
#[derive(Debug, Clone)]
pub struct Copier {
    pool: WorkerPool,
    buffer_size: usize,
    options: CopyOptions,
    walker_config: WalkerConfig,
}

impl Copier {
    pub fn new(pool: WorkerPool, buffer_size: usize, options: CopyOptions) -> Self {
        Self {
            pool,
            buffer_size,
            options,
            walker_config: WalkerConfig::default(),
        }
    }

    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Copy every file under `src_root` to the same relative path under `dst_root`.
    ///
    /// A missing source root, or a destination inside the source, fails the whole
    /// run. Per-file failures are collected and the remaining files still copy.
    pub async fn copy(&self, src_root: &Path, dst_root: &Path) -> Result<CopyReport, ApiError> {
        let started = Instant::now();
        let src = path::canonicalize_path(src_root)?;
        fs::create_dir_all(dst_root).map_err(|e| FileIoError::new(dst_root, e))?;
        let dst = path::canonicalize_path(dst_root)?;
        if dst.starts_with(&src) {
            return Err(StorageError::InvalidPath(format!(
                "Destination {} is inside source {}",
                dst.display(),
                src.display()
            ))
            .into());
        }

        let gzip = self
            .options
            .compress
            .then(|| GzipCompression::new(self.options.level));
        info!(
            source = %src.display(),
            destination = %dst.display(),
            compress = gzip.is_some(),
            existing = ?self.options.existing,
            "Copying tree"
        );

        let walker = Walker::with_config(src.clone(), self.walker_config.clone());
        let job = FileJob {
            gzip,
            existing: self.options.existing,
            buffer_size: self.buffer_size,
        };
        let mut outcomes = self.pool.map_ordered(walker.files(), move |item| -> CopyOutcome {
            let file = item.map_err(|e| ItemFailure::new("<walk>", e))?;
            job.copy_file(&src, &dst, &file.path)
        });

        let mut report = CopyReport::default();
        while let Some(outcome) = outcomes.next().await {
            match outcome? {
                Ok(CopyItem::Copied(copied)) => {
                    debug!(
                        source = %copied.source.display(),
                        destination = %copied.destination.display(),
                        bytes = copied.bytes,
                        "Copied file"
                    );
                    report.copied.push(copied);
                }
                Ok(CopyItem::Skipped(source)) => {
                    debug!(source = %source.display(), "Skipping compressed artifact");
                    report.skipped.push(source);
                }
                Ok(CopyItem::Unchanged(destination)) => {
                    debug!(destination = %destination.display(), "Destination already current");
                    report.unchanged.push(destination);
                }
                Err(failure) => {
                    warn!(item = %failure.item, error = %failure.error, "Failed to copy file");
                    report.failures.push(failure);
                }
            }
        }

        info!(
            copied = report.copied.len(),
            skipped = report.skipped.len(),
            unchanged = report.unchanged.len(),
            failed = report.failures.len(),
            bytes = report.bytes_copied(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Copy run complete"
        );
        Ok(report)
    }
}

/// Per-file settings shared by every worker.
#[derive(Debug, Clone, Copy)]
struct FileJob {
    gzip: Option<GzipCompression>,
    existing: ExistingPolicy,
    buffer_size: usize,
}

impl FileJob {
    fn copy_file(&self, src_root: &Path, dst_root: &Path, source: &Path) -> CopyOutcome {
        if GzipCompression::is_artifact(source) {
            return Ok(CopyItem::Skipped(source.to_path_buf()));
        }
        let failure = |e: FileIoError| ItemFailure::new(source.display().to_string(), e);

        let relative = source
            .strip_prefix(src_root)
            .map_err(|_| ItemFailure::new(source.display().to_string(), "outside source root"))?;
        let mirrored = dst_root.join(relative);
        let destination = match self.gzip {
            Some(g) => g.artifact_path(&mirrored),
            None => mirrored,
        };

        if self.destination_is_current(source, &destination).map_err(failure)? {
            return Ok(CopyItem::Unchanged(destination));
        }

        let bytes = write_atomically(source, &destination, self.gzip, self.buffer_size)
            .map_err(failure)?;
        Ok(CopyItem::Copied(CopiedFile {
            source: source.to_path_buf(),
            destination,
            bytes,
        }))
    }

    /// Whether `destination` already holds what copying `source` would produce.
    ///
    /// A compressed destination is compared by its decompressed content. A
    /// destination that cannot be read (or is not valid gzip) is rewritten.
    fn destination_is_current(
        &self,
        source: &Path,
        destination: &Path,
    ) -> Result<bool, FileIoError> {
        if self.existing == ExistingPolicy::Overwrite {
            return Ok(false);
        }
        match fs::metadata(destination) {
            Ok(meta) if meta.is_file() => {}
            _ => return Ok(false),
        }

        let source_size = fs::metadata(source)
            .map_err(|e| FileIoError::new(source, e))?
            .len();
        if self.gzip.is_none() && self.existing == ExistingPolicy::SkipSameSize {
            let existing_size = fs::metadata(destination).map(|m| m.len());
            return Ok(existing_size.map(|n| n == source_size).unwrap_or(false));
        }

        let existing = match self.existing_digest(destination) {
            Ok(digest) => digest,
            Err(e) => {
                debug!(
                    destination = %destination.display(),
                    error = %e,
                    "Existing file unreadable, rewriting"
                );
                return Ok(false);
            }
        };
        if existing.size != source_size {
            return Ok(false);
        }
        if self.existing == ExistingPolicy::SkipSameSize {
            return Ok(true);
        }
        let current = hasher::hash_file(source, self.buffer_size)
            .map_err(|e| FileIoError::new(source, e))?;
        Ok(current == existing)
    }

    fn existing_digest(&self, destination: &Path) -> io::Result<hasher::FileDigest> {
        let file = File::open(destination)?;
        match self.gzip {
            Some(_) => hasher::hash_reader(GzDecoder::new(file), self.buffer_size),
            None => hasher::hash_reader(file, self.buffer_size),
        }
    }
}

fn write_atomically(
    source: &Path,
    destination: &Path,
    gzip: Option<GzipCompression>,
    buffer_size: usize,
) -> Result<u64, FileIoError> {
    let parent = destination.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| FileIoError::new(parent, e))?;

    let input = File::open(source).map_err(|e| FileIoError::new(source, e))?;
    let mut reader = BufReader::with_capacity(buffer_size.max(1), input);
    let mut temp = NamedTempFile::new_in(parent).map_err(|e| FileIoError::new(parent, e))?;

    let bytes = match gzip {
        Some(g) => {
            let mut encoder = g.wrap(temp.as_file_mut());
            let n = io::copy(&mut reader, &mut encoder).map_err(|e| FileIoError::new(source, e))?;
            encoder
                .finish()
                .and_then(|f| f.flush())
                .map_err(|e| FileIoError::new(destination, e))?;
            n
        }
        None => io::copy(&mut reader, temp.as_file_mut()).map_err(|e| FileIoError::new(source, e))?,
    };
    temp.as_file()
        .sync_all()
        .map_err(|e| FileIoError::new(destination, e))?;
    temp.persist(destination)
        .map_err(|e| FileIoError::new(destination, e.error))?;
    Ok(bytes)
}
