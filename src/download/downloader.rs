//! URL downloads into a mirrored directory tree.
//!
//! Per URL: `Pending -> SkippedExisting`, or `Pending -> Fetching -> Stored | Failed`.
//!
//! The async side pulls body chunks from the `Fetcher` and hands them over a bounded
//! channel to a blocking writer that owns the temp file. The writer only renames the
//! temp file into place after an explicit `Finish`; if the download task is dropped
//! (timeout, abort, error) the channel closes first and the temp file is discarded.

use crate::compression::GzipCompression;
use crate::download::fetch::Fetcher;
use crate::download::mapper;
use crate::error::{DownloadError, FileIoError};
use bytes::Bytes;
use futures::StreamExt;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_RETRY_COUNT: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

const WRITE_QUEUE_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadOptions {
    pub compress: bool,
    pub level: u32,
    /// Keep an existing destination file instead of replacing it
    pub no_clobber: bool,
    pub concurrency: usize,
    /// Deadline for one attempt, connect to last byte
    pub timeout: Duration,
    /// Extra attempts after the first, for retryable failures only
    pub retry_count: u32,
    pub retry_delay: Duration,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            compress: false,
            level: crate::compression::DEFAULT_LEVEL,
            no_clobber: false,
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            retry_count: DEFAULT_RETRY_COUNT,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Where a URL will be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    pub source_url: String,
    pub local_path: PathBuf,
    pub compressed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadState {
    Pending,
    Fetching,
    Stored,
    SkippedExisting,
    Failed,
}

impl DownloadState {
    pub fn is_success(&self) -> bool {
        matches!(self, DownloadState::Stored | DownloadState::SkippedExisting)
    }
}

/// Terminal result for one URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadOutcome {
    pub url: String,
    pub state: DownloadState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
    /// Body bytes received (before compression)
    pub bytes: u64,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DownloadOutcome {
    fn failed(url: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self {
            url: url.into(),
            state: DownloadState::Failed,
            local_path: None,
            bytes: 0,
            attempts: 0,
            error: Some(error.to_string()),
        }
    }
}

/// Outcomes of a batch, in input order.
#[derive(Debug, Default, Clone)]
pub struct DownloadReport {
    pub outcomes: Vec<DownloadOutcome>,
}

impl DownloadReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.state.is_success())
    }

    pub fn count(&self, state: DownloadState) -> usize {
        self.outcomes.iter().filter(|o| o.state == state).count()
    }
}

enum WriteMsg {
    Chunk(Bytes),
    Finish,
}

enum Persisted {
    Stored,
    /// No-clobber lost a race with another writer of the same path
    AlreadyExists,
}

enum Sink {
    Plain(NamedTempFile),
    Gzip(flate2::write::GzEncoder<NamedTempFile>),
}

impl Sink {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            Sink::Plain(f) => f.write_all(buf),
            Sink::Gzip(g) => g.write_all(buf),
        }
    }

    fn into_temp(self) -> io::Result<NamedTempFile> {
        match self {
            Sink::Plain(f) => Ok(f),
            Sink::Gzip(g) => g.finish(),
        }
    }
}

/// Downloads URLs through a `Fetcher`. Cheap to clone.
#[derive(Clone)]
pub struct Downloader {
    fetcher: Arc<dyn Fetcher>,
    options: DownloadOptions,
}

impl Downloader {
    pub fn new(fetcher: Arc<dyn Fetcher>, options: DownloadOptions) -> Self {
        Self { fetcher, options }
    }

    pub fn options(&self) -> &DownloadOptions {
        &self.options
    }

    /// Resolve where `url` lands under `dest_root`.
    pub fn target_for(&self, url: &str, dest_root: &Path) -> Result<DownloadTarget, DownloadError> {
        let mirrored = dest_root.join(mapper::map_url(url)?);
        let local_path = if self.options.compress {
            GzipCompression::new(self.options.level).artifact_path(&mirrored)
        } else {
            mirrored
        };
        Ok(DownloadTarget {
            source_url: url.trim().to_string(),
            local_path,
            compressed: self.options.compress,
        })
    }

    /// Download a single URL, retrying transient failures.
    pub async fn download_one(
        &self,
        url: &str,
        dest_root: &Path,
    ) -> Result<DownloadOutcome, DownloadError> {
        let target = self.target_for(url, dest_root)?;
        let mut outcome = DownloadOutcome {
            url: target.source_url.clone(),
            state: DownloadState::Pending,
            local_path: Some(target.local_path.clone()),
            bytes: 0,
            attempts: 0,
            error: None,
        };

        if self.options.no_clobber && target.local_path.exists() {
            debug!(
                url = %target.source_url,
                path = %target.local_path.display(),
                "Destination exists, skipping"
            );
            outcome.state = DownloadState::SkippedExisting;
            return Ok(outcome);
        }

        let started = Instant::now();
        let max_attempts = self.options.retry_count.saturating_add(1);
        loop {
            outcome.attempts += 1;
            outcome.state = DownloadState::Fetching;
            debug!(url = %target.source_url, attempt = outcome.attempts, "Fetching");

            let attempt = tokio::time::timeout(self.options.timeout, self.attempt(&target)).await;
            let result = match attempt {
                Ok(result) => result,
                Err(_) => Err(DownloadError::Timeout(format!(
                    "{} exceeded {:?}",
                    target.source_url, self.options.timeout
                ))),
            };

            match result {
                Ok((bytes, persisted)) => {
                    outcome.bytes = bytes;
                    outcome.state = match persisted {
                        Persisted::Stored => DownloadState::Stored,
                        Persisted::AlreadyExists => DownloadState::SkippedExisting,
                    };
                    info!(
                        url = %target.source_url,
                        path = %target.local_path.display(),
                        bytes,
                        attempts = outcome.attempts,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Download complete"
                    );
                    return Ok(outcome);
                }
                Err(e) if e.is_retryable() && outcome.attempts < max_attempts => {
                    warn!(
                        url = %target.source_url,
                        attempt = outcome.attempts,
                        error = %e,
                        "Download attempt failed, retrying"
                    );
                    tokio::time::sleep(self.options.retry_delay).await;
                }
                Err(e) => {
                    warn!(
                        url = %target.source_url,
                        attempts = outcome.attempts,
                        error = %e,
                        "Download failed"
                    );
                    return Err(e);
                }
            }
        }
    }

    /// Download every URL, at most `concurrency` at a time.
    ///
    /// Each URL runs as its own task. A failure is recorded in its outcome and
    /// does not affect the others.
    pub async fn download_batch(&self, urls: Vec<String>, dest_root: &Path) -> DownloadReport {
        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        info!(
            urls = urls.len(),
            concurrency = self.options.concurrency.max(1),
            "Starting download batch"
        );

        let handles: Vec<(String, JoinHandle<Result<DownloadOutcome, DownloadError>>)> = urls
            .into_iter()
            .map(|url| {
                let this = self.clone();
                let semaphore = Arc::clone(&semaphore);
                let dest_root = dest_root.to_path_buf();
                let task_url = url.clone();
                let handle = tokio::spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|_| DownloadError::Cancelled(task_url.clone()))?;
                    this.download_one(&task_url, &dest_root).await
                });
                (url, handle)
            })
            .collect();

        let mut report = DownloadReport::default();
        for (url, handle) in handles {
            let outcome = match handle.await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => DownloadOutcome::failed(url, e),
                Err(join) if join.is_cancelled() => {
                    DownloadOutcome::failed(url.clone(), DownloadError::Cancelled(url))
                }
                Err(join) => DownloadOutcome::failed(url, join),
            };
            report.outcomes.push(outcome);
        }

        info!(
            stored = report.count(DownloadState::Stored),
            skipped = report.count(DownloadState::SkippedExisting),
            failed = report.count(DownloadState::Failed),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Download batch complete"
        );
        report
    }

    /// Run one download as its own task. Aborting the handle leaves nothing under
    /// the destination path.
    pub fn spawn(
        &self,
        url: String,
        dest_root: PathBuf,
    ) -> JoinHandle<Result<DownloadOutcome, DownloadError>> {
        let this = self.clone();
        tokio::spawn(async move { this.download_one(&url, &dest_root).await })
    }

    async fn attempt(&self, target: &DownloadTarget) -> Result<(u64, Persisted), DownloadError> {
        let parent = target
            .local_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        tokio::fs::create_dir_all(&parent)
            .await
            .map_err(|source| DownloadError::Io {
                path: parent.clone(),
                source,
            })?;

        let mut body = self.fetcher.fetch(&target.source_url).await?;

        let (tx, rx) = mpsc::channel(WRITE_QUEUE_DEPTH);
        let gzip = target
            .compressed
            .then(|| GzipCompression::new(self.options.level));
        let destination = target.local_path.clone();
        let no_clobber = self.options.no_clobber;
        let writer = tokio::task::spawn_blocking(move || {
            write_body(rx, &parent, &destination, gzip, no_clobber)
        });

        let mut received = 0u64;
        let streamed: Result<(), DownloadError> = async {
            while let Some(chunk) = body.next().await {
                let chunk = chunk?;
                received += chunk.len() as u64;
                if tx.send(WriteMsg::Chunk(chunk)).await.is_err() {
                    // Writer gave up; its error is reported below
                    return Ok(());
                }
            }
            let _ = tx.send(WriteMsg::Finish).await;
            Ok(())
        }
        .await;
        drop(tx);

        let written = writer
            .await
            .map_err(|_| DownloadError::Cancelled(target.source_url.clone()));
        streamed?;
        let persisted = written??;
        Ok((received, persisted))
    }
}

/// Blocking half of a download: drain the channel into a temp file, then rename.
fn write_body(
    mut rx: mpsc::Receiver<WriteMsg>,
    parent: &Path,
    destination: &Path,
    gzip: Option<GzipCompression>,
    no_clobber: bool,
) -> Result<Persisted, DownloadError> {
    let io_err = |path: &Path, source: io::Error| DownloadError::Io {
        path: path.to_path_buf(),
        source,
    };

    let temp = NamedTempFile::new_in(parent).map_err(|e| io_err(parent, e))?;
    let mut sink = match gzip {
        Some(g) => Sink::Gzip(g.wrap(temp)),
        None => Sink::Plain(temp),
    };

    loop {
        match rx.blocking_recv() {
            Some(WriteMsg::Chunk(chunk)) => {
                sink.write_all(&chunk).map_err(|e| io_err(destination, e))?
            }
            Some(WriteMsg::Finish) => break,
            // Sender dropped without finishing; the temp file goes with `sink`
            None => {
                return Err(DownloadError::Cancelled(destination.display().to_string()));
            }
        }
    }

    let temp = sink.into_temp().map_err(|e| io_err(destination, e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| io_err(destination, e))?;

    let persisted = if no_clobber {
        temp.persist_noclobber(destination)
    } else {
        temp.persist(destination)
    };
    match persisted {
        Ok(_) => Ok(Persisted::Stored),
        Err(e) if no_clobber && e.error.kind() == io::ErrorKind::AlreadyExists => {
            Ok(Persisted::AlreadyExists)
        }
        Err(e) => Err(io_err(destination, e.error)),
    }
}

/// URLs listed one per line. Blank lines and `#` comments are skipped.
pub fn read_url_list(path: &Path) -> Result<Vec<String>, FileIoError> {
    let content = fs::read_to_string(path).map_err(|e| FileIoError::new(path, e))?;
    Ok(parse_url_list(&content))
}

fn parse_url_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
