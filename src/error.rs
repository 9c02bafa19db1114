//! Error types for the hasher content index and mirroring pipelines.

use std::path::PathBuf;
use thiserror::Error;

/// Index and filesystem errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Hash store at {path:?} is corrupt: {reason}")]
    StoreCorrupt { path: PathBuf, reason: String },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A failure confined to a single file. Runs record these and keep going.
#[derive(Debug, Error)]
#[error("I/O error on {path:?}: {source}")]
pub struct FileIoError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl FileIoError {
    pub fn new(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> std::io::ErrorKind {
        self.source.kind()
    }
}

/// Download failures, recorded per URL in batch mode
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Unsupported URL scheme '{0}' (only http and https are mirrored)")]
    UnsupportedScheme(String),

    #[error("Request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Connection error: {0}")]
    Connect(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Failed writing {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Download of {0} was cancelled")]
    Cancelled(String),
}

impl DownloadError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            DownloadError::Status { status, .. } => *status >= 500 || *status == 429,
            DownloadError::Timeout(_) | DownloadError::Connect(_) | DownloadError::Http(_) => true,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for DownloadError {
    fn from(error: reqwest::Error) -> Self {
        let url = error
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        if let Some(status) = error.status() {
            DownloadError::Status {
                url,
                status: status.as_u16(),
            }
        } else if error.is_timeout() {
            DownloadError::Timeout(format!("{}: {}", url, error))
        } else if error.is_connect() {
            DownloadError::Connect(format!("{}: {}", url, error))
        } else {
            DownloadError::Http(error.to_string())
        }
    }
}

/// Command-level errors surfaced by the CLI route
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error(transparent)]
    FileIo(#[from] FileIoError),

    #[error("Download failed: {0}")]
    DownloadError(#[from] DownloadError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Failed to render output: {0}")]
    RenderError(String),

    #[error("Worker failure: {0}")]
    WorkerError(String),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::WorkerError(err.to_string())
    }
}
