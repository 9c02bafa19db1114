//! Configuration System
//!
//! Layered configuration: built-in defaults, then the user's global file, then the
//! workspace file, then `HASHER_*` environment variables. CLI flags are applied on
//! top by the route layer.

use crate::copy::{CopyOptions, ExistingPolicy};
use crate::download::DownloadOptions;
use crate::logging::LoggingConfig;
use crate::store::HashStore;
use crate::tree::walker::WalkerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HasherConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub hashing: HashingConfig,

    #[serde(default)]
    pub copy: CopyConfig,

    #[serde(default)]
    pub download: DownloadConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the index lives
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Index file; relative paths resolve against the workspace
    #[serde(default)]
    pub index_path: Option<PathBuf>,
}

impl StoreConfig {
    pub fn resolve_index_path(&self, workspace_root: &Path) -> PathBuf {
        match &self.index_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => workspace_root.join(path),
            None => HashStore::default_path(workspace_root),
        }
    }
}

/// Scanning and hashing settings (also used by copy and verify)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashingConfig {
    /// Worker pool size; unset means available parallelism
    #[serde(default)]
    pub workers: Option<usize>,

    /// Read buffer per file, in bytes
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    #[serde(default)]
    pub follow_symlinks: bool,

    #[serde(default)]
    pub max_depth: Option<usize>,

    /// File or directory names skipped during scans
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,
}

fn default_buffer_size() -> usize {
    crate::tree::hasher::DEFAULT_BUFFER_SIZE
}

fn default_ignore() -> Vec<String> {
    vec![crate::store::STORE_DIR_NAME.to_string()]
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            workers: None,
            buffer_size: default_buffer_size(),
            follow_symlinks: false,
            max_depth: None,
            ignore: default_ignore(),
        }
    }
}

impl HashingConfig {
    pub fn walker_config(&self) -> WalkerConfig {
        let mut ignore_patterns = self.ignore.clone();
        // The index directory is never hashed, whatever the config says
        if !ignore_patterns
            .iter()
            .any(|p| p == crate::store::STORE_DIR_NAME)
        {
            ignore_patterns.push(crate::store::STORE_DIR_NAME.to_string());
        }
        WalkerConfig {
            follow_symlinks: self.follow_symlinks,
            ignore_patterns,
            max_depth: self.max_depth,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyConfig {
    /// Gzip level used when `--compress` is given without `--level`
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,
}

fn default_compression_level() -> u32 {
    crate::compression::DEFAULT_LEVEL
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            compression_level: default_compression_level(),
        }
    }
}

impl CopyConfig {
    pub fn options(
        &self,
        compress: bool,
        level: Option<u32>,
        existing: ExistingPolicy,
    ) -> CopyOptions {
        CopyOptions {
            compress,
            level: level.unwrap_or(self.compression_level),
            existing,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Deadline for one download attempt
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_concurrency() -> usize {
    crate::download::downloader::DEFAULT_CONCURRENCY
}

fn default_timeout_secs() -> u64 {
    crate::download::downloader::DEFAULT_TIMEOUT.as_secs()
}

fn default_connect_timeout_secs() -> u64 {
    crate::download::fetch::DEFAULT_CONNECT_TIMEOUT.as_secs()
}

fn default_retry_count() -> u32 {
    crate::download::downloader::DEFAULT_RETRY_COUNT
}

fn default_retry_delay_ms() -> u64 {
    crate::download::downloader::DEFAULT_RETRY_DELAY.as_millis() as u64
}

fn default_user_agent() -> String {
    crate::download::fetch::DEFAULT_USER_AGENT.to_string()
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            retry_count: default_retry_count(),
            retry_delay_ms: default_retry_delay_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl DownloadConfig {
    pub fn options(&self, compress: bool, level: u32, no_clobber: bool) -> DownloadOptions {
        DownloadOptions {
            compress,
            level,
            no_clobber,
            concurrency: self.concurrency,
            timeout: Duration::from_secs(self.timeout_secs),
            retry_count: self.retry_count,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Store(String),
    Hashing(String),
    Copy(String),
    Download(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Store(msg) => write!(f, "store: {}", msg),
            ValidationError::Hashing(msg) => write!(f, "hashing: {}", msg),
            ValidationError::Copy(msg) => write!(f, "copy: {}", msg),
            ValidationError::Download(msg) => write!(f, "download: {}", msg),
            ValidationError::Logging(msg) => write!(f, "logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl HasherConfig {
    /// Validate the entire configuration, reporting every problem found.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if matches!(&self.store.index_path, Some(p) if p.as_os_str().is_empty()) {
            errors.push(ValidationError::Store("index_path cannot be empty".to_string()));
        }

        if self.hashing.workers == Some(0) {
            errors.push(ValidationError::Hashing("workers must be at least 1".to_string()));
        }
        if self.hashing.buffer_size == 0 {
            errors.push(ValidationError::Hashing(
                "buffer_size must be greater than 0".to_string(),
            ));
        }

        if !(1..=9).contains(&self.copy.compression_level) {
            errors.push(ValidationError::Copy(format!(
                "compression_level {} is outside 1..=9",
                self.copy.compression_level
            )));
        }

        if self.download.concurrency == 0 {
            errors.push(ValidationError::Download(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.download.timeout_secs == 0 {
            errors.push(ValidationError::Download(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.download.user_agent.trim().is_empty() {
            errors.push(ValidationError::Download("user_agent cannot be empty".to_string()));
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            errors.push(ValidationError::Logging(format!(
                "format '{}' must be 'text' or 'json'",
                self.logging.format
            )));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
