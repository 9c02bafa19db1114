//! Filesystem walker for enumerating regular files under a root

use crate::error::StorageError;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// A regular file found during a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub size: u64,
}

/// Filesystem walker configuration
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Whether to follow symbolic links (default: false for determinism)
    pub follow_symlinks: bool,
    /// Path components to skip entirely (e.g. the index directory)
    pub ignore_patterns: Vec<String>,
    /// Maximum depth to traverse (None = unlimited)
    pub max_depth: Option<usize>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            ignore_patterns: vec![crate::store::STORE_DIR_NAME.to_string()],
            max_depth: None,
        }
    }
}

/// Filesystem walker
///
/// `files()` may be called any number of times; each call starts a fresh walk.
#[derive(Debug, Clone)]
pub struct Walker {
    root: PathBuf,
    config: WalkerConfig,
}

impl Walker {
    /// Create a new walker for the given root path
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            config: WalkerConfig::default(),
        }
    }

    /// Create a walker with custom configuration
    pub fn with_config(root: PathBuf, config: WalkerConfig) -> Self {
        Self { root, config }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &WalkerConfig {
        &self.config
    }

    /// Same configuration, different root.
    pub fn rooted_at(&self, root: PathBuf) -> Self {
        Self {
            root,
            config: self.config.clone(),
        }
    }

    /// Lazily enumerate regular files in lexicographic order.
    ///
    /// Unreadable entries surface as `Err` items; the walk continues past them.
    pub fn files(&self) -> FileIter {
        let ignore = self.config.ignore_patterns.clone();
        let predicate: EntryFilter =
            Box::new(move |entry: &DirEntry| !is_ignored(entry, &ignore));
        let inner = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .max_depth(self.config.max_depth.unwrap_or(usize::MAX))
            .sort_by_file_name()
            .into_iter()
            .filter_entry(predicate);
        FileIter { inner }
    }
}

type EntryFilter = Box<dyn FnMut(&DirEntry) -> bool + Send>;

/// Lazy iterator over the regular files of a walk.
pub struct FileIter {
    inner: walkdir::FilterEntry<walkdir::IntoIter, EntryFilter>,
}

impl Iterator for FileIter {
    type Item = Result<ScannedFile, StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(walk_error(e))),
            };

            // Symlinks that are not followed and directories are not files
            if !entry.file_type().is_file() {
                continue;
            }

            return Some(match entry.metadata() {
                Ok(metadata) => Ok(ScannedFile {
                    path: entry.into_path(),
                    size: metadata.len(),
                }),
                Err(e) => Err(walk_error(e)),
            });
        }
    }
}

fn walk_error(e: walkdir::Error) -> StorageError {
    let path = e
        .path()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let kind = e
        .io_error()
        .map(|io| io.kind())
        .unwrap_or(std::io::ErrorKind::Other);
    StorageError::IoError(std::io::Error::new(
        kind,
        format!("Failed to walk {}: {}", path, e),
    ))
}

/// Root is never ignored; otherwise any component equal to a pattern is skipped.
fn is_ignored(entry: &DirEntry, patterns: &[String]) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    patterns.iter().any(|p| name == p.as_str())
}
