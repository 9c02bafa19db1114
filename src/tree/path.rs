//! Path canonicalization and index key derivation

use crate::error::StorageError;
use std::path::{Component, Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

/// Canonicalize a path (resolves symlinks, `..`, `.`) without Windows UNC prefixes.
pub fn canonicalize_path(path: &Path) -> Result<PathBuf, StorageError> {
    dunce::canonicalize(path).map_err(|e| {
        StorageError::InvalidPath(format!(
            "Failed to canonicalize path {}: {}",
            path.display(),
            e
        ))
    })
}

/// Canonical form of a path that may not exist yet.
///
/// The parent directory is canonicalized and the file name re-attached; when the
/// parent is missing too, the path is returned as given.
pub fn canonicalize_lenient(path: &Path) -> PathBuf {
    if let Ok(canonical) = dunce::canonicalize(path) {
        return canonical;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => dunce::canonicalize(parent)
            .map(|p| p.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}

/// Normalize a path string for use as an index key (without filesystem access)
///
/// Unicode is normalized to NFC, separators become `/`, and trailing slashes are
/// removed (except for the root).
pub fn normalize_path_string(path: &str) -> String {
    let normalized: String = path.nfc().collect();
    let mut result = normalized.replace('\\', "/");
    while result.len() > 1 && result.ends_with('/') {
        result.pop();
    }
    result
}

/// Derive the canonical index key for `path` relative to `base`.
///
/// Both paths are canonicalized first. A path under `base` becomes a relative,
/// `/`-joined key; anything outside `base` keeps its absolute canonical form.
pub fn path_key(base: &Path, path: &Path) -> Result<String, StorageError> {
    let canonical = canonicalize_path(path)?;
    let canonical_base = canonicalize_path(base)?;
    Ok(key_under(&canonical_base, &canonical))
}

/// Key derivation for paths that are already canonical (no filesystem access).
pub fn key_under(canonical_base: &Path, canonical_path: &Path) -> String {
    match canonical_path.strip_prefix(canonical_base) {
        Ok(relative) => join_components(relative),
        Err(_) => normalize_path_string(&canonical_path.to_string_lossy()),
    }
}

/// Map an index key back to a filesystem path.
pub fn resolve_key(base: &Path, key: &str) -> PathBuf {
    let key_path = Path::new(key);
    if key_path.is_absolute() {
        key_path.to_path_buf()
    } else {
        key.split('/').fold(base.to_path_buf(), |acc, seg| acc.join(seg))
    }
}

/// `/`-joined, NFC-normalized rendering of a relative path's normal components.
pub fn join_components(relative: &Path) -> String {
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().nfc().collect::<String>()),
            _ => None,
        })
        .collect();
    parts.join("/")
}
