//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::{ApiError, StorageError};
use crate::report::ItemFailure;

/// Map domain/service errors to a string for CLI output.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::StorageError(StorageError::StoreCorrupt { path, reason }) => format!(
            "error: index at {} is corrupt ({}); restore or remove it before re-running",
            path.display(),
            reason
        ),
        ApiError::ConfigError(msg) => format!("error: configuration: {}", msg),
        other => format!("error: {}", other),
    }
}

/// One line per failed item, for stderr.
pub fn format_failures(failures: &[ItemFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("failed: {}", f))
        .collect::<Vec<_>>()
        .join("\n")
}
