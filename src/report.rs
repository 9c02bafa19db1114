//! Collected per-item outcomes.
//!
//! Runs never unwind on a single bad file or URL. Each item produces a value; the
//! command result is decided once every item has been processed.

use serde::Serialize;
use std::fmt;

/// One item that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    /// Path or URL of the item
    pub item: String,
    pub error: String,
}

impl ItemFailure {
    pub fn new(item: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            item: item.into(),
            error: error.to_string(),
        }
    }
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.item, self.error)
    }
}
