//! Verify result renderers: JSON-lines and a text table.

use crate::error::ApiError;
use crate::types::hash_to_hex;
use crate::verify::{VerificationResult, VerificationStatus};
use comfy_table::Table;
use owo_colors::OwoColorize;

const SHORT_HASH: usize = 12;

/// One JSON object per result: `path`, `status`, `stored`, `current` (and `error`).
pub fn format_verify_json_lines<'a, I>(results: I) -> Result<String, ApiError>
where
    I: IntoIterator<Item = &'a VerificationResult>,
{
    let mut lines = Vec::new();
    for result in results {
        lines.push(serde_json::to_string(result).map_err(|e| {
            ApiError::RenderError(format!("result {}: {}", result.path, e))
        })?);
    }
    Ok(lines.join("\n"))
}

/// Table of results followed by a one-line summary.
pub fn format_verify_table<'a, I>(results: I, color: bool) -> String
where
    I: IntoIterator<Item = &'a VerificationResult>,
{
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Status", "Path", "Stored", "Current"]);

    let mut counts = [0usize; 5];
    let mut rows = 0usize;
    for r in results {
        rows += 1;
        counts[status_index(r.status)] += 1;
        let current = match (&r.current_hash, &r.error) {
            (Some(h), _) => short(h),
            (None, Some(err)) => err.clone(),
            (None, None) => "-".to_string(),
        };
        table.add_row(vec![
            r.status.to_string(),
            r.path.clone(),
            r.stored_hash.as_ref().map(short).unwrap_or_else(|| "-".to_string()),
            current,
        ]);
    }

    let summary = summary_line(&counts, color);
    if rows == 0 {
        return format!("No entries to report\n{}", summary);
    }
    format!("{}\n{}", table, summary)
}

fn summary_line(counts: &[usize; 5], color: bool) -> String {
    let parts = [
        (counts[0], "match"),
        (counts[1], "mismatch"),
        (counts[2], "missing"),
        (counts[3], "untracked"),
        (counts[4], "unreadable"),
    ];
    parts
        .iter()
        .map(|(n, label)| {
            let text = format!("{} {}", n, label);
            match (color, *label, *n) {
                (false, _, _) | (true, _, 0) => text,
                (true, "match", _) => text.green().to_string(),
                (true, "mismatch", _) | (true, "unreadable", _) => text.red().to_string(),
                (true, _, _) => text.yellow().to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn status_index(status: VerificationStatus) -> usize {
    match status {
        VerificationStatus::Match => 0,
        VerificationStatus::Mismatch => 1,
        VerificationStatus::Missing => 2,
        VerificationStatus::Untracked => 3,
        VerificationStatus::Unreadable => 4,
    }
}

fn short(hash: &crate::types::Hash) -> String {
    let mut hex = hash_to_hex(hash);
    hex.truncate(SHORT_HASH);
    hex
}
