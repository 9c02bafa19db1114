//! Copy and download summaries.

use crate::copy::CopyReport;
use crate::download::{DownloadOutcome, DownloadReport, DownloadState};
use crate::tree::indexer::HashReport;

pub fn format_copy_summary(report: &CopyReport) -> String {
    format!(
        "Copied {} files ({} bytes), {} already current, skipped {} compressed, {} failed",
        report.copied.len(),
        report.bytes_copied(),
        report.unchanged.len(),
        report.skipped.len(),
        report.failures.len()
    )
}

/// Appended to a copy or download summary when written files were indexed.
pub fn format_record_summary(report: &HashReport) -> String {
    format!(
        "Recorded {} files in the index ({} new, {} updated)",
        report.records.len(),
        report.inserted,
        report.updated
    )
}

/// One line per URL in input order, then a summary.
pub fn format_download_summary(report: &DownloadReport) -> String {
    let mut lines: Vec<String> = report.outcomes.iter().map(outcome_line).collect();
    lines.push(format!(
        "Downloaded {}, skipped {} existing, {} failed",
        report.count(DownloadState::Stored),
        report.count(DownloadState::SkippedExisting),
        report.count(DownloadState::Failed)
    ));
    lines.join("\n")
}

fn outcome_line(outcome: &DownloadOutcome) -> String {
    let path = outcome
        .local_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "-".to_string());
    match outcome.state {
        DownloadState::Stored => {
            format!("stored   {} -> {} ({} bytes)", outcome.url, path, outcome.bytes)
        }
        DownloadState::SkippedExisting => format!("exists   {} -> {}", outcome.url, path),
        _ => format!(
            "failed   {}: {}",
            outcome.url,
            outcome.error.as_deref().unwrap_or("unknown error")
        ),
    }
}
