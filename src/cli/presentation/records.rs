//! Hash record renderers: JSON-lines and SQL statements.

use crate::error::ApiError;
use crate::store::FileRecord;
use crate::types::hash_to_hex;
use serde::Serialize;

pub const SQL_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS file_hashes (\n    \
    path TEXT PRIMARY KEY,\n    \
    hash TEXT NOT NULL,\n    \
    size INTEGER NOT NULL,\n    \
    last_seen INTEGER NOT NULL\n);";

#[derive(Serialize)]
struct RecordRow<'a> {
    path: &'a str,
    hash: String,
    size: u64,
}

/// One `{path, hash, size}` object per line.
pub fn format_records_json_lines<'a, I>(records: I) -> Result<String, ApiError>
where
    I: IntoIterator<Item = &'a FileRecord>,
{
    let mut lines = Vec::new();
    for record in records {
        let row = RecordRow {
            path: &record.path,
            hash: hash_to_hex(&record.content_hash),
            size: record.size_bytes,
        };
        lines.push(serde_json::to_string(&row).map_err(|e| {
            ApiError::RenderError(format!("record {}: {}", record.path, e))
        })?);
    }
    Ok(lines.join("\n"))
}

/// Schema statement followed by one INSERT per record.
pub fn format_records_sql<'a, I>(records: I) -> String
where
    I: IntoIterator<Item = &'a FileRecord>,
{
    let mut out = vec![SQL_SCHEMA.to_string()];
    out.extend(records.into_iter().map(|r| {
        format!(
            "INSERT OR REPLACE INTO file_hashes (path, hash, size, last_seen) VALUES ({}, {}, {}, {});",
            sql_quote(&r.path),
            sql_quote(&hash_to_hex(&r.content_hash)),
            r.size_bytes,
            r.last_seen
        )
    }));
    out.join("\n")
}

/// Single-quoted SQL string literal with embedded quotes doubled.
pub fn sql_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
