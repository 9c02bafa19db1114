//! CLI presentation: text, json and sql formatters per command family.

mod records;
mod transfer;
mod verify;

pub use records::{format_records_json_lines, format_records_sql, sql_quote};
pub use transfer::{format_copy_summary, format_download_summary, format_record_summary};
pub use verify::{format_verify_json_lines, format_verify_table};
