//! CLI domain: parse, route, help, output, and presentation only.
//! No domain orchestration; single route table dispatches to domain services.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::{command_name, uses_index};
pub use output::{format_failures, map_error};
pub use parse::{Cli, Commands, OutputFormat};
pub use presentation::{
    format_copy_summary, format_download_summary, format_record_summary,
    format_records_json_lines, format_records_sql, format_verify_json_lines, format_verify_table,
    sql_quote,
};
pub use route::{CommandOutput, RunContext};
