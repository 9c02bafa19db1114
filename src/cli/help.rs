//! CLI command-name contract for logging and routing.

use crate::cli::parse::Commands;

/// Stable command name used in log events (e.g. "hash", "download").
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Hash { .. } => "hash",
        Commands::Verify { .. } => "verify",
        Commands::Copy { .. } => "copy",
        Commands::Download { .. } => "download",
    }
}

/// Whether the command reads or writes the hash index.
pub fn uses_index(command: &Commands) -> bool {
    matches!(
        command,
        Commands::Hash { .. }
            | Commands::Verify { .. }
            | Commands::Copy { record: true, .. }
            | Commands::Download { record: true, .. }
    )
}
