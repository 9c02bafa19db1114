//! CLI parse: clap types for hasher. No behavior; definitions only.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// hasher - content hashing, drift verification and mirroring
#[derive(Parser, Debug)]
#[command(name = "hasher", version)]
#[command(about = "Hash file trees, verify them later, copy and mirror them")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Working directory; index keys are relative to it
    #[arg(long, global = true, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    #[arg(long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stderr, stdout, file, file+stderr)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Worker pool size for hashing, verifying and copying
    #[arg(long, global = true)]
    pub workers: Option<usize>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Hash every file under a directory and record it in the index
    Hash {
        /// Directory to hash
        dir: PathBuf,
        /// Emit only JSON-lines records (the default rendering)
        #[arg(long, conflicts_with = "sql_only")]
        json_only: bool,
        /// Emit only SQL statements
        #[arg(long)]
        sql_only: bool,
        /// Hash and render without writing the index
        #[arg(long)]
        dry_run: bool,
    },
    /// Re-hash indexed files and report drift
    Verify {
        /// Only report entries that are not a clean match
        #[arg(long)]
        mismatches_only: bool,
        /// Also report files on disk that are not in the index
        #[arg(long)]
        untracked: bool,
        /// Root scanned for untracked files (default: the workspace)
        #[arg(long, requires = "untracked")]
        root: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Copy a tree, optionally gzip-compressing every file
    Copy {
        /// Write `<name>.gz` files through a gzip encoder
        #[arg(long)]
        compress: bool,
        /// Gzip level 1-9 (default from config, normally 6)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=9))]
        level: Option<u32>,
        /// Keep destination files that already hold the source content
        #[arg(long)]
        skip_existing: bool,
        /// With --skip-existing, compare sizes only instead of digests
        #[arg(long, requires = "skip_existing")]
        no_hash_existing: bool,
        /// Record every written file in the index
        #[arg(long)]
        record: bool,
        src: PathBuf,
        dst: PathBuf,
    },
    /// Download a URL, or every URL in a list file, into a mirrored tree
    Download {
        /// Store each download as `<path>.gz`
        #[arg(long)]
        compress: bool,
        /// Gzip level 1-9 (default from config, normally 6)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=9))]
        level: Option<u32>,
        /// Never replace an existing file
        #[arg(long)]
        no_clobber: bool,
        /// Record every stored file in the index
        #[arg(long)]
        record: bool,
        /// A URL, or a path to a newline-delimited URL list
        source: String,
        /// Destination root
        dst: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
