//! CLI surface: argument parsing and the rendered output of `hash`

use super::test_utils::{context, write_tree};
use clap::Parser;
use hasher::cli::{map_error, Cli, Commands, OutputFormat, RunContext};
use hasher::config::HasherConfig;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn hash_cmd(sql_only: bool, dry_run: bool) -> Commands {
    Commands::Hash {
        dir: PathBuf::from("."),
        json_only: !sql_only,
        sql_only,
        dry_run,
    }
}

#[test]
fn test_parse_hash_flags() {
    let cli = Cli::try_parse_from(["hasher", "hash", "src", "--sql-only", "--dry-run"]).unwrap();
    match cli.command {
        Commands::Hash {
            dir,
            json_only,
            sql_only,
            dry_run,
        } => {
            assert_eq!(dir, PathBuf::from("src"));
            assert!(!json_only);
            assert!(sql_only);
            assert!(dry_run);
        }
        other => panic!("unexpected command {:?}", other),
    }
}

#[test]
fn test_json_and_sql_are_exclusive() {
    assert!(Cli::try_parse_from(["hasher", "hash", ".", "--json-only", "--sql-only"]).is_err());
}

#[test]
fn test_level_is_range_checked() {
    assert!(Cli::try_parse_from(["hasher", "copy", "--compress", "--level", "0", "a", "b"]).is_err());
    assert!(Cli::try_parse_from(["hasher", "copy", "--compress", "--level", "10", "a", "b"]).is_err());
    let cli = Cli::try_parse_from(["hasher", "copy", "--compress", "--level", "9", "a", "b"]).unwrap();
    assert!(matches!(cli.command, Commands::Copy { level: Some(9), compress: true, .. }));
}

#[test]
fn test_verify_root_requires_untracked() {
    assert!(Cli::try_parse_from(["hasher", "verify", "--root", "x"]).is_err());
    let cli =
        Cli::try_parse_from(["hasher", "verify", "--untracked", "--root", "x", "--format", "json"])
            .unwrap();
    assert!(matches!(
        cli.command,
        Commands::Verify {
            untracked: true,
            format: OutputFormat::Json,
            ..
        }
    ));
}

#[test]
fn test_copy_existing_file_flags() {
    assert!(Cli::try_parse_from(["hasher", "copy", "--no-hash-existing", "a", "b"]).is_err());
    let cli = Cli::try_parse_from([
        "hasher",
        "copy",
        "--skip-existing",
        "--no-hash-existing",
        "--record",
        "a",
        "b",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Commands::Copy {
            skip_existing: true,
            no_hash_existing: true,
            record: true,
            ..
        }
    ));
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "hasher",
        "download",
        "https://example.com/a",
        "out",
        "--workers",
        "3",
        "--no-clobber",
        "--quiet",
    ])
    .unwrap();
    assert_eq!(cli.workers, Some(3));
    assert!(cli.quiet);
    assert!(matches!(cli.command, Commands::Download { no_clobber: true, .. }));
}

#[test]
fn test_hash_renders_json_lines_and_saves_index() {
    let temp = TempDir::new().unwrap();
    write_tree(temp.path(), &[("b.txt", b"bee"), ("a.txt", b"")]);
    let ctx = context(temp.path());

    let output = ctx.execute(&hash_cmd(false, false)).unwrap();
    assert!(output.is_success());

    let rows: Vec<Value> = output
        .rendered
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["path"], "a.txt");
    assert_eq!(
        rows[0]["hash"],
        "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262"
    );
    assert_eq!(rows[0]["size"], 0);
    assert_eq!(rows[1]["path"], "b.txt");
    assert_eq!(rows[1]["size"], 3);
    assert!(ctx.index_path().exists());
}

#[test]
fn test_hash_sql_output() {
    let temp = TempDir::new().unwrap();
    write_tree(temp.path(), &[("it's.txt", b"quote")]);

    let output = context(temp.path()).execute(&hash_cmd(true, false)).unwrap();
    assert!(output.rendered.starts_with("CREATE TABLE IF NOT EXISTS file_hashes"));
    assert!(output.rendered.contains("INSERT OR REPLACE INTO file_hashes"));
    assert!(output.rendered.contains("'it''s.txt'"));
}

#[test]
fn test_dry_run_writes_nothing() {
    let temp = TempDir::new().unwrap();
    write_tree(temp.path(), &[("a.txt", b"a")]);
    let ctx = context(temp.path());

    let output = ctx.execute(&hash_cmd(false, true)).unwrap();
    assert_eq!(output.rendered.lines().count(), 1);
    assert!(!ctx.index_path().exists());
    assert!(!temp.path().join(".hasher").exists());
}

#[test]
fn test_corrupt_index_fails_hash_with_clear_message() {
    let temp = TempDir::new().unwrap();
    write_tree(temp.path(), &[("a.txt", b"a"), (".hasher/index.bin", b"garbage")]);

    let err = context(temp.path())
        .execute(&hash_cmd(false, false))
        .unwrap_err();
    let message = map_error(&err);
    assert!(message.contains("corrupt"), "{}", message);
    assert_eq!(fs::read(temp.path().join(".hasher/index.bin")).unwrap(), b"garbage");
}

#[test]
fn test_custom_index_path() {
    let temp = TempDir::new().unwrap();
    write_tree(temp.path(), &[("a.txt", b"a")]);
    let mut config = HasherConfig::default();
    config.store.index_path = Some(PathBuf::from("state/files.idx"));

    let ctx = RunContext::from_config(temp.path().to_path_buf(), config).unwrap();
    ctx.execute(&hash_cmd(false, false)).unwrap();
    assert!(temp.path().join("state/files.idx").exists());
}

#[test]
fn test_custom_index_inside_workspace_is_not_tracked() {
    let temp = TempDir::new().unwrap();
    write_tree(temp.path(), &[("a.txt", b"a"), ("state/notes.txt", b"n")]);
    let mut config = HasherConfig::default();
    config.store.index_path = Some(PathBuf::from("state/idx.bin"));
    let ctx = RunContext::from_config(temp.path().to_path_buf(), config)
        .unwrap()
        .with_color(false);

    ctx.execute(&hash_cmd(false, false)).unwrap();
    let second = ctx.execute(&hash_cmd(false, false)).unwrap();
    let paths: Vec<String> = second
        .rendered
        .lines()
        .map(|l| serde_json::from_str::<Value>(l).unwrap()["path"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(paths, vec!["a.txt", "state/notes.txt"]);

    let verify = ctx
        .execute(&Commands::Verify {
            mismatches_only: true,
            untracked: true,
            root: None,
            format: OutputFormat::Json,
        })
        .unwrap();
    assert!(verify.is_success());
    assert_eq!(verify.rendered.trim(), "", "unexpected drift: {}", verify.rendered);
}

#[test]
fn test_invalid_config_is_rejected_up_front() {
    let temp = TempDir::new().unwrap();
    let mut config = HasherConfig::default();
    config.hashing.buffer_size = 0;
    config.download.concurrency = 0;

    let err = RunContext::from_config(temp.path().to_path_buf(), config)
        .err()
        .unwrap();
    let message = map_error(&err);
    assert!(message.contains("buffer_size"));
    assert!(message.contains("concurrency"));
}
