//! Drift detection through the `hash` then `verify` command flow

use super::test_utils::{context, write_tree};
use hasher::cli::{Commands, OutputFormat};
use hasher::store::HashStore;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn hash_cmd(dir: &str) -> Commands {
    Commands::Hash {
        dir: PathBuf::from(dir),
        json_only: false,
        sql_only: false,
        dry_run: false,
    }
}

fn verify_cmd(mismatches_only: bool, untracked: bool) -> Commands {
    Commands::Verify {
        mismatches_only,
        untracked,
        root: None,
        format: OutputFormat::Json,
    }
}

fn statuses(rendered: &str) -> Vec<(String, String)> {
    rendered
        .lines()
        .map(|line| {
            let value: Value = serde_json::from_str(line).unwrap();
            (
                value["path"].as_str().unwrap().to_string(),
                value["status"].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

#[test]
fn test_clean_tree_verifies_as_all_match() {
    let temp = TempDir::new().unwrap();
    write_tree(temp.path(), &[("a.txt", b"a"), ("b/c.txt", b"c")]);
    let ctx = context(temp.path());

    ctx.execute(&hash_cmd(".")).unwrap();
    let output = ctx.execute(&verify_cmd(false, false)).unwrap();

    assert!(output.is_success());
    assert_eq!(
        statuses(&output.rendered),
        vec![
            ("a.txt".to_string(), "match".to_string()),
            ("b/c.txt".to_string(), "match".to_string()),
        ]
    );
}

#[test]
fn test_modified_and_deleted_files_are_reported() {
    let temp = TempDir::new().unwrap();
    write_tree(
        temp.path(),
        &[("keep.txt", b"keep"), ("edit.txt", b"old"), ("gone.txt", b"bye")],
    );
    let ctx = context(temp.path());
    ctx.execute(&hash_cmd(".")).unwrap();

    fs::write(temp.path().join("edit.txt"), b"new contents").unwrap();
    fs::remove_file(temp.path().join("gone.txt")).unwrap();

    let output = ctx.execute(&verify_cmd(true, false)).unwrap();
    // Drift is a finding, not a failure
    assert!(output.is_success());
    assert_eq!(
        statuses(&output.rendered),
        vec![
            ("edit.txt".to_string(), "mismatch".to_string()),
            ("gone.txt".to_string(), "missing".to_string()),
        ]
    );

    let first: Value = serde_json::from_str(output.rendered.lines().next().unwrap()).unwrap();
    assert_eq!(first["stored"], blake3::hash(b"old").to_hex().as_str());
    assert_eq!(first["current"], blake3::hash(b"new contents").to_hex().as_str());
}

#[test]
fn test_verify_never_rewrites_stored_hashes() {
    let temp = TempDir::new().unwrap();
    write_tree(temp.path(), &[("edit.txt", b"old")]);
    let ctx = context(temp.path());
    ctx.execute(&hash_cmd(".")).unwrap();

    fs::write(temp.path().join("edit.txt"), b"changed").unwrap();
    ctx.execute(&verify_cmd(false, false)).unwrap();
    ctx.execute(&verify_cmd(false, false)).unwrap();

    let store = HashStore::load(ctx.index_path(), temp.path()).unwrap();
    assert_eq!(
        store.get("edit.txt").unwrap().content_hash,
        *blake3::hash(b"old").as_bytes()
    );
}

#[test]
fn test_untracked_files_are_opt_in() {
    let temp = TempDir::new().unwrap();
    write_tree(temp.path(), &[("tracked.txt", b"t")]);
    let ctx = context(temp.path());
    ctx.execute(&hash_cmd(".")).unwrap();
    write_tree(temp.path(), &[("new/extra.txt", b"x")]);

    let without = ctx.execute(&verify_cmd(true, false)).unwrap();
    assert!(without.rendered.trim().is_empty());

    let with = ctx.execute(&verify_cmd(true, true)).unwrap();
    assert_eq!(
        statuses(&with.rendered),
        vec![("new/extra.txt".to_string(), "untracked".to_string())]
    );
}

#[test]
fn test_text_table_lists_drift() {
    let temp = TempDir::new().unwrap();
    write_tree(temp.path(), &[("edit.txt", b"old")]);
    let ctx = context(temp.path());
    ctx.execute(&hash_cmd(".")).unwrap();
    fs::write(temp.path().join("edit.txt"), b"new").unwrap();

    let output = ctx
        .execute(&Commands::Verify {
            mismatches_only: false,
            untracked: false,
            root: None,
            format: OutputFormat::Text,
        })
        .unwrap();
    assert!(output.rendered.contains("edit.txt"));
    assert!(output.rendered.contains("mismatch"));
    assert!(output.rendered.contains("0 match, 1 mismatch"));
}

#[test]
fn test_verify_with_no_index_reports_nothing() {
    let temp = TempDir::new().unwrap();
    let ctx = context(temp.path());
    let output = ctx.execute(&verify_cmd(false, false)).unwrap();
    assert!(output.is_success());
    assert!(output.rendered.trim().is_empty());
    // Nothing matched, so nothing was written
    assert!(!ctx.index_path().exists());
}

#[test]
fn test_replacing_a_parent_directory_reports_missing() {
    let temp = TempDir::new().unwrap();
    write_tree(temp.path(), &[("dir/a.txt", b"a")]);
    let ctx = context(temp.path());
    ctx.execute(&hash_cmd(".")).unwrap();

    fs::remove_dir_all(temp.path().join("dir")).unwrap();
    fs::write(temp.path().join("dir"), b"plain file now").unwrap();

    let output = ctx.execute(&verify_cmd(true, false)).unwrap();
    assert!(output.is_success(), "{:?}", output.failures);
    assert_eq!(
        statuses(&output.rendered),
        vec![("dir/a.txt".to_string(), "missing".to_string())]
    );
}
