//! Copy fidelity: copied trees hash identically, compressed trees decompress
//! back to the original bytes.

use super::test_utils::{context, list_files, write_tree};
use flate2::read::GzDecoder;
use hasher::cli::Commands;
use hasher::store::HashStore;
use hasher::tree::hasher::{compute_content_hash, hash_file, DEFAULT_BUFFER_SIZE};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn copy_cmd(src: &Path, dst: &Path, compress: bool, level: Option<u32>) -> Commands {
    Commands::Copy {
        compress,
        level,
        skip_existing: false,
        no_hash_existing: false,
        record: false,
        src: src.to_path_buf(),
        dst: dst.to_path_buf(),
    }
}

fn incremental_copy_cmd(src: &Path, dst: &Path, record: bool) -> Commands {
    Commands::Copy {
        compress: false,
        level: None,
        skip_existing: true,
        no_hash_existing: false,
        record,
        src: src.to_path_buf(),
        dst: dst.to_path_buf(),
    }
}

fn gunzip(path: &Path) -> Vec<u8> {
    let mut out = Vec::new();
    GzDecoder::new(fs::File::open(path).unwrap())
        .read_to_end(&mut out)
        .unwrap();
    out
}

fn sample_tree(root: &Path) {
    let big: Vec<u8> = (0..100_000u32).map(|i| (i * 7 % 256) as u8).collect();
    write_tree(
        root,
        &[
            ("readme.md", b"# readme\n"),
            ("empty", b""),
            ("data/big.bin", &big),
            ("data/nested/deep.txt", b"deep"),
        ],
    );
}

#[test]
fn test_plain_copy_preserves_every_digest() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    sample_tree(src.path());

    let output = context(src.path())
        .execute(&copy_cmd(src.path(), dst.path(), false, None))
        .unwrap();
    assert!(output.is_success());
    assert!(output.rendered.contains("Copied 4 files"));

    let files = list_files(src.path());
    assert_eq!(files, list_files(dst.path()));
    for file in files {
        let a = hash_file(&src.path().join(&file), DEFAULT_BUFFER_SIZE).unwrap();
        let b = hash_file(&dst.path().join(&file), DEFAULT_BUFFER_SIZE).unwrap();
        assert_eq!(a, b, "{} differs after copy", file);
    }
}

#[test]
fn test_compressed_copy_round_trips() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    sample_tree(src.path());

    let output = context(src.path())
        .execute(&copy_cmd(src.path(), dst.path(), true, Some(9)))
        .unwrap();
    assert!(output.is_success());

    assert_eq!(
        list_files(dst.path()),
        vec![
            "data/big.bin.gz",
            "data/nested/deep.txt.gz",
            "empty.gz",
            "readme.md.gz",
        ]
    );
    for file in list_files(src.path()) {
        let original = fs::read(src.path().join(&file)).unwrap();
        let restored = gunzip(&dst.path().join(format!("{}.gz", file)));
        assert_eq!(compute_content_hash(&original), compute_content_hash(&restored));
    }
}

#[test]
fn test_existing_gz_files_are_skipped() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write_tree(src.path(), &[("plain.txt", b"p"), ("already.GZ", b"opaque")]);

    let output = context(src.path())
        .execute(&copy_cmd(src.path(), dst.path(), true, None))
        .unwrap();
    assert!(output.rendered.contains("skipped 1 compressed"));
    assert_eq!(list_files(dst.path()), vec!["plain.txt.gz"]);
}

#[test]
fn test_copy_into_own_subtree_is_rejected() {
    let src = TempDir::new().unwrap();
    write_tree(src.path(), &[("a.txt", b"a")]);

    let result = context(src.path()).execute(&copy_cmd(
        src.path(),
        &src.path().join("mirror"),
        false,
        None,
    ));
    assert!(result.is_err());
    assert_eq!(list_files(src.path()), vec!["a.txt"]);
}

#[test]
fn test_relative_paths_resolve_against_workspace() {
    let ws = TempDir::new().unwrap();
    write_tree(ws.path(), &[("in/a.txt", b"a")]);

    context(ws.path())
        .execute(&copy_cmd(&PathBuf::from("in"), &PathBuf::from("out"), false, None))
        .unwrap();
    assert_eq!(fs::read(ws.path().join("out/a.txt")).unwrap(), b"a");
}

#[test]
fn test_one_failed_file_fails_the_command_but_not_the_copy() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    sample_tree(src.path());
    // A non-empty directory occupies the destination of readme.md
    fs::create_dir_all(dst.path().join("readme.md/keep")).unwrap();

    let output = context(src.path())
        .execute(&copy_cmd(src.path(), dst.path(), false, None))
        .unwrap();

    assert!(!output.is_success());
    assert_eq!(output.failures.len(), 1);
    assert!(output.failures[0].item.ends_with("readme.md"));
    assert!(output.rendered.contains("Copied 3 files"));
    assert!(output.rendered.contains("1 failed"));
    assert_eq!(fs::read(dst.path().join("data/nested/deep.txt")).unwrap(), b"deep");
    assert_eq!(fs::read(dst.path().join("empty")).unwrap(), b"");
}

#[test]
fn test_skip_existing_only_rewrites_changed_files() {
    let ws = TempDir::new().unwrap();
    sample_tree(&ws.path().join("src"));
    let ctx = context(ws.path());
    let (src, dst) = (PathBuf::from("src"), PathBuf::from("dst"));

    let first = ctx.execute(&incremental_copy_cmd(&src, &dst, false)).unwrap();
    assert!(first.rendered.contains("Copied 4 files"));

    fs::write(ws.path().join("src/readme.md"), b"# changed\n").unwrap();
    let second = ctx.execute(&incremental_copy_cmd(&src, &dst, false)).unwrap();
    assert!(second.is_success());
    assert!(second.rendered.contains("Copied 1 files"), "{}", second.rendered);
    assert!(second.rendered.contains("3 already current"));
    assert_eq!(fs::read(ws.path().join("dst/readme.md")).unwrap(), b"# changed\n");
}

#[test]
fn test_recorded_copy_verifies_clean() {
    let ws = TempDir::new().unwrap();
    write_tree(ws.path(), &[("src/a.txt", b"a"), ("src/b/c.txt", b"c")]);
    let ctx = context(ws.path());

    let output = ctx
        .execute(&incremental_copy_cmd(&PathBuf::from("src"), &PathBuf::from("dst"), true))
        .unwrap();
    assert!(output.rendered.contains("Recorded 2 files in the index (2 new, 0 updated)"));

    let store = HashStore::load(ctx.index_path(), ws.path()).unwrap();
    let keys: Vec<_> = store.query_all().map(|r| r.path.clone()).collect();
    assert_eq!(keys, vec!["dst/a.txt", "dst/b/c.txt"]);
    assert_eq!(
        store.get("dst/b/c.txt").unwrap().content_hash,
        compute_content_hash(b"c")
    );

    let verify = ctx
        .execute(&Commands::Verify {
            mismatches_only: true,
            untracked: false,
            root: None,
            format: hasher::cli::OutputFormat::Json,
        })
        .unwrap();
    assert!(verify.is_success());
    assert!(verify.rendered.trim().is_empty());
}
