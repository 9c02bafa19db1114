//! Layered configuration: defaults, global file, workspace files, environment

use hasher::cli::RunContext;
use hasher::config::ConfigLoader;
use std::fs;
use std::sync::Mutex;
use tempfile::TempDir;

/// Serializes tests that touch HASHER_* environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

#[test]
fn test_defaults_without_any_file() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let ws = TempDir::new().unwrap();
    let config = ConfigLoader::load_layers(ws.path(), None).unwrap();

    assert_eq!(config.hashing.buffer_size, 64 * 1024);
    assert_eq!(config.copy.compression_level, 6);
    assert_eq!(config.download.concurrency, 4);
    assert_eq!(config.logging.output, "stderr");
    assert!(config.validate().is_ok());
}

#[test]
fn test_workspace_file_overrides_global_file() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let ws = TempDir::new().unwrap();
    let global_dir = TempDir::new().unwrap();
    let global = global_dir.path().join("config.toml");
    fs::write(
        &global,
        "[download]\nconcurrency = 2\nretry_count = 9\n\n[copy]\ncompression_level = 3\n",
    )
    .unwrap();
    fs::write(ws.path().join("hasher.toml"), "[download]\nconcurrency = 8\n").unwrap();

    let config = ConfigLoader::load_layers(ws.path(), Some(&global)).unwrap();
    assert_eq!(config.download.concurrency, 8);
    assert_eq!(config.download.retry_count, 9);
    assert_eq!(config.copy.compression_level, 3);
}

#[test]
fn test_environment_overrides_files() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let ws = TempDir::new().unwrap();
    fs::write(ws.path().join("hasher.toml"), "[download]\nretry_count = 1\n").unwrap();

    std::env::set_var("HASHER_DOWNLOAD__RETRY_COUNT", "7");
    let config = ConfigLoader::load_layers(ws.path(), None);
    std::env::remove_var("HASHER_DOWNLOAD__RETRY_COUNT");

    assert_eq!(config.unwrap().download.retry_count, 7);
}

#[test]
fn test_named_environment_file() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let ws = TempDir::new().unwrap();
    fs::write(ws.path().join("hasher.toml"), "[hashing]\nworkers = 2\n").unwrap();
    fs::write(ws.path().join("hasher.ci.toml"), "[hashing]\nworkers = 16\n").unwrap();

    std::env::set_var("HASHER_ENV", "ci");
    let config = ConfigLoader::load_layers(ws.path(), None);
    std::env::remove_var("HASHER_ENV");

    assert_eq!(config.unwrap().hashing.workers, Some(16));
}

#[test]
fn test_explicit_config_file_must_exist() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let ws = TempDir::new().unwrap();
    let missing = ws.path().join("nope.toml");

    assert!(ConfigLoader::load_from_file(&missing).is_err());
    assert!(RunContext::new(ws.path().to_path_buf(), Some(missing)).is_err());
}

#[test]
fn test_explicit_config_file_is_used() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let ws = TempDir::new().unwrap();
    let file = ws.path().join("custom.toml");
    fs::write(
        &file,
        "[store]\nindex_path = \"meta/idx.bin\"\n\n[logging]\nformat = \"json\"\n",
    )
    .unwrap();

    let ctx = RunContext::new(ws.path().to_path_buf(), Some(file)).unwrap();
    assert_eq!(ctx.index_path(), ws.path().join("meta/idx.bin"));
    assert_eq!(ctx.config().logging.format, "json");
}

#[test]
fn test_out_of_range_level_fails_validation() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let ws = TempDir::new().unwrap();
    fs::write(ws.path().join("hasher.toml"), "[copy]\ncompression_level = 11\n").unwrap();

    let config = ConfigLoader::load_layers(ws.path(), None).unwrap();
    assert!(config.validate().is_err());
}
