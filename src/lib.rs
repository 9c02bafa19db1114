//! Hasher: content hashing, drift verification and tree mirroring
//!
//! Walks a directory tree, records a BLAKE3 digest per file in a persistent
//! index, re-verifies the index later, and copies or downloads trees with
//! optional gzip compression.

pub mod cli;
pub mod compression;
pub mod concurrency;
pub mod config;
pub mod copy;
pub mod download;
pub mod error;
pub mod logging;
pub mod report;
pub mod store;
pub mod tree;
pub mod types;
pub mod verify;
