//! Filesystem traversal and content hashing
//!
//! Walks a tree in a stable order, normalizes paths into index keys and
//! hashes file contents with BLAKE3.

pub mod hasher;
pub mod indexer;
pub mod path;
pub mod walker;
