//! Content hashing using BLAKE3
//!
//! A digest is a function of the bytes alone: path, mtime and permissions never
//! contribute. Files are streamed through a fixed-size buffer, so memory use does
//! not grow with file size.

use crate::types::Hash;
use blake3::Hasher;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Default read buffer for streaming file content.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// BLAKE3 digest of zero-length input.
pub const EMPTY_DIGEST_HEX: &str =
    "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262";

/// Result of hashing one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileDigest {
    pub size: u64,
    pub hash: Hash,
}

/// Compute content hash for in-memory bytes
pub fn compute_content_hash(content: &[u8]) -> Hash {
    let mut hasher = Hasher::new();
    hasher.update(content);
    *hasher.finalize().as_bytes()
}

/// Stream a reader into a digest using a buffer of `buffer_size` bytes.
///
/// Returns the number of bytes consumed alongside the digest.
pub fn hash_reader<R: Read>(mut reader: R, buffer_size: usize) -> io::Result<FileDigest> {
    let mut hasher = Hasher::new();
    let mut buf = vec![0u8; buffer_size.max(1)];
    let mut size = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
        size += n as u64;
    }
    Ok(FileDigest {
        size,
        hash: *hasher.finalize().as_bytes(),
    })
}

/// Hash a file on disk.
///
/// Fails with `InvalidInput` when the path is not a regular file.
pub fn hash_file(path: &Path, buffer_size: usize) -> io::Result<FileDigest> {
    let file = File::open(path)?;
    if !file.metadata()?.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a regular file", path.display()),
        ));
    }
    hash_reader(file, buffer_size)
}
