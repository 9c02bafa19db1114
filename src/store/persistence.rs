//! On-disk format for the hash store
//!
//! Layout: 4-byte magic `HSIX`, 4-byte little-endian format version, then
//! bincode(`Vec<FileRecord>`). Writes go to a temp file in the same directory and
//! are renamed into place, so a partial write is never visible under the final name.

use crate::error::StorageError;
use crate::store::FileRecord;
use bincode::Options;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

const INDEX_MAGIC: &[u8; 4] = b"HSIX";
const INDEX_VERSION_V1: u32 = 1;
const HEADER_LEN: usize = 8;

/// Fixed-width integers, and nothing may follow the record list.
fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

/// Read and decode the index. `Ok(None)` when the file does not exist.
pub fn read_index(path: &Path) -> Result<Option<Vec<FileRecord>>, StorageError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(StorageError::IoError(std::io::Error::new(
                e.kind(),
                format!("Failed to read hash store from {:?}: {}", path, e),
            )))
        }
    };
    decode(&bytes)
        .map(Some)
        .map_err(|reason| StorageError::StoreCorrupt {
            path: path.to_path_buf(),
            reason,
        })
}

/// Encode and atomically write the index.
pub fn write_index<'a, I>(path: &Path, records: I) -> Result<(), StorageError>
where
    I: IntoIterator<Item = &'a FileRecord>,
{
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|e| {
        StorageError::IoError(std::io::Error::new(
            e.kind(),
            format!("Failed to create parent directory {:?}: {}", parent, e),
        ))
    })?;

    let serialized = encode(records)?;

    let mut temp = NamedTempFile::new_in(&parent)?;
    temp.write_all(&serialized)?;
    temp.as_file().sync_all()?;

    // Rename into place; on failure the temp file is removed when dropped
    temp.persist(path).map_err(|e| {
        StorageError::IoError(std::io::Error::new(
            e.error.kind(),
            format!("Failed to rename temp file to {:?}: {}", path, e.error),
        ))
    })?;

    Ok(())
}

fn encode<'a, I>(records: I) -> Result<Vec<u8>, StorageError>
where
    I: IntoIterator<Item = &'a FileRecord>,
{
    let records: Vec<&FileRecord> = records.into_iter().collect();
    let payload = codec().serialize(&records).map_err(|e| {
        StorageError::IoError(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Failed to serialize hash store: {}", e),
        ))
    })?;
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(INDEX_MAGIC);
    out.extend_from_slice(&INDEX_VERSION_V1.to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

fn decode(bytes: &[u8]) -> Result<Vec<FileRecord>, String> {
    if bytes.len() < HEADER_LEN {
        return Err("file too short".to_string());
    }
    if &bytes[..4] != INDEX_MAGIC {
        return Err("bad magic".to_string());
    }
    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != INDEX_VERSION_V1 {
        return Err(format!("unsupported format version {}", version));
    }
    codec()
        .deserialize(&bytes[HEADER_LEN..])
        .map_err(|e| format!("failed to decode records: {}", e))
}
