//! Core identifiers shared across the crate.

/// BLAKE3 content digest (32 bytes).
pub type Hash = [u8; 32];

/// Lowercase hex rendering of a digest.
pub fn hash_to_hex(hash: &Hash) -> String {
    hex::encode(hash)
}

/// Parse a 64-character hex string back into a digest.
pub fn hash_from_hex(s: &str) -> Option<Hash> {
    let bytes = hex::decode(s).ok()?;
    bytes.try_into().ok()
}

/// Milliseconds since the unix epoch.
pub fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
