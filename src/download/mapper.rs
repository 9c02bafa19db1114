//! URL to local mirror path mapping.
//!
//! `https://example.com:8443/a/b%20c/?q=1` mirrors to `example.com_8443/a/b c/index.html`.
//! The mapping is pure: no filesystem access, same input same output.

use crate::error::DownloadError;
use std::path::PathBuf;
use url::Url;

/// File name used for directory-like URLs (empty path or trailing `/`).
pub const INDEX_FILE: &str = "index.html";

/// Map `raw` to a relative path under the download root.
///
/// Query and fragment are ignored, so URLs that differ only there map to the same
/// file. Segments that would escape the root (`..`) or name the current directory
/// are dropped.
pub fn map_url(raw: &str) -> Result<PathBuf, DownloadError> {
    let url = Url::parse(raw.trim()).map_err(|e| DownloadError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(DownloadError::UnsupportedScheme(other.to_string())),
    }

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| DownloadError::InvalidUrl {
            url: raw.to_string(),
            reason: "missing host".to_string(),
        })?;
    // `port()` is None for the scheme's default port
    let host_dir = match url.port() {
        Some(port) => format!("{}_{}", sanitize_segment(&percent_decode(host)), port),
        None => sanitize_segment(&percent_decode(host)),
    };

    let mut mapped = PathBuf::from(host_dir);
    let mut pushed = 0usize;
    for raw_segment in url.path().split('/') {
        let decoded = percent_decode(raw_segment);
        if decoded.is_empty() || decoded == "." || decoded == ".." {
            continue;
        }
        mapped.push(sanitize_segment(&decoded));
        pushed += 1;
    }
    if pushed == 0 || url.path().ends_with('/') {
        mapped.push(INDEX_FILE);
    }
    Ok(mapped)
}

/// Replace characters that cannot live inside a single path component.
fn sanitize_segment(segment: &str) -> String {
    segment
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect()
}

/// Decode `%XX` escapes; malformed escapes are kept literally.
///
/// When the decoded bytes are not UTF-8 the input is returned unchanged, so
/// distinct escapes never collapse onto the same replacement character.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(high), Some(low)) = (hex_digit(bytes[i + 1]), hex_digit(bytes[i + 2])) {
                out.push(high << 4 | low);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).unwrap_or_else(|_| input.to_string())
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
