//! Gzip output for copy and download

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_LEVEL: u32 = 6;

const GZIP_EXTENSION: &str = "gz";

/// Gzip settings shared by the copy and download writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GzipCompression {
    level: u32,
}

impl GzipCompression {
    /// Level is clamped to 1..=9.
    pub fn new(level: u32) -> Self {
        Self {
            level: level.clamp(1, 9),
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// Wrap a writer so everything written to it is gzip-encoded.
    ///
    /// Call `finish()` on the encoder to flush the trailer.
    pub fn wrap<W: Write>(&self, writer: W) -> GzEncoder<W> {
        GzEncoder::new(writer, Compression::new(self.level))
    }

    pub fn extension(&self) -> &'static str {
        GZIP_EXTENSION
    }

    /// `path` with `.gz` appended to its full file name (`a/b.txt` -> `a/b.txt.gz`).
    pub fn artifact_path(&self, path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(".");
        name.push(GZIP_EXTENSION);
        PathBuf::from(name)
    }

    /// Whether `path` already looks like one of our compressed outputs.
    pub fn is_artifact(path: &Path) -> bool {
        path.extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case(GZIP_EXTENSION))
    }
}

impl Default for GzipCompression {
    fn default() -> Self {
        Self::new(DEFAULT_LEVEL)
    }
}
