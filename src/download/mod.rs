//! URL mirroring: map URLs to local paths, fetch them, write them atomically.

pub mod downloader;
pub mod fetch;
pub mod mapper;

pub use downloader::{
    read_url_list, DownloadOptions, DownloadOutcome, DownloadReport, DownloadState,
    DownloadTarget, Downloader,
};
pub use fetch::{ByteStream, Fetcher, HttpFetcher};
pub use mapper::map_url;
