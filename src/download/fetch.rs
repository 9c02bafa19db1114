//! Fetch capability
//!
//! The downloader only needs "give me the body of this URL as a byte stream".
//! `HttpFetcher` is the reqwest implementation; tests substitute an in-memory one.

use crate::error::DownloadError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Body chunks of one response.
pub type ByteStream = BoxStream<'static, Result<Bytes, DownloadError>>;

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Start fetching `url`. A non-success status is an error, not an empty body.
    async fn fetch(&self, url: &str) -> Result<ByteStream, DownloadError>;
}

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_USER_AGENT: &str = concat!("hasher/", env!("CARGO_PKG_VERSION"));

/// reqwest-backed fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// The overall per-download deadline is enforced by the downloader, so the
    /// client only bounds connection setup.
    pub fn new(connect_timeout: Duration, user_agent: &str) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| DownloadError::Http(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<ByteStream, DownloadError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        debug!(url, status = status.as_u16(), "Response received");
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(DownloadError::from))
            .boxed())
    }
}
