//! HTTP transport seam
//!
//! The engine talks to endpoints through the [`Transport`] trait so tests
//! can script transfers without a live server. [`HttpTransport`] is the
//! production implementation backed by `reqwest` with streamed bodies.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, TryStreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};

use crate::{ByrateError, Result};

/// Incremental byte stream over a download response body
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Abstraction over the wire operations a session needs
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the download response as an incremental chunk stream
    ///
    /// Implementations that cannot expose the body incrementally must
    /// return [`ByrateError::UnsupportedTransport`]; buffering the whole
    /// response would defeat progress reporting.
    async fn open_download(&self, url: Url) -> Result<ByteStream>;

    /// Issue one whole-payload upload request, awaited to completion
    ///
    /// A non-success response status maps to [`ByrateError::UpstreamStatus`].
    async fn send_upload(&self, url: Url, payload: Bytes) -> Result<()>;
}

/// Production transport backed by a shared HTTP client
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| ByrateError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open_download(&self, url: Url) -> Result<ByteStream> {
        let response = self.client.get(url).send().await?;
        let stream = response.bytes_stream().map_err(ByrateError::from);

        Ok(Box::pin(stream))
    }

    async fn send_upload(&self, url: Url, payload: Bytes) -> Result<()> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ByrateError::UpstreamStatus(status.as_u16()));
        }

        Ok(())
    }
}
