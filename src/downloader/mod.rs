//! Source image downloader
//!
//! Fetches the source image over HTTP(S) within a time bound and a hard byte
//! cap. The body is read chunk by chunk and reading stops one byte past the
//! configured maximum, so a lying or missing Content-Length cannot make the
//! gateway buffer more than `max_image_size + 1` bytes. Enforcing the limit on
//! the returned bytes is the caller's job.
//!
//! There are no retries: a failed fetch fails the request.

pub mod config;
pub mod headers;

pub use config::DownloaderConfig;

use bytes::{Bytes, BytesMut};
use reqwest::{StatusCode, Url};

use crate::error::GatewayError;

/// Shared HTTP client for source fetches
#[derive(Clone)]
pub struct Downloader {
    client: reqwest::Client,
    max_bytes: usize,
}

impl Downloader {
    /// Build the pooled client
    ///
    /// # Errors
    /// Returns an error string if the HTTP client cannot be created
    /// (e.g. TLS backend initialization fails)
    pub fn new(config: &DownloaderConfig, max_image_size: usize) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(config.pool_idle_timeout())
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            max_bytes: max_image_size,
        })
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Fetch the body of `url`, reading at most `max_bytes + 1` bytes
    ///
    /// # Errors
    /// Returns GatewayError::UpstreamFetch if:
    /// - the URL cannot be parsed
    /// - the request fails or times out
    /// - the origin answers with anything but 200
    /// - the body stream breaks
    pub async fn fetch(&self, url: &str) -> Result<Bytes, GatewayError> {
        let parsed = Url::parse(url).map_err(|e| GatewayError::upstream(None, e.to_string()))?;
        let headers = headers::browser_headers(&parsed)
            .map_err(|e| GatewayError::upstream(None, e.to_string()))?;

        let mut response = self
            .client
            .get(parsed)
            .headers(headers)
            .send()
            .await
            .map_err(|e| GatewayError::upstream(None, describe_request_error(&e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(GatewayError::upstream(
                Some(status.as_u16()),
                format!("bad status: {}", status),
            ));
        }

        let cap = self.max_bytes.saturating_add(1);
        let mut body = BytesMut::with_capacity(initial_capacity(response.content_length(), cap));

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| GatewayError::upstream(Some(status.as_u16()), describe_request_error(&e)))?
        {
            let remaining = cap - body.len();
            if chunk.len() >= remaining {
                body.extend_from_slice(&chunk[..remaining]);
                tracing::debug!(url = %url, cap = cap, "Source body reached size cap");
                break;
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body.freeze())
    }
}

/// Pre-size the buffer from Content-Length without trusting it past the cap
fn initial_capacity(content_length: Option<u64>, cap: usize) -> usize {
    const DEFAULT_CAPACITY: usize = 64 * 1024;
    match content_length {
        Some(len) => (len as usize).min(cap),
        None => DEFAULT_CAPACITY.min(cap),
    }
}

fn describe_request_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("timeout: {}", e)
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    }
}
