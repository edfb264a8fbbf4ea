//! Response assembly
//!
//! `GatewayResponse` is framework independent: the proxy layer copies its
//! status, headers and body onto the Pingora session.

use bytes::Bytes;

use crate::constants::IMAGE_CACHE_CONTROL;
use crate::error::GatewayError;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const CACHE_CONTROL: &str = "Cache-Control";
pub const X_CACHE: &str = "X-Cache";

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Whether an image came from the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: Bytes,
}

impl GatewayResponse {
    pub fn new(status: u16, content_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: vec![(CONTENT_TYPE, content_type.into())],
            body: body.into(),
        }
    }

    pub fn text(status: u16, body: impl Into<Bytes>) -> Self {
        Self::new(status, TEXT_PLAIN, body)
    }

    /// Plain-text error response with the error's status
    pub fn from_error(err: &GatewayError) -> Self {
        Self::text(err.status_code(), err.body())
    }

    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// First header value with `name`, compared case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE)
    }
}

/// Builds successful image responses
pub struct ResponseDispatcher;

impl ResponseDispatcher {
    /// Image payload written verbatim with long-lived caching headers
    pub fn image(body: Bytes, content_type: &str, cache: CacheStatus) -> GatewayResponse {
        GatewayResponse::new(200, content_type, body)
            .with_header(X_CACHE, cache.as_str())
            .with_header(CACHE_CONTROL, IMAGE_CACHE_CONTROL)
    }
}
