// Error types module

use thiserror::Error;

use crate::transform::ImageError;

/// Errors surfaced to the caller of `/transform`
///
/// Each variant maps to exactly one HTTP status. Cache failures never show up
/// here; they are logged and treated as a miss or a no-op.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing or unparsable source URL
    #[error("{0}")]
    InvalidInput(String),

    /// Source host is not on the allow-list
    #[error("Domain not allowed")]
    AuthorizationDenied,

    /// Client exhausted its token bucket
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Network failure or non-success status from the source origin
    #[error("Failed to download image: {message}")]
    UpstreamFetch {
        /// Upstream HTTP status, if a response was received
        status: Option<u16>,
        message: String,
    },

    /// Downloaded source exceeded the configured maximum
    #[error("Image too large")]
    PayloadTooLarge { limit: usize },

    /// Any image engine stage failed
    #[error("Failed to transform image: {0}")]
    Transform(#[from] ImageError),
}

impl GatewayError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        GatewayError::InvalidInput(message.into())
    }

    pub fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        GatewayError::UpstreamFetch {
            status,
            message: message.into(),
        }
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::InvalidInput(_) => 400,
            GatewayError::AuthorizationDenied => 403,
            GatewayError::RateLimited => 429,
            GatewayError::UpstreamFetch { .. } => 502,
            GatewayError::PayloadTooLarge { .. } => 413,
            GatewayError::Transform(_) => 500,
        }
    }

    /// Plain-text response body
    pub fn body(&self) -> String {
        self.to_string()
    }

    /// Short label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::InvalidInput(_) => "invalid_input",
            GatewayError::AuthorizationDenied => "authorization_denied",
            GatewayError::RateLimited => "rate_limited",
            GatewayError::UpstreamFetch { .. } => "upstream_fetch",
            GatewayError::PayloadTooLarge { .. } => "payload_too_large",
            GatewayError::Transform(_) => "transform",
        }
    }
}
