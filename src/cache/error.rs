//! Cache error types
//!
//! None of these reach a client. The pipeline logs them and carries on as if
//! the lookup missed or the write never happened.

/// Cache error types
#[derive(Debug)]
pub enum CacheError {
    /// Redis connection could not be established
    RedisConnectionFailed(String),
    /// Redis command failed
    RedisError(String),
    /// Backend did not answer within the operation timeout
    Timeout(&'static str),
    /// Invalid cache configuration (bad URL, unsupported scheme)
    ConfigurationError(String),
    /// Stored payload could not be encoded or decoded
    SerializationError(String),
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::RedisConnectionFailed(msg) => write!(f, "Redis connection failed: {}", msg),
            CacheError::RedisError(msg) => write!(f, "Redis error: {}", msg),
            CacheError::Timeout(op) => write!(f, "Cache {} timed out", op),
            CacheError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            CacheError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for CacheError {}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::RedisError(err.to_string())
    }
}
