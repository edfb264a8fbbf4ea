// Redis cache configuration module

use serde::{Deserialize, Serialize};

use crate::cache::CacheError;
use crate::constants::{DEFAULT_REDIS_KEY_PREFIX, DEFAULT_REDIS_URL};

/// Redis-specific cache configuration
///
/// `redis_url` accepts either a bare `host:port` (the deployment default) or
/// a full `redis://` URL, optionally with credentials and a database path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RedisConfig {
    /// Redis address or URL (default: "localhost:6379")
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Optional password for Redis authentication
    /// Takes precedence over a password embedded in the URL
    #[serde(default)]
    pub redis_password: Option<String>,

    /// Redis database number (default: 0)
    #[serde(default)]
    pub redis_db: u32,

    /// Key prefix for cache entries (default: "kagami")
    #[serde(default = "default_redis_key_prefix")]
    pub redis_key_prefix: String,

    /// Connection timeout in milliseconds (default: 5000 = 5 seconds)
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// Operation timeout in milliseconds (default: 2000 = 2 seconds)
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            redis_password: None,
            redis_db: 0,
            redis_key_prefix: default_redis_key_prefix(),
            connection_timeout_ms: default_connection_timeout_ms(),
            operation_timeout_ms: default_operation_timeout_ms(),
        }
    }
}

impl RedisConfig {
    /// Build the `redis://` URL handed to the client
    ///
    /// # Errors
    /// Returns CacheError::ConfigurationError if:
    /// - the URL does not parse
    /// - the scheme is `rediss` (TLS support is not compiled in)
    /// - the scheme is anything other than `redis`
    pub fn connection_url(&self) -> Result<String, CacheError> {
        let raw = self.redis_url.trim();
        let with_scheme = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("redis://{}", raw)
        };

        let mut url = reqwest::Url::parse(&with_scheme).map_err(|e| {
            CacheError::ConfigurationError(format!("Invalid Redis URL '{}': {}", raw, e))
        })?;

        match url.scheme() {
            "redis" => {}
            "rediss" => {
                return Err(CacheError::ConfigurationError(
                    "rediss:// is not supported (built without TLS)".to_string(),
                ))
            }
            other => {
                return Err(CacheError::ConfigurationError(format!(
                    "Unsupported Redis URL scheme '{}'",
                    other
                )))
            }
        }

        if url.host_str().map(str::is_empty).unwrap_or(true) {
            return Err(CacheError::ConfigurationError(format!(
                "Redis URL '{}' has no host",
                raw
            )));
        }

        if let Some(password) = self.redis_password.as_deref().filter(|p| !p.is_empty()) {
            url.set_password(Some(password)).map_err(|_| {
                CacheError::ConfigurationError("Cannot set password on Redis URL".to_string())
            })?;
        }

        // A database in the URL path wins over redis_db
        if url.path().trim_start_matches('/').is_empty() && self.redis_db != 0 {
            url.set_path(&format!("/{}", self.redis_db));
        }

        Ok(url.to_string())
    }
}

fn default_redis_url() -> String {
    DEFAULT_REDIS_URL.to_string()
}

fn default_redis_key_prefix() -> String {
    DEFAULT_REDIS_KEY_PREFIX.to_string()
}

fn default_connection_timeout_ms() -> u64 {
    5000 // 5 seconds
}

fn default_operation_timeout_ms() -> u64 {
    2000 // 2 seconds
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_can_create_redis_config_from_yaml() {
        let yaml = r#"
redis_url: "redis://cache.internal:6380"
redis_password: "secret"
redis_db: 1
redis_key_prefix: "test"
connection_timeout_ms: 3000
operation_timeout_ms: 1000
"#;

        let config: RedisConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.redis_url, "redis://cache.internal:6380");
        assert_eq!(config.redis_password, Some("secret".to_string()));
        assert_eq!(config.redis_db, 1);
        assert_eq!(config.redis_key_prefix, "test");
        assert_eq!(config.connection_timeout_ms, 3000);
        assert_eq!(config.operation_timeout_ms, 1000);
    }

    #[test]
    fn test_redis_config_defaults() {
        let config: RedisConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, RedisConfig::default());
        assert_eq!(config.redis_url, "localhost:6379");
        assert_eq!(config.redis_key_prefix, "kagami");
    }

    #[rstest]
    #[case("localhost:6379", "redis://localhost:6379")]
    #[case("redis://localhost:6379", "redis://localhost:6379")]
    #[case("redis://user:pw@cache.example.com:6379/2", "redis://user:pw@cache.example.com:6379/2")]
    fn test_connection_url_normalization(#[case] raw: &str, #[case] expected: &str) {
        let config = RedisConfig {
            redis_url: raw.to_string(),
            ..Default::default()
        };
        assert_eq!(config.connection_url().unwrap(), expected);
    }

    #[test]
    fn test_connection_url_applies_password_and_db() {
        let config = RedisConfig {
            redis_url: "cache.example.com:6379".to_string(),
            redis_password: Some("hunter2".to_string()),
            redis_db: 3,
            ..Default::default()
        };
        assert_eq!(
            config.connection_url().unwrap(),
            "redis://:hunter2@cache.example.com:6379/3"
        );
    }

    #[rstest]
    #[case("rediss://secure.example.com:6380")]
    #[case("http://localhost:6379")]
    #[case("redis://")]
    fn test_connection_url_rejects(#[case] raw: &str) {
        let config = RedisConfig {
            redis_url: raw.to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.connection_url(),
            Err(CacheError::ConfigurationError(_))
        ));
    }
}
