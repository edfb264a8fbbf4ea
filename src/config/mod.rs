// Configuration module
//
// Configuration is layered: built-in defaults, then an optional YAML file
// (with ${VAR} substitution), then the deployment env vars (PORT, REDIS_URL,
// ALLOWED_DOMAINS, ...), which always win.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod gateway;
pub mod rate_limit;
pub mod server;

pub use gateway::{parse_domain_list, GatewayConfig};
pub use rate_limit::RateLimitConfig;
pub use server::ServerConfig;

pub use crate::cache::{CacheBackend, CacheConfig, RedisConfig};
pub use crate::downloader::DownloaderConfig;
pub use crate::transform::EngineConfig;

/// Top-level gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub downloader: DownloaderConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        let mut missing = None;
        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            let var_name = &caps[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    missing.get_or_insert_with(|| var_name.to_string());
                    String::new()
                }
            }
        });

        if let Some(var_name) = missing {
            return Err(format!(
                "Environment variable '{}' is referenced but not set",
                var_name
            ));
        }

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read {}: {}", path.as_ref().display(), e))?;
        Self::from_yaml_with_env(&contents)
    }

    /// Load the effective configuration for the process
    ///
    /// Reads the YAML file when one is given, otherwise starts from the
    /// defaults, then applies the deployment env vars on top.
    pub fn load(path: Option<&Path>) -> Result<Self, String> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply the deployment env vars using the given lookup
    ///
    /// Empty values are treated as unset. Numeric values that fail to parse
    /// leave the current setting untouched.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = get("PORT").and_then(|v| v.trim().parse().ok()) {
            self.server.port = port;
        }
        if let Some(url) = get("REDIS_URL") {
            self.cache.redis.redis_url = url.trim().to_string();
        }
        if let Some(password) = get("REDIS_PASSWORD") {
            self.cache.redis.redis_password = Some(password);
        }
        if let Some(domains) = get("ALLOWED_DOMAINS") {
            self.gateway.allowed_domains = parse_domain_list(&domains);
        }
        if let Some(ttl) = get("CACHE_TTL").and_then(|v| v.trim().parse().ok()) {
            self.cache.ttl_seconds = ttl;
        }
        if let Some(size) = get("MAX_IMAGE_SIZE").and_then(|v| v.trim().parse().ok()) {
            self.gateway.max_image_size = size;
        }
        if let Some(rps) = get("RATE_LIMIT").and_then(|v| v.trim().parse().ok()) {
            self.rate_limit.requests_per_second = rps;
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be greater than 0".to_string());
        }
        if self.server.threads == 0 {
            return Err("server.threads must be greater than 0".to_string());
        }
        if self.gateway.max_image_size == 0 {
            return Err("gateway.max_image_size must be greater than 0".to_string());
        }
        if self.rate_limit.enabled && self.rate_limit.requests_per_second == 0 {
            return Err(
                "rate_limit.requests_per_second must be greater than 0 when enabled".to_string(),
            );
        }
        if self.engine.concurrency == 0 {
            return Err("engine.concurrency must be greater than 0".to_string());
        }
        if self.downloader.timeout_secs == 0 {
            return Err("downloader.timeout_secs must be greater than 0".to_string());
        }
        if self.cache.backend == CacheBackend::Redis {
            self.cache
                .redis
                .connection_url()
                .map_err(|e| format!("cache.redis: {}", e))?;
        }
        if self.gateway.allowed_domains.is_empty() {
            tracing::warn!("gateway.allowed_domains is empty, every transform request will be denied");
        }
        Ok(())
    }
}
