// Cache configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::redis::RedisConfig;
use crate::constants::{DEFAULT_CACHE_TTL_SECS, DEFAULT_MEMORY_CACHE_MB};

/// Which store backs the artifact cache
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Redis,
    Memory,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,
    /// Artifact lifetime in seconds
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
    #[serde(default)]
    pub memory: MemoryCacheConfig,
    #[serde(default)]
    pub redis: RedisConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            ttl_seconds: default_ttl_seconds(),
            memory: MemoryCacheConfig::default(),
            redis: RedisConfig::default(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryCacheConfig {
    #[serde(default = "default_max_cache_size_mb")]
    pub max_cache_size_mb: u64,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_cache_size_mb: default_max_cache_size_mb(),
        }
    }
}

impl MemoryCacheConfig {
    /// Convert max_cache_size_mb to bytes
    pub fn max_cache_size_bytes(&self) -> u64 {
        self.max_cache_size_mb * 1024 * 1024
    }
}

fn default_ttl_seconds() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

fn default_max_cache_size_mb() -> u64 {
    DEFAULT_MEMORY_CACHE_MB
}
