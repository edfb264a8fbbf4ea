//! Memory cache implementation
//!
//! This module provides in-process stores:
//! - `MemoryStore`: size-bounded TTL cache backed by moka
//! - `NullStore`: no-op store for disabled caching

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::config::MemoryCacheConfig;
use super::entry::CachedArtifact;
use super::error::CacheError;
use super::key::CacheKey;
use super::stats::{CacheStats, CacheStatsTracker};
use super::traits::CacheStore;

/// MemoryStore wraps moka for the CacheStore trait
pub struct MemoryStore {
    cache: moka::future::Cache<CacheKey, CachedArtifact>,
    stats: Arc<CacheStatsTracker>,
}

impl MemoryStore {
    pub fn new(config: &MemoryCacheConfig, ttl: Duration) -> Self {
        let cache = moka::future::Cache::builder()
            .max_capacity(config.max_cache_size_bytes())
            .time_to_live(ttl)
            .weigher(|_key, artifact: &CachedArtifact| {
                let size = artifact.size_bytes();
                if size > u32::MAX as usize {
                    u32::MAX
                } else {
                    size as u32
                }
            })
            .build();

        Self {
            cache,
            stats: Arc::new(CacheStatsTracker::default()),
        }
    }

    /// Run pending maintenance tasks
    /// Forces moka to process pending evictions and expirations
    pub async fn run_pending(&self) {
        self.cache.run_pending_tasks().await;
    }

    /// Approximate entry count
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    pub fn weighted_size(&self) -> u64 {
        self.cache.weighted_size()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedArtifact>, CacheError> {
        match self.cache.get(key).await {
            Some(artifact) => {
                self.stats.increment_hits();
                Ok(Some(artifact))
            }
            None => {
                self.stats.increment_misses();
                Ok(None)
            }
        }
    }

    async fn set(&self, key: CacheKey, artifact: CachedArtifact) -> Result<(), CacheError> {
        self.cache.insert(key, artifact).await;
        self.stats.increment_sets();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }

    fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }
}

/// NullStore is a no-op store used when caching is disabled
pub struct NullStore;

#[async_trait]
impl CacheStore for NullStore {
    async fn get(&self, _key: &CacheKey) -> Result<Option<CachedArtifact>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: CacheKey, _artifact: CachedArtifact) -> Result<(), CacheError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "disabled"
    }

    fn stats(&self) -> CacheStats {
        CacheStats::default()
    }
}
