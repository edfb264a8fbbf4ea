//! Artifact cache
//!
//! Transformed images are cached under a digest of every parameter that can
//! change their bytes. The cache is strictly an optimization: read failures
//! are treated as misses and write failures are logged and dropped by the
//! caller.
//!
//! Backends:
//! - `redis`: shared across gateway instances (production default)
//! - `memory`: moka-backed, per process
//! - `disabled`: every lookup misses

pub mod config;
pub mod entry;
pub mod error;
pub mod key;
pub mod memory;
pub mod redis;
pub mod stats;
pub mod traits;

use std::sync::Arc;

pub use config::{CacheBackend, CacheConfig, MemoryCacheConfig};
pub use entry::CachedArtifact;
pub use error::CacheError;
pub use key::{CacheKey, CacheKeyBuilder};
pub use memory::{MemoryStore, NullStore};
pub use redis::{RedisConfig, RedisStore};
pub use stats::CacheStats;
pub use traits::CacheStore;

/// Build the configured cache store
///
/// Redis connects lazily on first use, so this never blocks on the network
/// and is safe to call before the server runtime exists.
pub fn build_store(config: &CacheConfig) -> Result<Arc<dyn CacheStore>, CacheError> {
    let store: Arc<dyn CacheStore> = match config.backend {
        CacheBackend::Redis => Arc::new(RedisStore::new(config.redis.clone(), config.ttl())?),
        CacheBackend::Memory => Arc::new(MemoryStore::new(&config.memory, config.ttl())),
        CacheBackend::Disabled => Arc::new(NullStore),
    };

    tracing::info!(
        backend = store.name(),
        ttl_seconds = config.ttl_seconds,
        "Cache store configured"
    );

    Ok(store)
}
