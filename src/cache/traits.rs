//! Cache store trait definition
//!
//! Every backend (Redis, moka, the no-op store) implements `CacheStore`. The
//! pipeline only ever talks to `Arc<dyn CacheStore>`.

use async_trait::async_trait;

use super::entry::CachedArtifact;
use super::error::CacheError;
use super::key::CacheKey;
use super::stats::CacheStats;

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up an artifact
    /// Returns Ok(None) on a miss or when the entry has expired
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedArtifact>, CacheError>;

    /// Store an artifact with the backend's configured TTL
    /// Overwrites an existing entry; writing the same artifact twice is harmless
    async fn set(&self, key: CacheKey, artifact: CachedArtifact) -> Result<(), CacheError>;

    /// Short backend name for logs and metrics
    fn name(&self) -> &'static str;

    /// Counters since process start
    fn stats(&self) -> CacheStats;
}
