// Redis cache store
//
// The connection is established lazily on first use so the store can be
// built before the server runtime exists. ConnectionManager multiplexes all
// requests over one connection and reconnects on its own.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

use super::config::RedisConfig;
use super::serialization::{deserialize_artifact, serialize_artifact};
use crate::cache::stats::CacheStatsTracker;
use crate::cache::{CacheError, CacheKey, CacheStats, CacheStore, CachedArtifact};

/// Redis-backed artifact store
pub struct RedisStore {
    client: Client,
    connection: OnceCell<ConnectionManager>,
    config: RedisConfig,
    ttl: Duration,
    stats: Arc<CacheStatsTracker>,
}

impl RedisStore {
    /// Creates a store without connecting
    ///
    /// # Errors
    /// Returns CacheError::ConfigurationError if the URL is invalid or uses
    /// an unsupported scheme
    pub fn new(config: RedisConfig, ttl: Duration) -> Result<Self, CacheError> {
        let url = config.connection_url()?;
        let client = Client::open(url.as_str())
            .map_err(|e| CacheError::ConfigurationError(format!("Invalid Redis URL: {}", e)))?;

        Ok(Self {
            client,
            connection: OnceCell::new(),
            config,
            ttl,
            stats: Arc::new(CacheStatsTracker::default()),
        })
    }

    /// Full Redis key for a cache key: "{prefix}:{digest}"
    pub fn redis_key(&self, key: &CacheKey) -> String {
        format!("{}:{}", self.config.redis_key_prefix, key)
    }

    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        let timeout = Duration::from_millis(self.config.connection_timeout_ms);
        let manager = self
            .connection
            .get_or_try_init(|| async {
                let connect = ConnectionManager::new(self.client.clone());
                match tokio::time::timeout(timeout, connect).await {
                    Ok(Ok(manager)) => {
                        tracing::info!(
                            prefix = %self.config.redis_key_prefix,
                            "Connected to Redis"
                        );
                        Ok(manager)
                    }
                    Ok(Err(e)) => Err(CacheError::RedisConnectionFailed(e.to_string())),
                    Err(_) => Err(CacheError::Timeout("connect")),
                }
            })
            .await?;
        Ok(manager.clone())
    }

    fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.config.operation_timeout_ms)
    }

    async fn fetch(&self, key: &CacheKey) -> Result<Option<CachedArtifact>, CacheError> {
        let mut conn = self.connection().await?;
        let redis_key = self.redis_key(key);

        let raw: Option<Vec<u8>> =
            tokio::time::timeout(self.operation_timeout(), conn.get(&redis_key))
                .await
                .map_err(|_| CacheError::Timeout("get"))??;

        raw.map(|bytes| deserialize_artifact(&bytes)).transpose()
    }

    async fn store(&self, key: &CacheKey, artifact: &CachedArtifact) -> Result<(), CacheError> {
        let payload = serialize_artifact(artifact)?;
        let mut conn = self.connection().await?;
        let redis_key = self.redis_key(key);
        let ttl_secs = self.ttl.as_secs().max(1);

        tokio::time::timeout(
            self.operation_timeout(),
            conn.set_ex::<_, _, ()>(&redis_key, payload, ttl_secs),
        )
        .await
        .map_err(|_| CacheError::Timeout("set"))??;

        Ok(())
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedArtifact>, CacheError> {
        match self.fetch(key).await {
            Ok(Some(artifact)) => {
                self.stats.increment_hits();
                Ok(Some(artifact))
            }
            Ok(None) => {
                self.stats.increment_misses();
                Ok(None)
            }
            Err(e) => {
                self.stats.increment_errors();
                Err(e)
            }
        }
    }

    async fn set(&self, key: CacheKey, artifact: CachedArtifact) -> Result<(), CacheError> {
        match self.store(&key, &artifact).await {
            Ok(()) => {
                self.stats.increment_sets();
                Ok(())
            }
            Err(e) => {
                self.stats.increment_errors();
                Err(e)
            }
        }
    }

    fn name(&self) -> &'static str {
        "redis"
    }

    fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }
}
