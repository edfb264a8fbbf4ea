// Integration tests for the Redis cache store
//
// These tests require Docker and are marked with #[ignore]
// Run with: cargo test --test redis_cache_integration_test -- --ignored

mod common;

use std::time::Duration;

use testcontainers::{clients::Cli, RunnableImage};
use testcontainers_modules::redis::Redis;

use common::{gradient_png, pipeline_with, transform_ctx, unlimited, MockOrigin, MockResponse};
use kagami::cache::{CacheKey, CacheStore, CachedArtifact, RedisConfig, RedisStore};

fn store_for(port: u16, prefix: &str, ttl: Duration) -> RedisStore {
    let config = RedisConfig {
        redis_url: format!("127.0.0.1:{}", port),
        redis_key_prefix: prefix.to_string(),
        ..Default::default()
    };
    RedisStore::new(config, ttl).unwrap()
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_set_then_get_round_trips_artifact() {
    let docker = Cli::default();
    let container = docker.run(RunnableImage::from(Redis::default()));
    let store = store_for(container.get_host_port_ipv4(6379), "test", Duration::from_secs(60));

    let key = CacheKey::from_digest("abc123");
    assert!(store.get(&key).await.unwrap().is_none());

    let artifact = CachedArtifact::new(vec![0xffu8, 0xd8, 0xff, 0x00], "image/jpeg");
    store.set(key.clone(), artifact.clone()).await.unwrap();

    let fetched = store.get(&key).await.unwrap();
    assert_eq!(fetched, Some(artifact));

    let stats = store.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.sets, 1);
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_entries_use_prefixed_keys_with_ttl() {
    let docker = Cli::default();
    let container = docker.run(RunnableImage::from(Redis::default()));
    let port = container.get_host_port_ipv4(6379);
    let store = store_for(port, "kagami-test", Duration::from_secs(120));

    let key = CacheKey::from_digest("feedface");
    store
        .set(key.clone(), CachedArtifact::new(&b"bytes"[..], "image/png"))
        .await
        .unwrap();

    let client = redis::Client::open(format!("redis://127.0.0.1:{}", port)).unwrap();
    let mut conn = client.get_multiplexed_async_connection().await.unwrap();
    let ttl: i64 = redis::cmd("TTL")
        .arg("kagami-test:feedface")
        .query_async(&mut conn)
        .await
        .unwrap();
    assert!(ttl > 0 && ttl <= 120, "unexpected ttl {}", ttl);
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_entries_expire_after_ttl() {
    let docker = Cli::default();
    let container = docker.run(RunnableImage::from(Redis::default()));
    let store = store_for(container.get_host_port_ipv4(6379), "test", Duration::from_secs(1));

    let key = CacheKey::from_digest("short-lived");
    store
        .set(key.clone(), CachedArtifact::new(&b"x"[..], "image/webp"))
        .await
        .unwrap();
    assert!(store.get(&key).await.unwrap().is_some());

    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert!(store.get(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unreachable_redis_is_an_error_not_a_panic() {
    // Nothing listens on port 1
    let config = RedisConfig {
        redis_url: "127.0.0.1:1".to_string(),
        connection_timeout_ms: 500,
        ..Default::default()
    };
    let store = RedisStore::new(config, Duration::from_secs(60)).unwrap();
    assert!(store.get(&CacheKey::from_digest("k")).await.is_err());
}

#[tokio::test]
async fn test_pipeline_serves_when_redis_is_down() {
    let mut routes = std::collections::HashMap::new();
    routes.insert("/p.png", MockResponse::ok("image/png", gradient_png(24, 24)));
    let origin = MockOrigin::start(routes).await;

    let config = RedisConfig {
        redis_url: "127.0.0.1:1".to_string(),
        connection_timeout_ms: 300,
        ..Default::default()
    };
    let store = std::sync::Arc::new(RedisStore::new(config, Duration::from_secs(60)).unwrap());
    let pipeline = pipeline_with(store, unlimited(), 1024 * 1024);

    let url = origin.url("/p.png");
    let mut ctx = transform_ctx("10.2.0.1", &[("url", url.as_str()), ("f", "png")]);
    let response = pipeline.handle(&mut ctx).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.header("X-Cache"), Some("MISS"));
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_pipeline_hit_from_redis() {
    let docker = Cli::default();
    let container = docker.run(RunnableImage::from(Redis::default()));
    let store = std::sync::Arc::new(store_for(
        container.get_host_port_ipv4(6379),
        "e2e",
        Duration::from_secs(60),
    ));

    let mut routes = std::collections::HashMap::new();
    routes.insert("/r.png", MockResponse::ok("image/png", gradient_png(64, 48)));
    let origin = MockOrigin::start(routes).await;
    let pipeline = pipeline_with(store.clone(), unlimited(), 1024 * 1024);

    let url = origin.url("/r.png");
    let query = [("url", url.as_str()), ("w", "32"), ("f", "jpeg")];

    let mut first_ctx = transform_ctx("10.2.0.2", &query);
    let first = pipeline.handle(&mut first_ctx).await;
    assert_eq!(first.header("X-Cache"), Some("MISS"));

    let key = first_ctx.cache_key().cloned().unwrap();
    for _ in 0..100 {
        if store.get(&key).await.unwrap().is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let second = pipeline.handle(&mut transform_ctx("10.2.0.2", &query)).await;
    assert_eq!(second.header("X-Cache"), Some("HIT"));
    assert_eq!(second.content_type(), Some("image/jpeg"));
    assert_eq!(second.body, first.body);
    assert_eq!(origin.hits(), 1);
}
