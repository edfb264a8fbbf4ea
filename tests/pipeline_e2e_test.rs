// End-to-end tests for the /transform pipeline
//
// Each test runs the real pipeline (downloader, engine, cache) against a
// loopback origin; no proxy server is started.

mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::Quota;
use nonzero_ext::nonzero;
use tokio::sync::Notify;

use common::{
    gradient_png, memory_store, pipeline_with, transform_ctx, two_tone_png, unlimited,
    MockOrigin, MockResponse, SVG_SOURCE,
};
use kagami::cache::{
    CacheError, CacheKey, CacheKeyBuilder, CacheStats, CacheStore, CachedArtifact, MemoryStore,
};
use kagami::pipeline::CacheStatus;
use kagami::rate_limit::ClientRateLimiter;
use kagami::transform::TransformRequest;

const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;

async fn origin_with(path: &'static str, response: MockResponse) -> MockOrigin {
    let mut routes = HashMap::new();
    routes.insert(path, response);
    MockOrigin::start(routes).await
}

#[tokio::test]
async fn test_miss_then_hit_returns_identical_webp() {
    let origin = origin_with("/photo.png", MockResponse::ok("image/png", gradient_png(300, 200))).await;
    let store = memory_store();
    let pipeline = pipeline_with(store.clone(), unlimited(), MAX_IMAGE_SIZE);

    let url = origin.url("/photo.png");
    let query = [
        ("url", url.as_str()),
        ("w", "100"),
        ("h", "100"),
        ("fit", "cover"),
        ("f", "webp"),
        ("q", "80"),
    ];

    let mut first_ctx = transform_ctx("10.1.0.1", &query);
    let first = pipeline.handle(&mut first_ctx).await;
    assert_eq!(first.status, 200);
    assert_eq!(first.header("X-Cache"), Some("MISS"));
    assert_eq!(first.content_type(), Some("image/webp"));
    assert_eq!(
        first.header("Cache-Control"),
        Some("public, max-age=31536000")
    );
    assert_eq!(first_ctx.cache_status(), Some(CacheStatus::Miss));

    let decoded = webp::Decoder::new(&first.body)
        .decode()
        .expect("response should be valid WebP");
    assert_eq!((decoded.width(), decoded.height()), (100, 100));

    // The write is detached; wait for it to land
    let key = first_ctx.cache_key().cloned().unwrap();
    for _ in 0..100 {
        if store.get(&key).await.unwrap().is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let mut second_ctx = transform_ctx("10.1.0.1", &query);
    let second = pipeline.handle(&mut second_ctx).await;
    assert_eq!(second.status, 200);
    assert_eq!(second.header("X-Cache"), Some("HIT"));
    assert_eq!(second.content_type(), Some("image/webp"));
    assert_eq!(second.body, first.body);
    assert_eq!(origin.hits(), 1, "a hit must not contact the origin");
}

#[tokio::test]
async fn test_host_outside_allow_list_is_403() {
    let pipeline = pipeline_with(memory_store(), unlimited(), MAX_IMAGE_SIZE);

    let mut ctx = transform_ctx("10.1.0.2", &[("url", "https://images.other.net/a.png")]);
    let response = pipeline.handle(&mut ctx).await;
    assert_eq!(response.status, 403);
    assert_eq!(response.body.as_ref(), b"Domain not allowed");
}

#[tokio::test]
async fn test_third_rapid_request_is_rate_limited() {
    let origin = origin_with("/a.png", MockResponse::ok("image/png", gradient_png(16, 16))).await;
    let limiter = ClientRateLimiter::with_quota(
        Some(Quota::per_second(nonzero!(2u32))),
        1000,
        Duration::from_secs(60),
    );
    let pipeline = pipeline_with(memory_store(), limiter, MAX_IMAGE_SIZE);
    let url = origin.url("/a.png");

    let statuses: Vec<u16> = {
        let mut statuses = Vec::new();
        for _ in 0..3 {
            let mut ctx = transform_ctx("10.1.0.3", &[("url", url.as_str()), ("f", "png")]);
            statuses.push(pipeline.handle(&mut ctx).await.status);
        }
        statuses
    };
    assert_eq!(statuses, vec![200, 200, 429]);

    // Another client has its own bucket
    let mut other = transform_ctx("10.1.0.4", &[("url", url.as_str()), ("f", "png")]);
    assert_eq!(pipeline.handle(&mut other).await.status, 200);
}

#[tokio::test]
async fn test_rotate_then_flip_order() {
    // Left half red, right half blue
    let origin = origin_with("/two-tone.png", MockResponse::ok("image/png", two_tone_png(8, 4))).await;
    let pipeline = pipeline_with(memory_store(), unlimited(), MAX_IMAGE_SIZE);
    let url = origin.url("/two-tone.png");

    let mut ctx = transform_ctx(
        "10.1.0.5",
        &[("url", url.as_str()), ("rotate", "90"), ("flip", "h"), ("f", "png")],
    );
    let response = pipeline.handle(&mut ctx).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.content_type(), Some("image/png"));

    let out = image::load_from_memory(&response.body).unwrap().to_rgba8();
    assert_eq!(out.dimensions(), (4, 8));
    // Rotating first puts the red half on top; flipping first would put blue there
    assert_eq!(out.get_pixel(0, 0).0, [255, 0, 0, 255]);
    assert_eq!(out.get_pixel(3, 7).0, [0, 0, 255, 255]);
}

#[tokio::test]
async fn test_svg_source_passes_through() {
    let origin = origin_with(
        "/logo.svg",
        MockResponse::ok("image/svg+xml", SVG_SOURCE.as_bytes().to_vec()),
    )
    .await;
    let pipeline = pipeline_with(memory_store(), unlimited(), MAX_IMAGE_SIZE);
    let url = origin.url("/logo.svg");

    let mut ctx = transform_ctx("10.1.0.6", &[("url", url.as_str()), ("w", "50"), ("f", "webp")]);
    let response = pipeline.handle(&mut ctx).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.content_type(), Some("image/svg+xml"));
    assert_eq!(response.body.as_ref(), SVG_SOURCE.as_bytes());
}

#[tokio::test]
async fn test_oversized_source_is_413() {
    let origin = origin_with("/big.bin", MockResponse::ok("image/png", vec![0u8; 4096])).await;
    let pipeline = pipeline_with(memory_store(), unlimited(), 1024);
    let url = origin.url("/big.bin");

    let mut ctx = transform_ctx("10.1.0.7", &[("url", url.as_str())]);
    let response = pipeline.handle(&mut ctx).await;
    assert_eq!(response.status, 413);
}

#[tokio::test]
async fn test_source_at_exact_limit_is_accepted() {
    let body = gradient_png(32, 32);
    let limit = body.len();
    let origin = origin_with("/exact.png", MockResponse::ok("image/png", body)).await;
    let pipeline = pipeline_with(memory_store(), unlimited(), limit);
    let url = origin.url("/exact.png");

    let mut ctx = transform_ctx("10.1.0.8", &[("url", url.as_str()), ("f", "png")]);
    assert_eq!(pipeline.handle(&mut ctx).await.status, 200);
}

#[tokio::test]
async fn test_upstream_error_status_is_502() {
    let origin = MockOrigin::start(HashMap::new()).await;
    let pipeline = pipeline_with(memory_store(), unlimited(), MAX_IMAGE_SIZE);
    let url = origin.url("/missing.png");

    let mut ctx = transform_ctx("10.1.0.9", &[("url", url.as_str())]);
    let response = pipeline.handle(&mut ctx).await;
    assert_eq!(response.status, 502);
}

#[tokio::test]
async fn test_undecodable_source_is_500() {
    let origin = origin_with("/junk.png", MockResponse::ok("image/png", b"definitely not an image".to_vec())).await;
    let pipeline = pipeline_with(memory_store(), unlimited(), MAX_IMAGE_SIZE);
    let url = origin.url("/junk.png");

    let mut ctx = transform_ctx("10.1.0.10", &[("url", url.as_str())]);
    let response = pipeline.handle(&mut ctx).await;
    assert_eq!(response.status, 500);
}

/// Store whose writes block until the test opens the gate
struct GatedStore {
    inner: MemoryStore,
    entered: Notify,
    gate: Notify,
}

impl GatedStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(&Default::default(), Duration::from_secs(300)),
            entered: Notify::new(),
            gate: Notify::new(),
        }
    }
}

#[async_trait]
impl CacheStore for GatedStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedArtifact>, CacheError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: CacheKey, artifact: CachedArtifact) -> Result<(), CacheError> {
        self.entered.notify_one();
        self.gate.notified().await;
        self.inner.set(key, artifact).await
    }

    fn name(&self) -> &'static str {
        "gated"
    }

    fn stats(&self) -> CacheStats {
        self.inner.stats()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cache_write_survives_request_cancellation() {
    let origin = origin_with("/c.png", MockResponse::ok("image/png", gradient_png(40, 40))).await;
    let store = Arc::new(GatedStore::new());
    let pipeline = Arc::new(pipeline_with(store.clone(), unlimited(), MAX_IMAGE_SIZE));
    let url = origin.url("/c.png");

    let request = {
        let pipeline = Arc::clone(&pipeline);
        let url = url.clone();
        tokio::spawn(async move {
            let mut ctx = transform_ctx("10.1.0.11", &[("url", url.as_str()), ("f", "png")]);
            pipeline.handle(&mut ctx).await
        })
    };

    tokio::time::timeout(Duration::from_secs(10), store.entered.notified())
        .await
        .expect("cache write should start");
    request.abort();
    let _ = request.await;

    store.gate.notify_one();

    let params: HashMap<String, String> = [("f".to_string(), "png".to_string())].into();
    let key = CacheKeyBuilder::build(&TransformRequest::from_query(url.as_str(), &params));
    let mut stored = None;
    for _ in 0..100 {
        stored = store.inner.get(&key).await.unwrap();
        if stored.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let stored = stored.expect("cache entry should be written after cancellation");
    assert_eq!(stored.content_type, "image/png");
}

#[tokio::test]
async fn test_concurrent_identical_misses_each_fetch() {
    let origin = origin_with(
        "/slow.png",
        MockResponse::ok("image/png", gradient_png(20, 20)).with_delay(Duration::from_millis(200)),
    )
    .await;
    let pipeline = pipeline_with(memory_store(), unlimited(), MAX_IMAGE_SIZE);
    let url = origin.url("/slow.png");
    let query = [("url", url.as_str()), ("w", "10"), ("f", "png")];

    let mut a = transform_ctx("10.1.0.12", &query);
    let mut b = transform_ctx("10.1.0.13", &query);
    let (first, second) = tokio::join!(pipeline.handle(&mut a), pipeline.handle(&mut b));

    assert_eq!(first.header("X-Cache"), Some("MISS"));
    assert_eq!(second.header("X-Cache"), Some("MISS"));
    assert_eq!(first.body, second.body);
    // No coordination between concurrent misses for one key
    assert_eq!(origin.hits(), 2);
}
