// Shared test utilities: a minimal HTTP origin and image fixtures

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use kagami::authorizer::RequestAuthorizer;
use kagami::cache::{CacheStore, MemoryCacheConfig, MemoryStore};
use kagami::downloader::{Downloader, DownloaderConfig};
use kagami::pipeline::{RequestContext, TransformPipeline};
use kagami::rate_limit::ClientRateLimiter;
use kagami::transform::{EngineConfig, ImageEngine};

/// Canned response served by the mock origin for one path
#[derive(Clone)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    pub delay: Duration,
}

impl MockResponse {
    pub fn ok(content_type: &'static str, body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type,
            body,
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// HTTP/1.1 origin on an ephemeral port, one response per connection
pub struct MockOrigin {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl MockOrigin {
    pub async fn start(routes: HashMap<&'static str, MockResponse>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let routes = Arc::new(routes);

        let task = {
            let hits = Arc::clone(&hits);
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let routes = Arc::clone(&routes);
                    let hits = Arc::clone(&hits);
                    tokio::spawn(async move {
                        let _ = serve(stream, &routes, &hits).await;
                    });
                }
            })
        };

        Self { addr, hits, task }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.addr.port(), path)
    }

    /// Requests received so far, over all paths
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for MockOrigin {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    mut stream: TcpStream,
    routes: &HashMap<&'static str, MockResponse>,
    hits: &AtomicUsize,
) -> std::io::Result<()> {
    let mut buf = Vec::with_capacity(2048);
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    hits.fetch_add(1, Ordering::SeqCst);

    let request = String::from_utf8_lossy(&buf);
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();

    let response = routes.get(path.as_str()).cloned().unwrap_or(MockResponse {
        status: 404,
        content_type: "text/plain",
        body: b"not found".to_vec(),
        delay: Duration::ZERO,
    });
    if !response.delay.is_zero() {
        tokio::time::sleep(response.delay).await;
    }

    let head = format!(
        "HTTP/1.1 {} X\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        response.content_type,
        response.body.len()
    );
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(&response.body).await?;
    stream.shutdown().await
}

/// PNG with a colour gradient, so resampling has something to do
pub fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
            255,
        ])
    });
    encode_png(img)
}

/// PNG whose left half is red and right half is blue
pub fn two_tone_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([0, 0, 255, 255])
        }
    });
    encode_png(img)
}

fn encode_png(img: RgbaImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut out, ImageOutputFormat::Png)
        .unwrap();
    out.into_inner()
}

pub const SVG_SOURCE: &str =
    r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><rect width="10" height="10"/></svg>"#;

/// Pipeline wired for the loopback origin with the given store and limiter
pub fn pipeline_with(
    cache: Arc<dyn CacheStore>,
    rate_limiter: ClientRateLimiter,
    max_image_size: usize,
) -> TransformPipeline {
    TransformPipeline::new(
        RequestAuthorizer::new(vec!["127.0.0.1".to_string()]),
        Arc::new(rate_limiter),
        cache,
        Downloader::new(&DownloaderConfig::default(), max_image_size).unwrap(),
        Arc::new(ImageEngine::new(EngineConfig::default()).unwrap()),
    )
}

pub fn memory_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new(
        &MemoryCacheConfig::default(),
        Duration::from_secs(300),
    ))
}

pub fn unlimited() -> ClientRateLimiter {
    ClientRateLimiter::with_quota(None, 1000, Duration::from_secs(60))
}

pub fn transform_ctx(client_ip: &str, query: &[(&str, &str)]) -> RequestContext {
    RequestContext::new(client_ip, "/transform").with_query_params(
        query
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    )
}
