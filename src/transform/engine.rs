//! Bounded image worker pool
//!
//! Decoding, pixel work and encoding are CPU bound, so they run on a
//! dedicated rayon pool sized by `EngineConfig::concurrency` instead of the
//! async runtime. Callers await the result through a oneshot channel.
//!
//! The engine is built once at startup and shared behind an `Arc`. After
//! `shutdown()` every new job fails with `ImageError::EngineShutdown`.
//! A job that panics fails its own request and leaves the pool serving.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tokio::sync::oneshot;

use super::config::EngineConfig;
use super::error::ImageError;
use super::params::TransformRequest;
use super::processor::{self, TransformedImage};

pub struct ImageEngine {
    pool: Mutex<Option<Arc<ThreadPool>>>,
    closed: AtomicBool,
    config: EngineConfig,
}

impl ImageEngine {
    pub fn new(config: EngineConfig) -> Result<Self, ImageError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.concurrency.max(1))
            .thread_name(|i| format!("kagami-image-{}", i))
            .build()
            .map_err(|e| ImageError::engine_failure(e.to_string()))?;

        tracing::info!(
            concurrency = config.concurrency.max(1),
            max_source_pixels = config.max_source_pixels,
            "Image engine started"
        );

        Ok(Self {
            pool: Mutex::new(Some(Arc::new(pool))),
            closed: AtomicBool::new(false),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Transform `data` on the worker pool
    pub async fn transform(
        &self,
        data: Bytes,
        request: TransformRequest,
    ) -> Result<TransformedImage, ImageError> {
        let max_pixels = self.config.max_source_pixels;
        self.run(move || processor::process(&data, &request, max_pixels))
            .await?
    }

    /// Run `job` on the pool and wait for its result
    pub async fn run<F, T>(&self, job: F) -> Result<T, ImageError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let pool = {
            let guard = self.pool.lock();
            match guard.as_ref() {
                Some(pool) if !self.is_shut_down() => Arc::clone(pool),
                _ => return Err(ImageError::EngineShutdown),
            }
        };

        let (tx, rx) = oneshot::channel();
        pool.spawn(move || {
            // A panic must not unwind into rayon, which aborts the process
            let result = catch_unwind(AssertUnwindSafe(job)).map_err(|payload| {
                let message = panic_message(payload.as_ref());
                tracing::error!(error = %message, "Image job panicked");
                ImageError::engine_failure(format!("job panicked: {}", message))
            });
            // The receiver may be gone if the request was cancelled
            let _ = tx.send(result);
        });

        rx.await
            .map_err(|_| ImageError::engine_failure("worker dropped the job"))?
    }

    /// Stop accepting work and release the pool
    ///
    /// Jobs already queued still run to completion. Returns `false` if the
    /// engine was already shut down.
    pub fn shutdown(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        let pool = self.pool.lock().take();
        drop(pool);
        tracing::info!("Image engine shut down");
        true
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl Drop for ImageEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
