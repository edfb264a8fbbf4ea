// Request pipeline module - per-request context and the /transform orchestration
//
// Order of gates for a transform request:
//   rate limit -> authorize -> cache key -> cache get
//   -> download -> size check -> svg sniff / transform -> detached cache set

pub mod response;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::authorizer::RequestAuthorizer;
use crate::cache::{self, CacheKey, CacheKeyBuilder, CacheStore, CachedArtifact};
use crate::config::Config;
use crate::downloader::Downloader;
use crate::error::GatewayError;
use crate::metrics::GatewayMetrics;
use crate::rate_limit::ClientRateLimiter;
use crate::transform::{is_svg, ImageEngine, OutputFormat, TransformRequest};

pub use response::{CacheStatus, GatewayResponse, ResponseDispatcher};

/// Information about one inbound request as it flows through the pipeline
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    client_ip: String,
    path: String,
    query_params: HashMap<String, String>,
    started: Instant,
    cache_key: Option<CacheKey>,
    cache_status: Option<CacheStatus>,
}

impl RequestContext {
    /// Generates a UUID v4 request id and starts the request clock
    pub fn new(client_ip: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            client_ip: client_ip.into(),
            path: path.into(),
            query_params: HashMap::new(),
            started: Instant::now(),
            cache_key: None,
            cache_status: None,
        }
    }

    pub fn with_query_params(mut self, query_params: HashMap<String, String>) -> Self {
        self.query_params = query_params;
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn client_ip(&self) -> &str {
        &self.client_ip
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn cache_key(&self) -> Option<&CacheKey> {
        self.cache_key.as_ref()
    }

    pub fn cache_status(&self) -> Option<CacheStatus> {
        self.cache_status
    }
}

/// The /transform orchestration
///
/// Collaborators are shared handles, so one pipeline serves every request.
pub struct TransformPipeline {
    authorizer: RequestAuthorizer,
    rate_limiter: Arc<ClientRateLimiter>,
    cache: Arc<dyn CacheStore>,
    downloader: Downloader,
    engine: Arc<ImageEngine>,
}

impl TransformPipeline {
    pub fn new(
        authorizer: RequestAuthorizer,
        rate_limiter: Arc<ClientRateLimiter>,
        cache: Arc<dyn CacheStore>,
        downloader: Downloader,
        engine: Arc<ImageEngine>,
    ) -> Self {
        Self {
            authorizer,
            rate_limiter,
            cache,
            downloader,
            engine,
        }
    }

    /// Build every collaborator from configuration
    ///
    /// # Errors
    /// Returns a description of the first collaborator that failed to build
    pub fn from_config(config: &Config) -> Result<Self, String> {
        let cache = cache::build_store(&config.cache).map_err(|e| e.to_string())?;
        let downloader = Downloader::new(&config.downloader, config.gateway.max_image_size)?;
        let engine = ImageEngine::new(config.engine.clone()).map_err(|e| e.to_string())?;

        Ok(Self::new(
            RequestAuthorizer::new(config.gateway.allowed_domains.clone()),
            Arc::new(ClientRateLimiter::new(&config.rate_limit)),
            cache,
            downloader,
            Arc::new(engine),
        ))
    }

    pub fn engine(&self) -> &Arc<ImageEngine> {
        &self.engine
    }

    pub fn rate_limiter(&self) -> &Arc<ClientRateLimiter> {
        &self.rate_limiter
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    /// Run the pipeline and turn any failure into its error response
    pub async fn handle(&self, ctx: &mut RequestContext) -> GatewayResponse {
        match self.run(ctx).await {
            Ok(response) => response,
            Err(err) => {
                let metrics = GatewayMetrics::global();
                metrics.record_error(err.kind());
                match &err {
                    GatewayError::Transform(_) | GatewayError::UpstreamFetch { .. } => {
                        tracing::error!(
                            request_id = %ctx.request_id(),
                            client_ip = %ctx.client_ip(),
                            error = %err,
                            kind = err.kind(),
                            "Transform request failed"
                        );
                    }
                    _ => {
                        tracing::info!(
                            request_id = %ctx.request_id(),
                            client_ip = %ctx.client_ip(),
                            error = %err,
                            kind = err.kind(),
                            "Transform request rejected"
                        );
                    }
                }
                GatewayResponse::from_error(&err)
            }
        }
    }

    /// Run the pipeline, surfacing the first failing gate
    pub async fn run(&self, ctx: &mut RequestContext) -> Result<GatewayResponse, GatewayError> {
        let metrics = GatewayMetrics::global();

        if !self.rate_limiter.check(ctx.client_ip()) {
            metrics.rate_limited.inc();
            return Err(GatewayError::RateLimited);
        }

        let url = self.authorizer.check(ctx.query_param("url"))?;
        let request = TransformRequest::from_query(url.as_str(), ctx.query_params());

        let key = CacheKeyBuilder::build(&request);
        ctx.cache_key = Some(key.clone());

        if let Some(artifact) = self.lookup(ctx, &key).await {
            ctx.cache_status = Some(CacheStatus::Hit);
            return Ok(ResponseDispatcher::image(
                artifact.data,
                &artifact.content_type,
                CacheStatus::Hit,
            ));
        }
        ctx.cache_status = Some(CacheStatus::Miss);

        let source = self.downloader.fetch(&request.url).await.map_err(|e| {
            metrics.upstream_failures.inc();
            e
        })?;

        if source.len() > self.downloader.max_bytes() {
            return Err(GatewayError::PayloadTooLarge {
                limit: self.downloader.max_bytes(),
            });
        }

        let artifact = if is_svg(&source) {
            tracing::debug!(request_id = %ctx.request_id(), "Vector source, passing through");
            CachedArtifact::new(source, OutputFormat::Svg.content_type())
        } else {
            let _timer = metrics.start_transform_timer(request.format.for_raster().as_str());
            let output = self.engine.transform(source, request).await?;
            tracing::debug!(
                request_id = %ctx.request_id(),
                original_width = output.original_size.0,
                original_height = output.original_size.1,
                width = output.output_size.0,
                height = output.output_size.1,
                bytes = output.data.len(),
                "Image transformed"
            );
            let content_type = output.content_type();
            CachedArtifact::new(output.data, content_type)
        };

        self.store_detached(key, artifact.clone());

        Ok(ResponseDispatcher::image(
            artifact.data,
            &artifact.content_type,
            CacheStatus::Miss,
        ))
    }

    /// Cache lookup; backend failures count as a miss
    async fn lookup(&self, ctx: &RequestContext, key: &CacheKey) -> Option<CachedArtifact> {
        let metrics = GatewayMetrics::global();
        match self.cache.get(key).await {
            Ok(Some(artifact)) => {
                metrics.cache_hits.inc();
                Some(artifact)
            }
            Ok(None) => {
                metrics.cache_misses.inc();
                None
            }
            Err(e) => {
                metrics.cache_errors.inc();
                metrics.cache_misses.inc();
                tracing::warn!(
                    request_id = %ctx.request_id(),
                    cache_key = %key,
                    error = %e,
                    "Cache get failed, treating as miss"
                );
                None
            }
        }
    }

    /// Write the artifact on its own task
    ///
    /// The write outlives the request: a client disconnecting after this
    /// point does not cancel it.
    fn store_detached(&self, key: CacheKey, artifact: CachedArtifact) {
        let cache = Arc::clone(&self.cache);
        tokio::spawn(async move {
            if let Err(e) = cache.set(key.clone(), artifact).await {
                GatewayMetrics::global().cache_errors.inc();
                tracing::warn!(cache_key = %key, error = %e, "Cache set failed");
            }
        });
    }
}
