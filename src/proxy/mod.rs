// Proxy module - Pingora ProxyHttp implementation
// Every response is produced in request_filter; nothing is proxied upstream.

pub mod helpers;
pub mod special_endpoints;

use async_trait::async_trait;
use bytes::Bytes;
use pingora_core::upstreams::peer::HttpPeer;
use pingora_core::{Error, ErrorType, Result};
use pingora_http::ResponseHeader;
use pingora_proxy::{ProxyHttp, Session};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::metrics::GatewayMetrics;
use crate::pipeline::{GatewayResponse, RequestContext, TransformPipeline};

/// CORS headers carried by every response
pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET, OPTIONS"),
    ("Access-Control-Allow-Headers", "Content-Type"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Preflight,
    Transform,
    Health,
    Metrics,
    MethodNotAllowed,
    NotFound,
}

impl Route {
    pub fn classify(method: &str, path: &str) -> Self {
        if method.eq_ignore_ascii_case("OPTIONS") {
            return Route::Preflight;
        }
        let route = match path {
            "/transform" => Route::Transform,
            "/health" => Route::Health,
            "/metrics" => Route::Metrics,
            _ => return Route::NotFound,
        };
        if method.eq_ignore_ascii_case("GET") {
            route
        } else {
            Route::MethodNotAllowed
        }
    }

    /// Metrics label
    pub fn label(&self) -> &'static str {
        match self {
            Route::Preflight => "preflight",
            Route::Transform => "transform",
            Route::Health => "health",
            Route::Metrics => "metrics",
            Route::MethodNotAllowed | Route::NotFound => "other",
        }
    }

    /// Image bodies are already compressed
    pub fn compressible(&self) -> bool {
        !matches!(self, Route::Transform)
    }
}

/// Per-connection settings applied to each downstream session
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyOptions {
    pub trust_forwarded_for: bool,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    /// Keep-alive idle time in seconds
    pub keepalive_secs: u64,
}

impl ProxyOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            trust_forwarded_for: config.gateway.trust_forwarded_for,
            read_timeout: config.server.read_timeout(),
            write_timeout: config.server.write_timeout(),
            keepalive_secs: config.server.idle_timeout_secs,
        }
    }
}

/// KagamiProxy implements the Pingora ProxyHttp trait
pub struct KagamiProxy {
    pipeline: Arc<TransformPipeline>,
    options: ProxyOptions,
}

impl KagamiProxy {
    pub fn new(pipeline: Arc<TransformPipeline>, options: ProxyOptions) -> Self {
        Self { pipeline, options }
    }

    pub fn pipeline(&self) -> &Arc<TransformPipeline> {
        &self.pipeline
    }

    async fn route(&self, route: Route, ctx: &mut RequestContext) -> GatewayResponse {
        match route {
            Route::Preflight => special_endpoints::handle_preflight(),
            Route::Transform => self.pipeline.handle(ctx).await,
            Route::Health => special_endpoints::handle_health(),
            Route::Metrics => special_endpoints::handle_metrics(GatewayMetrics::global()),
            Route::MethodNotAllowed => special_endpoints::handle_method_not_allowed(),
            Route::NotFound => special_endpoints::handle_not_found(),
        }
    }
}

/// Final body and headers after CORS and optional gzip
pub fn finalize(mut response: GatewayResponse, gzip_allowed: bool) -> GatewayResponse {
    for (name, value) in CORS_HEADERS {
        response.headers.push((name, value.to_string()));
    }

    if gzip_allowed && !response.body.is_empty() {
        match helpers::gzip(&response.body) {
            Ok(compressed) => {
                response.body = Bytes::from(compressed);
                response
                    .headers
                    .push(("Content-Encoding", "gzip".to_string()));
                response
                    .headers
                    .push(("Vary", "Accept-Encoding".to_string()));
            }
            Err(e) => tracing::warn!(error = %e, "gzip failed, sending identity body"),
        }
    }

    response
}

async fn write_response(session: &mut Session, response: GatewayResponse) -> Result<()> {
    let mut header = ResponseHeader::build(response.status, Some(response.headers.len() + 1))?;
    for (name, value) in &response.headers {
        header.insert_header(*name, value.as_str())?;
    }
    header.insert_header("Content-Length", response.body.len().to_string())?;

    session
        .write_response_header(Box::new(header), false)
        .await?;
    session
        .write_response_body(Some(response.body), true)
        .await?;
    Ok(())
}

#[async_trait]
impl ProxyHttp for KagamiProxy {
    type CTX = RequestContext;

    fn new_ctx(&self) -> Self::CTX {
        RequestContext::new("unknown", "/")
    }

    /// Never reached: request_filter always answers
    async fn upstream_peer(
        &self,
        _session: &mut Session,
        _ctx: &mut Self::CTX,
    ) -> Result<Box<HttpPeer>> {
        Err(Error::explain(
            ErrorType::InternalError,
            "no upstream: responses are generated locally",
        ))
    }

    async fn request_filter(&self, session: &mut Session, ctx: &mut Self::CTX) -> Result<bool> {
        session.set_read_timeout(Some(self.options.read_timeout));
        session.set_write_timeout(Some(self.options.write_timeout));
        session.set_keepalive(Some(self.options.keepalive_secs));

        let req = session.req_header();
        let method = req.method.as_str().to_string();
        let path = req.uri.path().to_string();
        let query = helpers::extract_query_params(req);
        let gzip_allowed = helpers::accepts_gzip(req);
        let client_ip = helpers::get_client_ip(session, self.options.trust_forwarded_for);

        *ctx = RequestContext::new(client_ip, path).with_query_params(query);

        let route = Route::classify(&method, ctx.path());
        let response = self.route(route, ctx).await;
        let response = finalize(response, gzip_allowed && route.compressible());

        write_response(session, response).await?;
        Ok(true)
    }

    async fn logging(&self, session: &mut Session, _e: Option<&Error>, ctx: &mut Self::CTX) {
        let status = session
            .response_written()
            .map(|resp| resp.status.as_u16())
            .unwrap_or(500);
        let method = session.req_header().method.as_str().to_string();
        let route = Route::classify(&method, ctx.path());
        let elapsed = ctx.elapsed();

        GatewayMetrics::global().record_request(route.label(), status, elapsed.as_secs_f64());

        tracing::info!(
            request_id = %ctx.request_id(),
            client_ip = %ctx.client_ip(),
            method = %method,
            path = %ctx.path(),
            status = status,
            cache = ctx.cache_status().map(|c| c.as_str()).unwrap_or("-"),
            cache_key = ctx.cache_key().map(|k| k.as_str()).unwrap_or("-"),
            duration_ms = elapsed.as_millis() as u64,
            "Request completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{CacheStatus, ResponseDispatcher};
    use rstest::rstest;

    #[rstest]
    #[case("GET", "/transform", Route::Transform)]
    #[case("GET", "/health", Route::Health)]
    #[case("GET", "/metrics", Route::Metrics)]
    #[case("OPTIONS", "/anything", Route::Preflight)]
    #[case("options", "/transform", Route::Preflight)]
    #[case("POST", "/transform", Route::MethodNotAllowed)]
    #[case("GET", "/", Route::NotFound)]
    #[case("GET", "/transform/extra", Route::NotFound)]
    fn test_route_classify(#[case] method: &str, #[case] path: &str, #[case] expected: Route) {
        assert_eq!(Route::classify(method, path), expected);
    }

    #[test]
    fn test_proxy_options_from_config() {
        let mut config = Config::default();
        config.gateway.trust_forwarded_for = true;
        config.server.idle_timeout_secs = 75;

        let options = ProxyOptions::from_config(&config);
        assert!(options.trust_forwarded_for);
        assert_eq!(options.read_timeout, Duration::from_secs(30));
        assert_eq!(options.keepalive_secs, 75);
    }

    #[test]
    fn test_transform_route_is_not_compressed() {
        assert!(!Route::Transform.compressible());
        assert!(Route::Health.compressible());
        assert!(Route::NotFound.compressible());
    }

    #[test]
    fn test_finalize_adds_cors_headers() {
        let response = finalize(special_endpoints::handle_not_found(), false);
        assert_eq!(response.header("Access-Control-Allow-Origin"), Some("*"));
        assert_eq!(
            response.header("Access-Control-Allow-Methods"),
            Some("GET, OPTIONS")
        );
        assert_eq!(
            response.header("Access-Control-Allow-Headers"),
            Some("Content-Type")
        );
        assert_eq!(response.header("Content-Encoding"), None);
        assert_eq!(response.body.as_ref(), b"Not Found");
    }

    #[test]
    fn test_finalize_gzips_when_allowed() {
        let response = finalize(special_endpoints::handle_health(), true);
        assert_eq!(response.header("Content-Encoding"), Some("gzip"));
        assert_eq!(&response.body[..2], &[0x1f, 0x8b]);
    }

    #[test]
    fn test_finalize_skips_empty_body() {
        let response = finalize(special_endpoints::handle_preflight(), true);
        assert_eq!(response.header("Content-Encoding"), None);
        assert!(response.body.is_empty());
    }

    #[test]
    fn test_finalize_keeps_image_headers() {
        let image = ResponseDispatcher::image(
            Bytes::from_static(b"RIFF"),
            "image/webp",
            CacheStatus::Hit,
        );
        let response = finalize(image, false);
        assert_eq!(response.header("X-Cache"), Some("HIT"));
        assert_eq!(response.header("Access-Control-Allow-Origin"), Some("*"));
    }
}
