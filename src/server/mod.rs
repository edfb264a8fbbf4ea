// Server module - Pingora server assembly and process lifecycle

use async_trait::async_trait;
use pingora::server::configuration::{Opt, ServerConf};
use pingora_core::server::{Server, ShutdownWatch};
use pingora_core::services::background::{background_service, BackgroundService};
use std::sync::Arc;

use crate::config::Config;
use crate::proxy::{KagamiProxy, ProxyOptions};
use crate::pipeline::TransformPipeline;
use crate::rate_limit::ClientRateLimiter;
use crate::transform::ImageEngine;

/// Process-wide resources with a start/stop lifecycle
///
/// Runs as a Pingora background service: starts the rate-limiter sweep,
/// waits for the shutdown signal, then stops the sweep and shuts the image
/// engine down.
pub struct LifecycleService {
    rate_limiter: Arc<ClientRateLimiter>,
    engine: Arc<ImageEngine>,
}

impl LifecycleService {
    pub fn new(rate_limiter: Arc<ClientRateLimiter>, engine: Arc<ImageEngine>) -> Self {
        Self {
            rate_limiter,
            engine,
        }
    }

    pub fn on_start(&self) {
        self.rate_limiter.start_cleanup_task();
        tracing::info!(
            rate_limit_enabled = self.rate_limiter.is_enabled(),
            "Lifecycle service started"
        );
    }

    pub fn on_shutdown(&self) {
        self.rate_limiter.stop_cleanup_task();
        if self.engine.shutdown() {
            tracing::info!("Lifecycle service stopped");
        }
    }
}

#[async_trait]
impl BackgroundService for LifecycleService {
    async fn start(&self, mut shutdown: ShutdownWatch) {
        self.on_start();
        // Err means the sender is gone, which is a shutdown as well
        let _ = shutdown.changed().await;
        self.on_shutdown();
    }
}

/// Pingora server settings derived from the gateway config
pub fn server_conf(config: &Config) -> ServerConf {
    ServerConf {
        threads: config.server.threads,
        grace_period_seconds: Some(config.server.grace_period_secs),
        graceful_shutdown_timeout_seconds: Some(config.server.grace_period_secs),
        ..ServerConf::default()
    }
}

/// Build the Pingora server with the HTTP service and the lifecycle service
///
/// # Errors
/// Returns an error string if a collaborator cannot be built
pub fn build_server(config: &Config, opt: Opt) -> Result<Server, String> {
    let pipeline = Arc::new(TransformPipeline::from_config(config)?);

    let mut server = Server::new_with_opt_and_conf(Some(opt), server_conf(config));
    server.bootstrap();

    let lifecycle = LifecycleService::new(
        Arc::clone(pipeline.rate_limiter()),
        Arc::clone(pipeline.engine()),
    );
    let lifecycle_service = background_service("kagami lifecycle", lifecycle);

    let proxy = KagamiProxy::new(pipeline, ProxyOptions::from_config(config));
    let mut proxy_service = pingora_proxy::http_proxy_service(&server.configuration, proxy);
    let listen_addr = config.server.listen_addr();
    proxy_service.add_tcp(&listen_addr);

    tracing::info!(
        address = %listen_addr,
        threads = config.server.threads,
        "HTTP service configured"
    );

    server.add_service(proxy_service);
    server.add_service(lifecycle_service);

    Ok(server)
}
