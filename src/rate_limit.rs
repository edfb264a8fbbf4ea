//! Per-client rate limiting with a token bucket
//!
//! Every client key gets its own bucket with capacity `requests_per_second`
//! that refills continuously at the same rate. A request takes one token; with
//! no token left it is rejected immediately (no queuing).
//!
//! Uses the `governor` crate's keyed limiter, whose state lives in a sharded
//! map of per-key atomic cells:
//! - the same key is serialized by a compare-and-swap on its cell
//! - different keys only meet on a shard lock, never a single global one
//!
//! ## Bounding the client table
//!
//! Buckets are created lazily on a client's first request. A background
//! sweep (see `start_cleanup_task`) periodically drops every bucket that has
//! refilled to capacity, since such a bucket is indistinguishable from a fresh
//! one. If the table is still above `max_clients` after a sweep, the whole
//! table is replaced with an empty one.
//!
//! ## Configuration Example
//!
//! ```yaml
//! rate_limit:
//!   enabled: true
//!   requests_per_second: 100
//!   cleanup_interval_secs: 60
//!   max_clients: 100000
//! ```

use arc_swap::ArcSwap;
use governor::{clock::DefaultClock, state::keyed::DefaultKeyedStateStore, Quota, RateLimiter};
use parking_lot::RwLock;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

use crate::config::RateLimitConfig;

type KeyedLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Per-client token bucket limiter
pub struct ClientRateLimiter {
    /// Keyed limiter; swapped wholesale when the table overflows
    limiter: Arc<ArcSwap<KeyedLimiter>>,
    /// None when rate limiting is disabled
    quota: Option<Quota>,
    max_clients: usize,
    cleanup_interval: Duration,
    /// Cleanup task shutdown sender (Some when task is running)
    cleanup_shutdown: Arc<RwLock<Option<oneshot::Sender<()>>>>,
}

impl ClientRateLimiter {
    /// Build a limiter from configuration
    ///
    /// A disabled config, or a zero rate, admits every request.
    pub fn new(config: &RateLimitConfig) -> Self {
        let quota = if config.enabled {
            NonZeroU32::new(config.requests_per_second).map(Quota::per_second)
        } else {
            None
        };
        Self::with_quota(quota, config.max_clients, config.cleanup_interval())
    }

    /// Build a limiter from an explicit quota
    pub fn with_quota(quota: Option<Quota>, max_clients: usize, cleanup_interval: Duration) -> Self {
        let initial = quota.unwrap_or_else(|| Quota::per_second(nonzero_ext::nonzero!(1u32)));
        Self {
            limiter: Arc::new(ArcSwap::from_pointee(RateLimiter::keyed(initial))),
            quota,
            max_clients,
            cleanup_interval,
            cleanup_shutdown: Arc::new(RwLock::new(None)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.quota.is_some()
    }

    /// Take one token from `client_key`'s bucket
    ///
    /// Returns true if allowed, false if the bucket is empty
    pub fn check(&self, client_key: &str) -> bool {
        if self.quota.is_none() {
            return true;
        }
        let key = client_key.to_string();
        self.limiter.load().check_key(&key).is_ok()
    }

    /// Number of client buckets currently tracked
    pub fn tracked_clients(&self) -> usize {
        self.limiter.load().len()
    }

    /// Drop refilled buckets, then reset the table if it is still too large
    pub fn sweep(&self) {
        if let Some(quota) = self.quota {
            sweep_limiter(&self.limiter, quota, self.max_clients);
        }
    }

    /// Start the background sweep task
    ///
    /// Calling this multiple times is safe: subsequent calls are ignored
    /// while a task is already running. Must be called inside a tokio runtime.
    pub fn start_cleanup_task(&self) {
        let Some(quota) = self.quota else {
            return;
        };
        let limiter = Arc::clone(&self.limiter);
        let max_clients = self.max_clients;
        let interval = self.cleanup_interval;

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        {
            let mut guard = self.cleanup_shutdown.write();
            if guard.is_some() {
                tracing::debug!("Rate limiter cleanup task already running, skipping duplicate start");
                return;
            }
            *guard = Some(shutdown_tx);
        }

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        sweep_limiter(&limiter, quota, max_clients);
                    }
                    _ = &mut shutdown_rx => {
                        tracing::debug!("Rate limiter cleanup task shutting down");
                        break;
                    }
                }
            }
        });

        tracing::info!(
            interval_secs = interval.as_secs(),
            max_clients = max_clients,
            "Started rate limiter cleanup task"
        );
    }

    /// Stop the background sweep task
    pub fn stop_cleanup_task(&self) {
        if let Some(shutdown_tx) = self.cleanup_shutdown.write().take() {
            let _ = shutdown_tx.send(());
        }
    }

    pub fn is_cleanup_running(&self) -> bool {
        self.cleanup_shutdown.read().is_some()
    }
}

impl Drop for ClientRateLimiter {
    fn drop(&mut self) {
        self.stop_cleanup_task();
    }
}

fn sweep_limiter(limiter: &ArcSwap<KeyedLimiter>, quota: Quota, max_clients: usize) {
    let current = limiter.load();
    let before = current.len();
    current.retain_recent();
    current.shrink_to_fit();
    let after = current.len();

    if after > max_clients {
        tracing::warn!(
            client_count = after,
            max_clients = max_clients,
            "Rate limiter clients exceed max after sweep, clearing all"
        );
        limiter.store(Arc::new(RateLimiter::keyed(quota)));
    } else if before != after {
        tracing::debug!(
            evicted_clients = before - after,
            remaining_clients = after,
            "Evicted refilled rate limit buckets"
        );
    }
}
