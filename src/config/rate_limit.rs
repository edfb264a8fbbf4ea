//! Rate limiting configuration types.
//!
//! A single per-client token bucket budget plus the knobs that bound the
//! client table: how often refilled buckets are swept and how many clients
//! may be tracked at once.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{
    DEFAULT_MAX_TRACKED_CLIENTS, DEFAULT_RATE_LIMIT_CLEANUP_SECS, DEFAULT_RATE_LIMIT_RPS,
};

/// Per-client rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateLimitConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Bucket capacity and refill rate, per client per second
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
    #[serde(default = "default_max_clients")]
    pub max_clients: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            requests_per_second: default_requests_per_second(),
            cleanup_interval_secs: default_cleanup_interval(),
            max_clients: default_max_clients(),
        }
    }
}

impl RateLimitConfig {
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

}

fn default_enabled() -> bool {
    true
}

fn default_requests_per_second() -> u32 {
    DEFAULT_RATE_LIMIT_RPS
}

fn default_cleanup_interval() -> u64 {
    DEFAULT_RATE_LIMIT_CLEANUP_SECS
}

fn default_max_clients() -> usize {
    DEFAULT_MAX_TRACKED_CLIENTS
}
