//! Gateway configuration: which origins may be fetched and how large a
//! source image may be.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_MAX_IMAGE_SIZE;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewayConfig {
    /// Allowed source hosts; `"*"` admits every host
    #[serde(default)]
    pub allowed_domains: Vec<String>,
    /// Maximum source payload in bytes
    #[serde(default = "default_max_image_size")]
    pub max_image_size: usize,
    /// Identify clients by the first `X-Forwarded-For` entry instead of
    /// the peer address; only safe behind a trusted load balancer
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            allowed_domains: Vec::new(),
            max_image_size: default_max_image_size(),
            trust_forwarded_for: false,
        }
    }
}

/// Split a comma-separated domain list, trimming whitespace
///
/// Empty entries are kept out so a trailing comma never turns into an
/// entry that matches nothing.
pub fn parse_domain_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect()
}

fn default_max_image_size() -> usize {
    DEFAULT_MAX_IMAGE_SIZE
}
