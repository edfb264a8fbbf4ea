// Image engine configuration

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_ENGINE_CONCURRENCY, DEFAULT_MAX_SOURCE_PIXELS};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Worker threads for decode/transform/encode
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Largest decoded source accepted, in pixels (width * height)
    #[serde(default = "default_max_source_pixels")]
    pub max_source_pixels: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_source_pixels: default_max_source_pixels(),
        }
    }
}

fn default_concurrency() -> usize {
    DEFAULT_ENGINE_CONCURRENCY
}

fn default_max_source_pixels() -> u64 {
    DEFAULT_MAX_SOURCE_PIXELS
}
