// Cache key derivation for transform requests

use sha2::{Digest, Sha256};
use std::fmt;

use crate::transform::TransformRequest;

/// Hex-encoded SHA-256 fingerprint of a transform request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wrap an already computed digest
    pub fn from_digest(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds cache keys from transform requests
///
/// # Format
/// All fields joined with `:` in a fixed order:
/// `url:w:h:fit:format:quality:crop:blur:sharpen:brightness:contrast:saturation:auto:grayscale:flip:rotate:bg:strip`
///
/// The URL goes first and is kept verbatim. Every field after it is rendered
/// without `:`, so two different requests can never produce the same string.
/// Floats are rounded to two decimals, so values that differ only past the
/// second decimal share a key.
pub struct CacheKeyBuilder;

impl CacheKeyBuilder {
    pub fn build(request: &TransformRequest) -> CacheKey {
        let canonical = Self::canonical(request);
        let digest = Sha256::digest(canonical.as_bytes());
        CacheKey(hex::encode(digest))
    }

    /// Canonical string the digest is computed over
    pub fn canonical(request: &TransformRequest) -> String {
        let crop = request
            .crop
            .map(|c| c.to_string())
            .unwrap_or_default();

        format!(
            "{}:{}:{}:{}:{}:{}:{}:{}:{:.2}:{:.2}:{:.2}:{:.2}:{}:{}:{}:{}:{}:{}",
            request.url,
            request.width,
            request.height,
            request.fit.as_str(),
            request.format.as_str(),
            request.quality,
            crop,
            request.blur,
            request.sharpen,
            request.brightness,
            request.contrast,
            request.saturation,
            request.auto,
            request.grayscale,
            request.flip.as_str(),
            request.rotate.degrees(),
            request.background.as_deref().unwrap_or(""),
            request.strip,
        )
    }
}
