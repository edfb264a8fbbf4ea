//! Cached artifact type
//!
//! An artifact is immutable once created: the encoded bytes and the content
//! type they were produced with. Expiry is the backend's job.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedArtifact {
    /// Encoded image bytes, served verbatim on a hit
    pub data: Bytes,
    /// Content-Type to serve the bytes with
    pub content_type: String,
}

impl CachedArtifact {
    pub fn new(data: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            content_type: content_type.into(),
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_size_matches_payload() {
        let artifact = CachedArtifact::new(vec![1u8, 2, 3], "image/png");
        assert_eq!(artifact.size_bytes(), 3);
        assert_eq!(artifact.content_type, "image/png");
    }

    #[test]
    fn test_artifact_clone_shares_bytes() {
        let artifact = CachedArtifact::new(Bytes::from_static(b"<svg/>"), "image/svg+xml");
        let cloned = artifact.clone();
        assert_eq!(artifact.data.as_ptr(), cloned.data.as_ptr());
    }
}
