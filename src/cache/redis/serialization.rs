// Redis artifact serialization using MessagePack

use crate::cache::{CacheError, CachedArtifact};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Serialization format version for schema evolution
const SERIALIZATION_VERSION: u8 = 1;

/// Wire form of a CachedArtifact with version marker
#[derive(Debug, Serialize, Deserialize)]
struct StoredArtifact {
    version: u8,
    content_type: String,
    /// Encoded as MessagePack bin
    data: Bytes,
}

/// Serializes an artifact to MessagePack
///
/// # Errors
/// Returns CacheError::SerializationError if encoding fails
pub fn serialize_artifact(artifact: &CachedArtifact) -> Result<Vec<u8>, CacheError> {
    let stored = StoredArtifact {
        version: SERIALIZATION_VERSION,
        content_type: artifact.content_type.clone(),
        data: artifact.data.clone(),
    };

    rmp_serde::to_vec(&stored)
        .map_err(|e| CacheError::SerializationError(format!("MessagePack encoding failed: {}", e)))
}

/// Deserializes MessagePack bytes back into an artifact
///
/// # Errors
/// Returns CacheError::SerializationError if:
/// - Data is corrupt or truncated
/// - Version is unsupported
/// - The payload or content type is empty
pub fn deserialize_artifact(bytes: &[u8]) -> Result<CachedArtifact, CacheError> {
    let stored: StoredArtifact = rmp_serde::from_slice(bytes).map_err(|e| {
        CacheError::SerializationError(format!("MessagePack decoding failed: {}", e))
    })?;

    if stored.version != SERIALIZATION_VERSION {
        return Err(CacheError::SerializationError(format!(
            "Unsupported schema version: {} (expected: {})",
            stored.version, SERIALIZATION_VERSION
        )));
    }

    if stored.data.is_empty() {
        return Err(CacheError::SerializationError(
            "Invalid artifact: data is empty".to_string(),
        ));
    }

    if stored.content_type.is_empty() {
        return Err(CacheError::SerializationError(
            "Invalid artifact: content type is empty".to_string(),
        ));
    }

    Ok(CachedArtifact {
        data: stored.data,
        content_type: stored.content_type,
    })
}
