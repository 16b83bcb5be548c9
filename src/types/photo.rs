//! In-memory image payloads as they move through the ingestion pipeline.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Content types the transcoding pool will re-compress. Anything else
/// (HEIC, TIFF, unknown blobs) is uploaded as-is.
pub const COMPRESSIBLE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// A raw image as read from the source file: bytes, declared media type
/// and original filename. Immutable once constructed; stages that change
/// the payload produce a new buffer.
#[derive(Debug, Clone)]
pub struct ImageBuffer {
    bytes: Arc<[u8]>,
    content_type: String,
    file_name: String,
}

impl ImageBuffer {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
            file_name: file_name.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the transcoding pool should attempt re-compression.
    pub fn is_compressible(&self) -> bool {
        COMPRESSIBLE_TYPES.contains(&self.content_type.as_str())
    }
}

/// Registry-side photo record returned by the completion notification.
/// Passed through to the embedder so it can hydrate its own state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRecord {
    pub id: String,
    pub file_name: String,
    pub storage_path: String,
}
