//! Upload queue state and the wire contracts shared with the photo
//! registry.
//!
//! Namespace boundary: everything the UI observes goes through
//! [`ProgressEvent`] and [`UploadItemView`]; the raw [`UploadItem`]
//! (which owns image payloads) never crosses the boundary.

use crate::types::photo::ImageBuffer;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

/// Lifecycle of one queued file.
///
/// `Failed → Pending` (retry) is the only externally triggered transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UploadStatus {
    Pending,
    Compressing,
    Uploading,
    Completed,
    Failed,
}

/// Server-issued destination for one file. A missing `upload_url` signals
/// fallback to the server-proxied transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadDestination {
    pub upload_url: Option<String>,
    pub storage_path: String,
}

/// One file tracked by the upload queue. Mutated only by the orchestrator.
#[derive(Debug)]
pub struct UploadItem {
    pub id: Uuid,
    pub source: ImageBuffer,
    /// Possibly transcoded payload; `None` until compression ran (or was
    /// skipped, in which case the source uploads as-is).
    pub working: Option<ImageBuffer>,
    pub destination: Option<UploadDestination>,
    pub status: UploadStatus,
    /// 0–100. Monotonically non-decreasing while uploading; reset on retry.
    pub progress: u8,
    pub error: Option<String>,
    pub(crate) last_emit: Option<Instant>,
}

impl UploadItem {
    pub fn new(source: ImageBuffer) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            working: None,
            destination: None,
            status: UploadStatus::Pending,
            progress: 0,
            error: None,
            last_emit: None,
        }
    }

    /// The payload that will go over the wire.
    pub fn payload(&self) -> &ImageBuffer {
        self.working.as_ref().unwrap_or(&self.source)
    }
}

/// Observable per-item state for the UI layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadItemView {
    pub id: Uuid,
    pub file_name: String,
    pub status: UploadStatus,
    pub progress: u8,
    pub error: Option<String>,
}

impl From<&UploadItem> for UploadItemView {
    fn from(item: &UploadItem) -> Self {
        Self {
            id: item.id,
            file_name: item.source.file_name().to_string(),
            status: item.status,
            progress: item.progress,
            error: item.error.clone(),
        }
    }
}

/// Typed progress notification pushed on the queue's event channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub item_id: Uuid,
    pub status: UploadStatus,
    pub percent: u8,
    pub error: Option<String>,
}

/// Derived whole-queue progress. Never stored; recomputed per snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueAggregate {
    /// Arithmetic mean of item progresses. Failed items contribute their
    /// last known progress.
    pub percent: u8,
    pub completed: usize,
    pub failed: usize,
    pub total: usize,
}

impl QueueAggregate {
    pub fn from_items(items: &[UploadItem]) -> Self {
        let total = items.len();
        if total == 0 {
            return Self {
                percent: 0,
                completed: 0,
                failed: 0,
                total: 0,
            };
        }
        let sum: u32 = items.iter().map(|i| i.progress as u32).sum();
        Self {
            percent: (sum as f32 / total as f32).round() as u8,
            completed: items
                .iter()
                .filter(|i| i.status == UploadStatus::Completed)
                .count(),
            failed: items
                .iter()
                .filter(|i| i.status == UploadStatus::Failed)
                .count(),
            total,
        }
    }
}

// ─── Registry wire contracts ─────────────────────────────────────────────

/// One entry of the batched upload-URL request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlRequest {
    pub file_name: String,
    pub content_type: String,
}

/// Order-preserving response to a batched upload-URL request: one entry
/// per requested file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlBatch {
    pub strategy: String,
    pub files: Vec<IssuedUploadUrl>,
}

/// Per-file destination as issued by the registry. `upload_url` is null
/// when the registry wants the file proxied through the origin server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedUploadUrl {
    pub file_name: String,
    pub upload_url: Option<String>,
    pub storage_path: String,
}

impl From<IssuedUploadUrl> for UploadDestination {
    fn from(issued: IssuedUploadUrl) -> Self {
        Self {
            upload_url: issued.upload_url,
            storage_path: issued.storage_path,
        }
    }
}

/// One entry of the batched completion notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedUpload {
    pub file_name: String,
    pub storage_path: String,
}
