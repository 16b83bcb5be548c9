//! Photo ingestion core for the construction-site photo manager.
//!
//! Two pipelines live here. The duplicate scanner fingerprints a batch
//! of photos and clusters likely duplicates for review before anything
//! is uploaded. The upload orchestrator then moves the surviving files
//! through transcoding and one of three transport strategies, batching
//! its registry calls and reporting typed progress events.
//!
//! Everything is explicitly constructed: the embedder builds a
//! [`services::transcode::TranscodePool`] and an
//! [`services::upload::UploadQueue`] with its collaborators and owns
//! their lifecycles.

pub mod services;
pub mod types;

pub use services::dedup::{detect_duplicates, scan_index_groups};
pub use services::hash::fingerprint;
pub use services::registry::{HttpRegistry, PhotoRegistry};
pub use services::transcode::TranscodePool;
pub use services::transport::{HttpUploader, Uploader};
pub use services::upload::{UploadConfig, UploadQueue};
