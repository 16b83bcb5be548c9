use thiserror::Error;

/// Failure to derive a perceptual fingerprint from an image.
///
/// The duplicate scanner degrades to a size-derived fallback fingerprint
/// instead of aborting the batch.
#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("image decode failed: {0}")]
    Decode(String),
}

/// Internal transcoding failure. Never surfaced to callers of the pool:
/// the pool logs it and resolves with the original, unmodified image.
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("metadata carry-over failed: {0}")]
    Metadata(String),
    #[error("worker unavailable: {0}")]
    Pool(String),
}

/// Batched upload-URL acquisition failure. Propagates as per-item failed
/// status, never as a batch abort.
#[derive(Debug, Error)]
pub enum DestinationError {
    #[error("destination request failed: {0}")]
    Request(String),
    #[error("no upload destination issued for {0}")]
    Missing(String),
}

/// Network failure during an upload, including exhausted chunk retries.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("upload rejected with HTTP {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("chunk at offset {offset} failed after {attempts} attempts: {detail}")]
    ChunkExhausted {
        offset: usize,
        attempts: u32,
        detail: String,
    },
}

/// Best-effort completion notification failure. Logged and swallowed:
/// once bytes landed, the item stays completed.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("completion notification failed: {0}")]
    Request(String),
}
