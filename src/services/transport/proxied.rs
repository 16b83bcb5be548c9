//! Server-proxied multipart upload through the origin service.
//!
//! Used when the registry issued no pre-authorized URL. The payload is
//! streamed so transfer progress can be observed per chunk.

use super::{status_error, ProgressFn};
use crate::types::errors::TransportError;
use crate::types::photo::ImageBuffer;
use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};

/// Slice size of the streamed multipart body. Small enough for smooth
/// progress, large enough to keep per-chunk overhead negligible.
const STREAM_CHUNK: usize = 64 * 1024;

pub async fn upload(
    client: &Client,
    origin_base_url: &str,
    job_id: &str,
    payload: &ImageBuffer,
    storage_path: &str,
    progress: &ProgressFn,
) -> Result<(), TransportError> {
    let total = payload.size().max(1);
    let chunks: Vec<Vec<u8>> = payload
        .bytes()
        .chunks(STREAM_CHUNK)
        .map(|chunk| chunk.to_vec())
        .collect();

    let progress_tap = progress.clone();
    let mut sent = 0usize;
    let counted = futures_util::stream::iter(chunks).map(move |chunk| {
        sent += chunk.len();
        // Hold 100 back for the confirmed response.
        let percent = ((sent as f64 / total as f64) * 100.0) as u8;
        progress_tap(percent.min(99));
        Ok::<_, std::io::Error>(chunk)
    });

    let part = Part::stream_with_length(Body::wrap_stream(counted), payload.size() as u64)
        .file_name(payload.file_name().to_string())
        .mime_str(payload.content_type())?;
    let form = Form::new()
        .text("storagePath", storage_path.to_string())
        .part("file", part);

    let url = format!("{origin_base_url}/api/jobs/{job_id}/photos/upload");
    let response = client.post(&url).multipart(form).send().await?;

    if !response.status().is_success() {
        return Err(status_error(response).await);
    }
    progress(100);
    Ok(())
}
