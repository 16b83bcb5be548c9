//! Upload transport strategies.
//!
//! Three interchangeable mechanisms share one contract: move the payload
//! to its destination and report 0–100 progress through the callback.
//! Selection is per item: a pre-authorized URL gets the single-shot PUT,
//! no URL falls back to the server-proxied multipart route, and the
//! chunked strategy is an explicit opt-in for large files.

pub mod chunked;
pub mod presigned;
pub mod proxied;

use crate::types::errors::TransportError;
use crate::types::photo::ImageBuffer;
use crate::types::upload::UploadDestination;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Shared progress callback: receives the percent transferred.
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// Seam between the orchestrator and the wire. The production
/// implementation is [`HttpUploader`]; tests inject fakes.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(
        &self,
        job_id: &str,
        payload: &ImageBuffer,
        destination: &UploadDestination,
        progress: ProgressFn,
    ) -> Result<(), TransportError>;
}

/// Strategy-selecting uploader over reqwest.
pub struct HttpUploader {
    client: Client,
    /// Separate client with redirects disabled so the chunked strategy
    /// can observe 308 resume responses instead of having them followed.
    chunk_client: Client,
    origin_base_url: String,
    force_chunked: bool,
}

impl HttpUploader {
    pub fn new(origin_base_url: impl Into<String>) -> Result<Self, TransportError> {
        Self::with_options(origin_base_url, false)
    }

    /// `force_chunked` routes items with a pre-authorized URL through the
    /// resumable strategy instead of the single-shot PUT.
    pub fn with_options(
        origin_base_url: impl Into<String>,
        force_chunked: bool,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        let chunk_client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            client,
            chunk_client,
            origin_base_url: origin_base_url.into().trim_end_matches('/').to_string(),
            force_chunked,
        })
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    async fn upload(
        &self,
        job_id: &str,
        payload: &ImageBuffer,
        destination: &UploadDestination,
        progress: ProgressFn,
    ) -> Result<(), TransportError> {
        match &destination.upload_url {
            Some(url) if self.force_chunked => {
                chunked::upload(&self.chunk_client, url, payload, progress.as_ref()).await
            }
            Some(url) => presigned::upload(&self.client, url, payload, progress.as_ref()).await,
            None => {
                proxied::upload(
                    &self.client,
                    &self.origin_base_url,
                    job_id,
                    payload,
                    &destination.storage_path,
                    &progress,
                )
                .await
            }
        }
    }
}

/// Build a `TransportError::Status` from a rejected response, keeping a
/// bounded slice of the body for diagnostics.
pub(crate) async fn status_error(response: reqwest::Response) -> TransportError {
    let status = response.status().as_u16();
    let detail: String = response
        .text()
        .await
        .unwrap_or_default()
        .chars()
        .take(200)
        .collect();
    TransportError::Status { status, detail }
}
