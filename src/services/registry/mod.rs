//! Photo registry collaborator: batched upload-URL issue and batched
//! completion notification over the origin API.

use crate::types::errors::{DestinationError, NotificationError};
use crate::types::photo::PhotoRecord;
use crate::types::upload::{CompletedUpload, UploadUrlBatch, UploadUrlRequest};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Seam to the registry service. The production implementation is
/// [`HttpRegistry`]; tests inject fakes.
#[async_trait]
pub trait PhotoRegistry: Send + Sync {
    /// Acquire destinations for a batch of files. Order-preserving: the
    /// response carries exactly one entry per requested file.
    async fn get_upload_urls(
        &self,
        job_id: &str,
        files: &[UploadUrlRequest],
    ) -> Result<UploadUrlBatch, DestinationError>;

    /// Report files whose bytes landed. Returns the created photo
    /// records for the embedder to hydrate its own state.
    async fn notify_upload_complete(
        &self,
        job_id: &str,
        uploads: &[CompletedUpload],
    ) -> Result<Vec<PhotoRecord>, NotificationError>;
}

/// Registry client over the origin HTTP API.
pub struct HttpRegistry {
    client: Client,
    base_url: String,
}

impl HttpRegistry {
    pub fn new(base_url: impl Into<String>) -> Result<Self, DestinationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DestinationError::Request(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PhotoRegistry for HttpRegistry {
    async fn get_upload_urls(
        &self,
        job_id: &str,
        files: &[UploadUrlRequest],
    ) -> Result<UploadUrlBatch, DestinationError> {
        let url = format!("{}/api/jobs/{job_id}/upload-urls", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(files)
            .send()
            .await
            .map_err(|e| DestinationError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DestinationError::Request(format!(
                "HTTP {} from {url}",
                response.status()
            )));
        }

        let batch: UploadUrlBatch = response
            .json()
            .await
            .map_err(|e| DestinationError::Request(e.to_string()))?;
        if batch.files.len() != files.len() {
            return Err(DestinationError::Request(format!(
                "expected {} destination(s), got {}",
                files.len(),
                batch.files.len()
            )));
        }
        Ok(batch)
    }

    async fn notify_upload_complete(
        &self,
        job_id: &str,
        uploads: &[CompletedUpload],
    ) -> Result<Vec<PhotoRecord>, NotificationError> {
        let url = format!("{}/api/jobs/{job_id}/photos/complete", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(uploads)
            .send()
            .await
            .map_err(|e| NotificationError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotificationError::Request(format!(
                "HTTP {} from {url}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| NotificationError::Request(e.to_string()))
    }
}
