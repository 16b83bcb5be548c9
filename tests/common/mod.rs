//! Shared fixtures for the integration tests: in-memory registry and
//! uploader fakes plus tiny image factories.

use async_trait::async_trait;
use photo_ingest::types::errors::{DestinationError, NotificationError, TransportError};
use photo_ingest::types::photo::{ImageBuffer, PhotoRecord};
use photo_ingest::types::upload::{
    CompletedUpload, IssuedUploadUrl, UploadDestination, UploadUrlBatch, UploadUrlRequest,
};
use photo_ingest::{PhotoRegistry, Uploader};
use std::io::Cursor;
use std::sync::Mutex;

/// Registry fake that issues deterministic destinations and records
/// every completion notification.
#[derive(Default)]
pub struct RecordingRegistry {
    pub notified: Mutex<Vec<CompletedUpload>>,
}

#[async_trait]
impl PhotoRegistry for RecordingRegistry {
    async fn get_upload_urls(
        &self,
        job_id: &str,
        files: &[UploadUrlRequest],
    ) -> Result<UploadUrlBatch, DestinationError> {
        Ok(UploadUrlBatch {
            strategy: "presigned".to_string(),
            files: files
                .iter()
                .map(|f| IssuedUploadUrl {
                    file_name: f.file_name.clone(),
                    upload_url: Some(format!("https://storage.test/{}", f.file_name)),
                    storage_path: format!("jobs/{job_id}/{}", f.file_name),
                })
                .collect(),
        })
    }

    async fn notify_upload_complete(
        &self,
        _job_id: &str,
        uploads: &[CompletedUpload],
    ) -> Result<Vec<PhotoRecord>, NotificationError> {
        let mut notified = self.notified.lock().unwrap();
        notified.extend(uploads.iter().cloned());
        Ok(uploads
            .iter()
            .map(|u| PhotoRecord {
                id: format!("photo-{}", u.file_name),
                file_name: u.file_name.clone(),
                storage_path: u.storage_path.clone(),
            })
            .collect())
    }
}

/// Uploader fake that accepts every payload instantly.
pub struct AcceptingUploader;

#[async_trait]
impl Uploader for AcceptingUploader {
    async fn upload(
        &self,
        _job_id: &str,
        _payload: &ImageBuffer,
        _destination: &UploadDestination,
        progress: photo_ingest::services::transport::ProgressFn,
    ) -> Result<(), TransportError> {
        progress(100);
        Ok(())
    }
}

/// Deterministic per-seed noise content: the same seed reproduces the
/// same bytes, different seeds give unrelated images.
pub fn png_buffer(name: &str, width: u32, height: u32, seed: u32) -> ImageBuffer {
    let mut state = seed;
    let mut next = move || {
        state = state.wrapping_mul(1664525).wrapping_add(1013904223);
        (state >> 24) as u8
    };
    let img = image::RgbImage::from_fn(width, height, |_, _| image::Rgb([next(), next(), next()]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    ImageBuffer::new(bytes, "image/png", name)
}
