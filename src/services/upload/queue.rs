//! Upload orchestrator.
//!
//! Coordinates destination acquisition (batched), transcoding
//! (pool-bounded), transport (concurrency-bounded) and completion
//! notification (batched, single-flight) for a queue of files, while
//! tracking per-item and aggregate progress.
//!
//! Failure policy: everything is local to one item. A file that cannot
//! get a destination or whose transfer dies is marked failed and never
//! blocks its siblings; there is no batch-level fatal error.

use crate::services::registry::PhotoRegistry;
use crate::services::transcode::TranscodePool;
use crate::services::transport::{ProgressFn, Uploader};
use crate::types::errors::DestinationError;
use crate::types::photo::ImageBuffer;
use crate::types::upload::{
    CompletedUpload, ProgressEvent, QueueAggregate, UploadItem, UploadItemView, UploadStatus,
    UploadUrlRequest,
};
use futures_util::future::join_all;
use log::{debug, warn};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use uuid::Uuid;

/// Tuning for one upload queue. The defaults mirror production traffic;
/// tests shrink them.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Job (construction site visit) the uploads belong to.
    pub job_id: String,
    pub max_width: u32,
    pub max_height: u32,
    pub jpeg_quality: u8,
    /// Files per destination request.
    pub url_batch_size: usize,
    /// Destination requests in flight at once.
    pub url_batch_concurrency: usize,
    /// Concurrent transcode submissions.
    pub compress_concurrency: usize,
    /// Concurrent transfers.
    pub transport_concurrency: usize,
    /// Completion notifications per flush.
    pub notify_threshold: usize,
    /// Minimum spacing of per-item progress events. The terminal 100%
    /// always goes out immediately.
    pub progress_interval: Duration,
}

impl UploadConfig {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            max_width: 1920,
            max_height: 1920,
            jpeg_quality: 80,
            url_batch_size: 50,
            url_batch_concurrency: 5,
            compress_concurrency: 8,
            transport_concurrency: 15,
            notify_threshold: 20,
            progress_interval: Duration::from_millis(200),
        }
    }
}

/// Item table plus the event channel; shared with transport progress
/// callbacks, which outlive any one borrow of the queue.
struct QueueState {
    items: Mutex<Vec<UploadItem>>,
    events: mpsc::UnboundedSender<ProgressEvent>,
    progress_interval: Duration,
}

impl QueueState {
    fn emit(&self, item: &UploadItem) {
        let _ = self.events.send(ProgressEvent {
            item_id: item.id,
            status: item.status,
            percent: item.progress,
            error: item.error.clone(),
        });
    }

    /// Status transitions always emit.
    fn set_status(&self, id: Uuid, status: UploadStatus) {
        let mut items = self.items.lock().unwrap();
        if let Some(item) = items.iter_mut().find(|i| i.id == id) {
            item.status = status;
            item.last_emit = Some(Instant::now());
            self.emit(item);
        }
    }

    /// Progress updates are throttled per item; the final 100% flushes
    /// immediately. While uploading, progress never goes backwards.
    fn set_progress(&self, id: Uuid, percent: u8) {
        let mut items = self.items.lock().unwrap();
        if let Some(item) = items.iter_mut().find(|i| i.id == id) {
            let percent = percent.min(100);
            item.progress = if item.status == UploadStatus::Uploading {
                item.progress.max(percent)
            } else {
                percent
            };
            let now = Instant::now();
            let due = item
                .last_emit
                .map_or(true, |last| now.duration_since(last) >= self.progress_interval);
            if item.progress >= 100 || due {
                item.last_emit = Some(now);
                self.emit(item);
            }
        }
    }

    fn complete(&self, id: Uuid) {
        let mut items = self.items.lock().unwrap();
        if let Some(item) = items.iter_mut().find(|i| i.id == id) {
            item.status = UploadStatus::Completed;
            item.progress = 100;
            item.error = None;
            item.last_emit = Some(Instant::now());
            self.emit(item);
        }
    }

    /// Failed items keep their last known progress.
    fn fail(&self, id: Uuid, error: String) {
        let mut items = self.items.lock().unwrap();
        if let Some(item) = items.iter_mut().find(|i| i.id == id) {
            item.status = UploadStatus::Failed;
            item.error = Some(error);
            item.last_emit = Some(Instant::now());
            self.emit(item);
        }
    }
}

/// A batch upload session bound to one job. Explicitly constructed with
/// its collaborators; owns no global state.
pub struct UploadQueue {
    config: UploadConfig,
    registry: Arc<dyn PhotoRegistry>,
    uploader: Arc<dyn Uploader>,
    pool: Arc<TranscodePool>,
    state: Arc<QueueState>,
    pending_notifications: Mutex<Vec<CompletedUpload>>,
    /// Single-flight gate: at most one notification flush reads and
    /// clears the buffer at a time.
    flush_lock: tokio::sync::Mutex<()>,
    compress_gate: Semaphore,
    transport_gate: Semaphore,
    url_gate: Semaphore,
}

impl UploadQueue {
    pub fn new(
        config: UploadConfig,
        registry: Arc<dyn PhotoRegistry>,
        uploader: Arc<dyn Uploader>,
        pool: Arc<TranscodePool>,
        events: mpsc::UnboundedSender<ProgressEvent>,
    ) -> Self {
        let state = Arc::new(QueueState {
            items: Mutex::new(Vec::new()),
            events,
            progress_interval: config.progress_interval,
        });
        Self {
            compress_gate: Semaphore::new(config.compress_concurrency),
            transport_gate: Semaphore::new(config.transport_concurrency),
            url_gate: Semaphore::new(config.url_batch_concurrency),
            config,
            registry,
            uploader,
            pool,
            state,
            pending_notifications: Mutex::new(Vec::new()),
            flush_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Run a batch of files through the full pipeline. Always runs to
    /// completion across all items; per-item outcomes land in the item
    /// states and the event channel.
    pub async fn process(&self, files: Vec<ImageBuffer>) -> QueueAggregate {
        let ids = self.enqueue(files);
        debug!(
            "upload: processing {} file(s) for job {}",
            ids.len(),
            self.config.job_id
        );
        self.acquire_destinations(&ids).await;
        join_all(ids.iter().map(|id| self.run_item(*id))).await;
        self.flush_notifications(true).await;
        self.aggregate()
    }

    /// Re-submit a single failed item from `pending`. Its destination is
    /// refetched; progress restarts at zero.
    pub async fn retry(&self, item_id: Uuid) -> Result<(), String> {
        {
            let mut items = self.state.items.lock().unwrap();
            let item = items
                .iter_mut()
                .find(|i| i.id == item_id)
                .ok_or_else(|| format!("unknown upload item: {item_id}"))?;
            if item.status != UploadStatus::Failed {
                return Err(format!("item {item_id} is not in a failed state"));
            }
            item.status = UploadStatus::Pending;
            item.progress = 0;
            item.error = None;
            item.working = None;
            item.destination = None;
            item.last_emit = Some(Instant::now());
            self.state.emit(item);
        }
        self.acquire_destinations(&[item_id]).await;
        self.run_item(item_id).await;
        self.flush_notifications(true).await;
        Ok(())
    }

    /// Drop all queue state. In-flight requests are not aborted; their
    /// late results refer to items that no longer exist and are ignored.
    pub fn clear(&self) {
        self.state.items.lock().unwrap().clear();
    }

    pub fn aggregate(&self) -> QueueAggregate {
        QueueAggregate::from_items(&self.state.items.lock().unwrap())
    }

    pub fn items(&self) -> Vec<UploadItemView> {
        self.state
            .items
            .lock()
            .unwrap()
            .iter()
            .map(UploadItemView::from)
            .collect()
    }

    fn enqueue(&self, files: Vec<ImageBuffer>) -> Vec<Uuid> {
        let mut items = self.state.items.lock().unwrap();
        files
            .into_iter()
            .map(|file| {
                let item = UploadItem::new(file);
                let id = item.id;
                self.state.emit(&item);
                items.push(item);
                id
            })
            .collect()
    }

    /// Batched destination acquisition: `url_batch_size` files per call,
    /// at most `url_batch_concurrency` calls in flight. A failed batch
    /// leaves its items destination-less; they fail fast later instead
    /// of attempting a doomed transfer.
    async fn acquire_destinations(&self, ids: &[Uuid]) {
        let batches = ids
            .chunks(self.config.url_batch_size)
            .map(|chunk| chunk.to_vec());

        join_all(batches.map(|batch| async move {
            let Ok(_permit) = self.url_gate.acquire().await else {
                return;
            };
            let (present, requests): (Vec<Uuid>, Vec<UploadUrlRequest>) = {
                let items = self.state.items.lock().unwrap();
                batch
                    .iter()
                    .filter_map(|id| items.iter().find(|i| i.id == *id))
                    .map(|item| {
                        (
                            item.id,
                            UploadUrlRequest {
                                file_name: item.source.file_name().to_string(),
                                content_type: item.source.content_type().to_string(),
                            },
                        )
                    })
                    .unzip()
            };
            if requests.is_empty() {
                return;
            }
            match self
                .registry
                .get_upload_urls(&self.config.job_id, &requests)
                .await
            {
                Ok(issued) => {
                    let mut items = self.state.items.lock().unwrap();
                    for (id, destination) in present.iter().zip(issued.files.into_iter()) {
                        if let Some(item) = items.iter_mut().find(|i| i.id == *id) {
                            item.destination = Some(destination.into());
                        }
                    }
                }
                Err(error) => {
                    warn!(
                        "upload: destination batch failed for {} file(s): {error}",
                        requests.len()
                    );
                }
            }
        }))
        .await;
    }

    /// One item through compress → transport. Both stages sit behind
    /// independent gates so compression of later items overlaps with
    /// earlier items' transfers.
    async fn run_item(&self, id: Uuid) {
        let Some((source, destination, compressible)) = ({
            let items = self.state.items.lock().unwrap();
            items
                .iter()
                .find(|i| i.id == id)
                .map(|i| (i.source.clone(), i.destination.clone(), i.source.is_compressible()))
        }) else {
            return;
        };

        let payload = if compressible {
            self.state.set_status(id, UploadStatus::Compressing);
            let Ok(permit) = self.compress_gate.acquire().await else {
                return;
            };
            let working = self
                .pool
                .transcode(
                    source,
                    self.config.max_width,
                    self.config.max_height,
                    self.config.jpeg_quality,
                )
                .await;
            drop(permit);
            let mut items = self.state.items.lock().unwrap();
            match items.iter_mut().find(|i| i.id == id) {
                Some(item) => {
                    item.working = Some(working.clone());
                    working
                }
                // Queue was cleared while compressing.
                None => return,
            }
        } else {
            source
        };

        self.state.set_status(id, UploadStatus::Uploading);

        let Some(destination) = destination else {
            let error = DestinationError::Missing(payload.file_name().to_string());
            self.state.fail(id, error.to_string());
            return;
        };

        let Ok(permit) = self.transport_gate.acquire().await else {
            return;
        };
        let progress_state = Arc::clone(&self.state);
        let progress: ProgressFn = Arc::new(move |percent| progress_state.set_progress(id, percent));
        let outcome = self
            .uploader
            .upload(&self.config.job_id, &payload, &destination, progress)
            .await;
        drop(permit);

        match outcome {
            Ok(()) => {
                self.state.complete(id);
                self.push_notification(CompletedUpload {
                    file_name: payload.file_name().to_string(),
                    storage_path: destination.storage_path,
                })
                .await;
            }
            Err(error) => {
                self.state.fail(id, error.to_string());
            }
        }
    }

    /// Buffer a completion and flush once the threshold is reached.
    /// Flushes are serialized against each other but never hold up other
    /// transfers — the transport permit is already released here.
    async fn push_notification(&self, entry: CompletedUpload) {
        let should_flush = {
            let mut buffer = self.pending_notifications.lock().unwrap();
            buffer.push(entry);
            buffer.len() >= self.config.notify_threshold
        };
        if should_flush {
            self.flush_notifications(false).await;
        }
    }

    /// Notification failures are logged, never propagated: the bytes are
    /// already stored, so the items stay completed.
    async fn flush_notifications(&self, force: bool) {
        let _guard = self.flush_lock.lock().await;
        loop {
            let batch: Vec<CompletedUpload> = {
                let mut buffer = self.pending_notifications.lock().unwrap();
                if buffer.len() >= self.config.notify_threshold {
                    buffer.drain(..self.config.notify_threshold).collect()
                } else if force && !buffer.is_empty() {
                    std::mem::take(&mut *buffer)
                } else {
                    break;
                }
            };
            match self
                .registry
                .notify_upload_complete(&self.config.job_id, &batch)
                .await
            {
                Ok(photos) => {
                    debug!(
                        "upload: notified {} completion(s), registry created {} record(s)",
                        batch.len(),
                        photos.len()
                    );
                }
                Err(error) => {
                    warn!(
                        "upload: completion notification failed for {} stored file(s): {error}",
                        batch.len()
                    );
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/queue_tests.rs"]
mod queue_tests;
