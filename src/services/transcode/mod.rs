//! Transcoding pool: a fixed set of worker threads that resize and
//! re-compress images off the async scheduler.
//!
//! Work crosses the thread boundary by message passing only — a job goes
//! in on a per-worker channel, the result comes back on a oneshot. The
//! pool is an explicitly constructed handle with its own lifecycle; it
//! owns no process-wide state.

pub(crate) mod exif;
mod worker;

use crate::types::photo::ImageBuffer;
use log::{debug, warn};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread::JoinHandle;
use tokio::sync::oneshot;

pub use worker::jpeg_file_name;

/// Lower/upper bounds on the worker count. One core is left for the
/// async scheduler.
const MIN_WORKERS: usize = 2;
const MAX_WORKERS: usize = 6;

struct TranscodeJob {
    image: ImageBuffer,
    max_width: u32,
    max_height: u32,
    quality: u8,
    reply: oneshot::Sender<ImageBuffer>,
}

/// Fixed-size pool of transcode workers with round-robin dispatch.
pub struct TranscodePool {
    senders: Vec<mpsc::Sender<TranscodeJob>>,
    next: AtomicUsize,
    handles: Vec<JoinHandle<()>>,
}

impl TranscodePool {
    /// Pool sized to the machine: clamp(available_parallelism − 1, 2, 6).
    pub fn new() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get().saturating_sub(1))
            .unwrap_or(MIN_WORKERS)
            .clamp(MIN_WORKERS, MAX_WORKERS);
        Self::with_workers(workers)
    }

    /// Pool with an explicit worker count.
    pub fn with_workers(workers: usize) -> Self {
        let workers = workers.max(1);
        let mut senders = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);
        for index in 0..workers {
            let (sender, receiver) = mpsc::channel::<TranscodeJob>();
            let handle = std::thread::Builder::new()
                .name(format!("transcode-{index}"))
                .spawn(move || {
                    while let Ok(job) = receiver.recv() {
                        let result =
                            worker::run(&job.image, job.max_width, job.max_height, job.quality)
                                .unwrap_or_else(|error| {
                                    // A failed optimization must not block
                                    // the upload: hand back the original.
                                    warn!(
                                        "transcode: degraded to original for {}: {error}",
                                        job.image.file_name()
                                    );
                                    job.image.clone()
                                });
                        let _ = job.reply.send(result);
                    }
                })
                .expect("spawn transcode worker");
            senders.push(sender);
            handles.push(handle);
        }
        debug!("transcode: pool started with {workers} worker(s)");
        Self {
            senders,
            next: AtomicUsize::new(0),
            handles,
        }
    }

    /// Resize/re-compress an image within the given bounds.
    ///
    /// Never fails: any internal error resolves with the original,
    /// unmodified image.
    pub async fn transcode(
        &self,
        image: ImageBuffer,
        max_width: u32,
        max_height: u32,
        quality: u8,
    ) -> ImageBuffer {
        let fallback = image.clone();
        let (reply, response) = oneshot::channel();
        let job = TranscodeJob {
            image,
            max_width,
            max_height,
            quality,
            reply,
        };
        let slot = self.next.fetch_add(1, Ordering::Relaxed) % self.senders.len();
        if let Err(rejected) = self.senders[slot].send(job) {
            warn!(
                "transcode: worker {slot} unavailable, passing {} through",
                rejected.0.image.file_name()
            );
            return fallback;
        }
        match response.await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "transcode: worker {slot} dropped a job, passing {} through",
                    fallback.file_name()
                );
                fallback
            }
        }
    }

    /// Drain the channels and join all workers.
    pub fn shutdown(self) {
        drop(self.senders);
        for handle in self.handles {
            let _ = handle.join();
        }
        debug!("transcode: pool shut down");
    }
}

impl Default for TranscodePool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/transcode_tests.rs"]
mod transcode_tests;
