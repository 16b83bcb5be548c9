//! Resumable chunked upload.
//!
//! The payload goes up in fixed 5 MiB slices, each as a `PUT` with a
//! `Content-Range` header. The cursor advances to whatever offset the
//! server actually confirmed (`Range` response header on 308), not the
//! slice boundary that was sent — servers may resume at a different
//! offset than requested.

use super::status_error;
use crate::types::errors::TransportError;
use crate::types::photo::ImageBuffer;
use log::warn;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Slice size for each `Content-Range` PUT.
pub const CHUNK_SIZE: usize = 5 * 1024 * 1024;
/// Attempts per chunk before the whole upload fails.
pub const MAX_CHUNK_ATTEMPTS: u32 = 3;
/// Fixed delay between chunk attempts.
pub const CHUNK_RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Outcome of one accepted chunk PUT.
enum ChunkOutcome {
    /// Terminal success: the server considers the whole upload done.
    Complete,
    /// Partial acceptance; `confirmed_end` is the next unwritten offset
    /// when the server reported one.
    Accepted { confirmed_end: Option<usize> },
}

pub async fn upload(
    client: &Client,
    url: &str,
    payload: &ImageBuffer,
    progress: &(dyn Fn(u8) + Send + Sync),
) -> Result<(), TransportError> {
    let total = payload.size();
    let mut offset = 0usize;

    while offset < total {
        let end = (offset + CHUNK_SIZE).min(total);
        match put_chunk_with_retry(client, url, payload, offset, end).await? {
            ChunkOutcome::Complete => {
                progress(100);
                return Ok(());
            }
            ChunkOutcome::Accepted { confirmed_end } => {
                let next = confirmed_end.unwrap_or(end).min(total);
                if next <= offset {
                    return Err(TransportError::Status {
                        status: 308,
                        detail: format!("server did not advance past offset {offset}"),
                    });
                }
                offset = next;
                progress(((offset as f64 / total as f64) * 100.0) as u8);
            }
        }
    }

    progress(100);
    Ok(())
}

async fn put_chunk_with_retry(
    client: &Client,
    url: &str,
    payload: &ImageBuffer,
    start: usize,
    end: usize,
) -> Result<ChunkOutcome, TransportError> {
    let total = payload.size();
    let mut last_failure = String::new();

    for attempt in 1..=MAX_CHUNK_ATTEMPTS {
        let request = client
            .put(url)
            .header("Content-Range", content_range(start, end, total))
            .header(reqwest::header::CONTENT_TYPE, payload.content_type())
            .body(payload.bytes()[start..end].to_vec());

        match request.send().await {
            Ok(response) if is_terminal_success(response.status()) => {
                return Ok(ChunkOutcome::Complete);
            }
            Ok(response) if response.status() == StatusCode::PERMANENT_REDIRECT => {
                let confirmed_end = response
                    .headers()
                    .get(reqwest::header::RANGE)
                    .and_then(|value| value.to_str().ok())
                    .and_then(parse_confirmed_end);
                return Ok(ChunkOutcome::Accepted { confirmed_end });
            }
            Ok(response) => {
                let error = status_error(response).await;
                last_failure = error.to_string();
            }
            Err(error) => {
                last_failure = error.to_string();
            }
        }

        if attempt < MAX_CHUNK_ATTEMPTS {
            warn!(
                "chunked: attempt {attempt} at offset {start} failed ({last_failure}), retrying"
            );
            tokio::time::sleep(CHUNK_RETRY_BACKOFF).await;
        }
    }

    Err(TransportError::ChunkExhausted {
        offset: start,
        attempts: MAX_CHUNK_ATTEMPTS,
        detail: last_failure,
    })
}

/// `Content-Range: bytes {start}-{last}/{total}` with an inclusive last
/// byte index.
fn content_range(start: usize, end: usize, total: usize) -> String {
    format!("bytes {}-{}/{}", start, end.saturating_sub(1), total)
}

/// Next unwritten offset from a `Range: bytes=0-N` response header,
/// where N is the last byte the server has stored.
fn parse_confirmed_end(header: &str) -> Option<usize> {
    let (_, last) = header.trim().strip_prefix("bytes=")?.split_once('-')?;
    last.trim().parse::<usize>().ok().map(|n| n + 1)
}

/// Codes the server uses for "the whole upload is done".
fn is_terminal_success(status: StatusCode) -> bool {
    status == StatusCode::OK || status == StatusCode::CREATED
}

#[cfg(test)]
#[path = "tests/chunked_tests.rs"]
mod chunked_tests;
