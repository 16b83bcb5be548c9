//! Single-shot PUT to a pre-authorized URL.
//!
//! The storage service gives no granular transfer feedback on this
//! route, so progress jumps to 100 on completion.

use super::status_error;
use crate::types::errors::TransportError;
use crate::types::photo::ImageBuffer;
use reqwest::Client;

pub async fn upload(
    client: &Client,
    url: &str,
    payload: &ImageBuffer,
    progress: &(dyn Fn(u8) + Send + Sync),
) -> Result<(), TransportError> {
    let response = client
        .put(url)
        .header(reqwest::header::CONTENT_TYPE, payload.content_type())
        .body(payload.bytes().to_vec())
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(status_error(response).await);
    }
    progress(100);
    Ok(())
}
