//! One transcode job: decode, bounded resize, JPEG re-encode, EXIF
//! carry-over.

use super::exif::{extract_app1_segment, insert_app1_segment, validate_exif_payload};
use crate::types::errors::TranscodeError;
use crate::types::photo::ImageBuffer;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use log::warn;
use std::io::Cursor;

/// Unsharp mask applied after downsampling. Sigma/threshold tuned for
/// construction-site photos viewed at report size.
const UNSHARP_SIGMA: f32 = 0.8;
const UNSHARP_THRESHOLD: i32 = 2;

/// Run one job. Errors are returned to the pool, which logs them and
/// falls back to the original buffer; nothing here reaches the caller.
pub(crate) fn run(
    image: &ImageBuffer,
    max_width: u32,
    max_height: u32,
    quality: u8,
) -> Result<ImageBuffer, TranscodeError> {
    let exif_payload = if image.content_type() == "image/jpeg" {
        extract_app1_segment(image.bytes()).filter(|p| validate_exif_payload(p))
    } else {
        None
    };

    let decoded = crate::services::hash::decode_oriented(image.bytes())
        .map_err(|e| TranscodeError::Decode(e.to_string()))?;

    let (src_width, src_height) = (decoded.width(), decoded.height());
    let scale = (max_width as f64 / src_width as f64)
        .min(max_height as f64 / src_height as f64)
        .min(1.0);

    // Never upscale: at scale 1 the pixels pass through untouched and
    // only the encoding is normalized.
    let resized = if scale < 1.0 {
        let target_width = ((src_width as f64 * scale).round() as u32).max(1);
        let target_height = ((src_height as f64 * scale).round() as u32).max(1);
        decoded
            .resize_exact(target_width, target_height, FilterType::Lanczos3)
            .unsharpen(UNSHARP_SIGMA, UNSHARP_THRESHOLD)
    } else {
        decoded
    };

    let mut encoded = Vec::new();
    JpegEncoder::new_with_quality(&mut Cursor::new(&mut encoded), quality)
        .encode_image(&resized.to_rgb8())
        .map_err(|e| TranscodeError::Encode(e.to_string()))?;

    let labeled = match exif_payload {
        Some(payload) => match insert_app1_segment(&encoded, &payload) {
            Ok(with_exif) => with_exif,
            Err(error) => {
                // The resized output is still worth keeping; it just
                // loses its metadata.
                warn!(
                    "transcode: EXIF carry-over failed for {}: {error}",
                    image.file_name()
                );
                encoded
            }
        },
        None => encoded,
    };

    Ok(ImageBuffer::new(
        labeled,
        "image/jpeg",
        jpeg_file_name(image.file_name()),
    ))
}

/// Output always carries the target format's extension, whatever the
/// source was called.
pub fn jpeg_file_name(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => format!("{stem}.jpg"),
        _ => format!("{file_name}.jpg"),
    }
}
