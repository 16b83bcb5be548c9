//! Raw EXIF (APP1) segment handling for JPEG payloads.
//!
//! Transcoding re-encodes pixels, which drops the source metadata; the
//! original APP1 segment is carried over byte-for-byte into the new JPEG
//! instead of being re-serialized field by field.

use crate::types::errors::TranscodeError;
use log::debug;

const MARKER_PREFIX: u8 = 0xFF;
const SOI: [u8; 2] = [0xFF, 0xD8];
const APP0: u8 = 0xE0;
const APP1: u8 = 0xE1;
const SOS: u8 = 0xDA;

/// EXIF identifier at the start of an APP1 payload.
const EXIF_HEADER: &[u8; 6] = b"Exif\0\0";

/// Extract the EXIF APP1 payload (including the `Exif\0\0` prefix) from
/// a JPEG, or `None` when the file carries no EXIF segment.
pub(crate) fn extract_app1_segment(jpeg: &[u8]) -> Option<Vec<u8>> {
    if jpeg.len() < 4 || jpeg[..2] != SOI {
        return None;
    }
    let mut cursor = 2;
    while cursor + 4 <= jpeg.len() {
        if jpeg[cursor] != MARKER_PREFIX {
            return None;
        }
        let marker = jpeg[cursor + 1];
        if marker == SOS {
            // Entropy-coded data from here on; no more metadata segments.
            return None;
        }
        let length = u16::from_be_bytes([jpeg[cursor + 2], jpeg[cursor + 3]]) as usize;
        if length < 2 || cursor + 2 + length > jpeg.len() {
            return None;
        }
        let payload = &jpeg[cursor + 4..cursor + 2 + length];
        if marker == APP1 && payload.starts_with(EXIF_HEADER) {
            return Some(payload.to_vec());
        }
        cursor += 2 + length;
    }
    None
}

/// Validate an extracted APP1 payload with the EXIF parser. Invalid
/// payloads are not worth carrying into the output.
pub(crate) fn validate_exif_payload(payload: &[u8]) -> bool {
    let Some(tiff) = payload.strip_prefix(EXIF_HEADER.as_slice()) else {
        return false;
    };
    match exif::Reader::new().read_raw(tiff.to_vec()) {
        Ok(parsed) => {
            debug!("exif: payload valid, {} field(s)", parsed.fields().count());
            true
        }
        Err(_) => false,
    }
}

/// Splice an APP1 payload into a JPEG, after the JFIF APP0 segment when
/// one is present, otherwise directly after SOI.
pub(crate) fn insert_app1_segment(
    jpeg: &[u8],
    payload: &[u8],
) -> Result<Vec<u8>, TranscodeError> {
    if jpeg.len() < 2 || jpeg[..2] != SOI {
        return Err(TranscodeError::Metadata(
            "output is not a JPEG stream".to_string(),
        ));
    }
    let segment_length = payload.len() + 2;
    if segment_length > u16::MAX as usize {
        return Err(TranscodeError::Metadata(format!(
            "EXIF payload too large for one segment: {} bytes",
            payload.len()
        )));
    }

    let mut insert_at = 2;
    if jpeg.len() >= 6 && jpeg[2] == MARKER_PREFIX && jpeg[3] == APP0 {
        let app0_length = u16::from_be_bytes([jpeg[4], jpeg[5]]) as usize;
        if 2 + 2 + app0_length <= jpeg.len() {
            insert_at = 2 + 2 + app0_length;
        }
    }

    let mut out = Vec::with_capacity(jpeg.len() + segment_length + 2);
    out.extend_from_slice(&jpeg[..insert_at]);
    out.extend_from_slice(&[MARKER_PREFIX, APP1]);
    out.extend_from_slice(&(segment_length as u16).to_be_bytes());
    out.extend_from_slice(payload);
    out.extend_from_slice(&jpeg[insert_at..]);
    Ok(out)
}

/// Minimal EXIF APP1 payload carrying a single orientation tag. Test
/// fixture for orientation-sensitive paths.
#[cfg(test)]
pub(crate) fn exif_app1_payload_with_orientation(orientation: u16) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(EXIF_HEADER);
    // TIFF header: little-endian, magic 42, IFD0 at offset 8.
    payload.extend_from_slice(&[0x49, 0x49, 0x2A, 0x00, 0x08, 0x00, 0x00, 0x00]);
    // IFD0: one entry.
    payload.extend_from_slice(&1u16.to_le_bytes());
    // Tag 0x0112 (Orientation), type SHORT, count 1, inline value.
    payload.extend_from_slice(&0x0112u16.to_le_bytes());
    payload.extend_from_slice(&3u16.to_le_bytes());
    payload.extend_from_slice(&1u32.to_le_bytes());
    payload.extend_from_slice(&orientation.to_le_bytes());
    payload.extend_from_slice(&[0x00, 0x00]);
    // No next IFD.
    payload.extend_from_slice(&0u32.to_le_bytes());
    payload
}
