//! Perceptual fingerprint engine.
//!
//! Produces a 64-bit DCT hash: decode (EXIF-orientation-corrected),
//! downsample to 32×32, grayscale, separable 2-D DCT-II, then threshold
//! the 8×8 low-frequency block against the mean of its 63 non-DC
//! coefficients. Deterministic bit-for-bit for identical decoded pixels.

use crate::types::dup_scan::Fingerprint;
use crate::types::errors::FingerprintError;
use crate::types::photo::ImageBuffer;
use image::metadata::Orientation;
use image::{imageops::FilterType, DynamicImage, ImageDecoder, ImageReader};
use std::io::Cursor;

/// Edge length of the grayscale downsample the DCT runs over.
const SAMPLE_DIM: usize = 32;
/// Edge length of the low-frequency block the hash is read from.
const BLOCK_DIM: usize = 8;

/// Compute the perceptual fingerprint of an image.
///
/// Fails only when the payload cannot be decoded (corrupt data or an
/// unsupported container). Orientation metadata is applied before
/// hashing, so containers differing only in their orientation tag
/// fingerprint identically.
pub fn fingerprint(image: &ImageBuffer) -> Result<Fingerprint, FingerprintError> {
    let decoded = decode_oriented(image.bytes())?;
    Ok(Fingerprint::Dct(dct_hash(&decoded)))
}

/// Decode honoring the embedded EXIF orientation.
pub(crate) fn decode_oriented(bytes: &[u8]) -> Result<DynamicImage, FingerprintError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| FingerprintError::Decode(e.to_string()))?;
    let mut decoder = reader
        .into_decoder()
        .map_err(|e| FingerprintError::Decode(e.to_string()))?;
    let orientation = decoder
        .orientation()
        .unwrap_or(Orientation::NoTransforms);
    let mut decoded = DynamicImage::from_decoder(decoder)
        .map_err(|e| FingerprintError::Decode(e.to_string()))?;
    decoded.apply_orientation(orientation);
    Ok(decoded)
}

/// 64-bit DCT hash over an already decoded image.
fn dct_hash(image: &DynamicImage) -> u64 {
    let small = image
        .resize_exact(SAMPLE_DIM as u32, SAMPLE_DIM as u32, FilterType::Triangle)
        .to_rgb8();

    // ITU-R 601-2 luma transform.
    let mut luma = [[0f32; SAMPLE_DIM]; SAMPLE_DIM];
    for (x, y, pixel) in small.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        luma[y as usize][x as usize] =
            0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
    }

    let freq = dct_2d(&luma);

    // Top-left 8×8 block holds the lowest frequencies. The mean excludes
    // the DC term, which would otherwise dominate the threshold.
    let mut coeffs = [0f32; BLOCK_DIM * BLOCK_DIM];
    for v in 0..BLOCK_DIM {
        for u in 0..BLOCK_DIM {
            coeffs[v * BLOCK_DIM + u] = freq[v][u];
        }
    }
    let mean = (coeffs.iter().sum::<f32>() - coeffs[0]) / (coeffs.len() - 1) as f32;

    let mut bits = 0u64;
    for (i, &coeff) in coeffs.iter().enumerate() {
        if coeff > mean {
            bits |= 1 << (63 - i);
        }
    }
    bits
}

/// Separable 2-D DCT-II: 1-D transform over rows, then over the
/// row-transformed columns.
fn dct_2d(input: &[[f32; SAMPLE_DIM]; SAMPLE_DIM]) -> [[f32; SAMPLE_DIM]; SAMPLE_DIM] {
    let mut rows = [[0f32; SAMPLE_DIM]; SAMPLE_DIM];
    for (y, row) in input.iter().enumerate() {
        rows[y] = dct_1d(row);
    }

    let mut out = [[0f32; SAMPLE_DIM]; SAMPLE_DIM];
    for x in 0..SAMPLE_DIM {
        let mut column = [0f32; SAMPLE_DIM];
        for y in 0..SAMPLE_DIM {
            column[y] = rows[y][x];
        }
        let transformed = dct_1d(&column);
        for y in 0..SAMPLE_DIM {
            out[y][x] = transformed[y];
        }
    }
    out
}

/// Plain O(n²) DCT-II. n = 32, so no FFT factorization is warranted.
fn dct_1d(input: &[f32; SAMPLE_DIM]) -> [f32; SAMPLE_DIM] {
    let n = SAMPLE_DIM as f32;
    let mut out = [0f32; SAMPLE_DIM];
    for (k, slot) in out.iter_mut().enumerate() {
        let mut sum = 0f32;
        for (i, &sample) in input.iter().enumerate() {
            sum += sample
                * (std::f32::consts::PI / n * (i as f32 + 0.5) * k as f32).cos();
        }
        *slot = sum;
    }
    out
}

#[cfg(test)]
#[path = "tests/hash_tests.rs"]
mod tests;
