use super::*;
use crate::services::transcode::exif::{exif_app1_payload_with_orientation, insert_app1_segment};
use image::{ImageFormat, RgbImage};
use std::io::Cursor;

fn gradient_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
}

/// Deterministic per-seed noise so two seeds give statistically
/// independent hashes.
fn noise_image(seed: u32, width: u32, height: u32) -> RgbImage {
    let mut state = seed;
    let mut next = move || {
        state = state.wrapping_mul(1664525).wrapping_add(1013904223);
        (state >> 24) as u8
    };
    RgbImage::from_fn(width, height, |_, _| image::Rgb([next(), next(), next()]))
}

fn encode(img: &RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
    bytes
}

fn buffer(bytes: Vec<u8>, name: &str) -> ImageBuffer {
    let content_type = if name.ends_with(".png") {
        "image/png"
    } else {
        "image/jpeg"
    };
    ImageBuffer::new(bytes, content_type, name)
}

#[test]
fn fingerprint_is_deterministic() {
    let png = encode(&gradient_image(64, 48), ImageFormat::Png);
    let buf = buffer(png, "a.png");
    let first = fingerprint(&buf).unwrap();
    let second = fingerprint(&buf).unwrap();
    assert_eq!(first, second);
    assert!(first.is_reliable());
}

#[test]
fn identical_pixels_in_identical_containers_match() {
    let img = gradient_image(64, 48);
    let a = buffer(encode(&img, ImageFormat::Png), "a.png");
    let b = buffer(encode(&img, ImageFormat::Png), "b.png");
    assert_eq!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
}

#[test]
fn dissimilar_content_is_far_apart() {
    let a = buffer(encode(&noise_image(7, 64, 64), ImageFormat::Png), "a.png");
    let b = buffer(encode(&noise_image(1234, 64, 64), ImageFormat::Png), "b.png");
    let distance = fingerprint(&a)
        .unwrap()
        .hamming_distance(&fingerprint(&b).unwrap())
        .unwrap();
    assert!(
        distance > 10,
        "independent noise should exceed the grouping threshold, got {distance}"
    );
}

#[test]
fn corrupt_payload_is_a_decode_error() {
    let buf = ImageBuffer::new(vec![0xde, 0xad, 0xbe, 0xef], "image/jpeg", "bad.jpg");
    assert!(fingerprint(&buf).is_err());
}

#[test]
fn neutral_orientation_tag_does_not_change_the_hash() {
    // Same JPEG bytes with and without an orientation=1 APP1 segment:
    // decoded pixels are identical, so the fingerprint must be too.
    let jpeg = encode(&gradient_image(64, 48), ImageFormat::Jpeg);
    let tagged = insert_app1_segment(&jpeg, &exif_app1_payload_with_orientation(1)).unwrap();

    let plain = fingerprint(&buffer(jpeg, "a.jpg")).unwrap();
    let with_tag = fingerprint(&buffer(tagged, "a-tagged.jpg")).unwrap();
    assert_eq!(plain, with_tag);
}

#[test]
fn orientation_tag_is_applied_before_hashing() {
    // A 180°-rotation tag must hash like the explicitly rotated pixels.
    let jpeg = encode(&gradient_image(64, 48), ImageFormat::Jpeg);
    let tagged = insert_app1_segment(&jpeg, &exif_app1_payload_with_orientation(3)).unwrap();

    let oriented = decode_oriented(&tagged).unwrap();
    let rotated_by_hand = decode_oriented(&jpeg).unwrap().rotate180();
    assert_eq!(dct_hash(&oriented), dct_hash(&rotated_by_hand));
}
