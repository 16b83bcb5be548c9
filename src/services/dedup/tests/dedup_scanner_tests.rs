use super::*;
use image::{ImageFormat, RgbImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

fn png_buffer(name: &str, seed: u32) -> ImageBuffer {
    let img = RgbImage::from_fn(48, 48, |x, y| {
        image::Rgb([
            ((x * seed) % 256) as u8,
            ((y + seed) % 256) as u8,
            ((x + y) % 256) as u8,
        ])
    });
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    ImageBuffer::new(bytes, "image/png", name)
}

fn corrupt_buffer(name: &str, len: usize) -> ImageBuffer {
    ImageBuffer::new(vec![0xab; len], "image/jpeg", name)
}

/// Deterministic per-seed noise; two seeds give unrelated content.
fn noise_buffer(name: &str, seed: u32) -> ImageBuffer {
    let mut state = seed;
    let mut next = move || {
        state = state.wrapping_mul(1664525).wrapping_add(1013904223);
        (state >> 24) as u8
    };
    let img = RgbImage::from_fn(48, 48, |_, _| image::Rgb([next(), next(), next()]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    ImageBuffer::new(bytes, "image/png", name)
}

/// Files with throwaway names used when driving `group_indices` with
/// synthetic fingerprints.
fn stub_files(count: usize) -> Vec<ImageBuffer> {
    (0..count)
        .map(|i| ImageBuffer::new(vec![0u8; 4], "image/jpeg", format!("file-{i}.jpg")))
        .collect()
}

#[test]
fn copy_suffix_and_case_are_normalized() {
    assert_eq!(normalized_file_name("Photo (1).JPG"), "photo.jpg");
    assert_eq!(normalized_file_name("photo(2).jpg"), "photo.jpg");
    assert_eq!(normalized_file_name("photo.jpg"), "photo.jpg");
    assert_eq!(normalized_file_name("site survey (12).png"), "site survey.png");
    assert_eq!(normalized_file_name("no-suffix"), "no-suffix");
}

#[test]
fn identical_content_with_copy_suffix_groups() {
    let files = vec![png_buffer("photo.jpg", 3), png_buffer("photo (1).jpg", 3)];
    let groups = detect_duplicates(&files, None);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].members.len(), 2);
}

#[test]
fn copy_suffix_groups_even_when_fingerprints_fail() {
    // Both undecodable: size fallbacks never compare, but the filename
    // signal still connects them.
    let files = vec![
        corrupt_buffer("photo.jpg", 10),
        corrupt_buffer("photo (1).jpg", 20),
    ];
    let groups = detect_duplicates(&files, None);
    assert_eq!(groups.len(), 1);
    assert!(groups[0].members.iter().all(|m| !m.reliable_fingerprint));
}

#[test]
fn unrelated_files_never_group() {
    let files = vec![noise_buffer("a.jpg", 3), noise_buffer("b.jpg", 97)];
    let groups = detect_duplicates(&files, None);
    assert!(groups.is_empty(), "dissimilar content must not group");
}

#[test]
fn progress_fires_for_every_file_including_failures() {
    let files = vec![
        png_buffer("a.jpg", 3),
        corrupt_buffer("broken.jpg", 16),
        png_buffer("b.jpg", 97),
    ];
    let calls = std::sync::Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let progress = move |_done: usize, total: usize| {
        assert_eq!(total, 3);
        counter.fetch_add(1, Ordering::Relaxed);
    };
    detect_duplicates(&files, Some(&progress));
    assert_eq!(calls.load(Ordering::Relaxed), 3);
}

#[test]
fn hamming_threshold_boundary_is_inclusive() {
    let files = stub_files(2);
    let base = Fingerprint::Dct(0);
    let ten_bits = Fingerprint::Dct((1u64 << 10) - 1);
    let eleven_bits = Fingerprint::Dct((1u64 << 11) - 1);

    let at_threshold = group_indices(&files, &[base, ten_bits], DEFAULT_HAMMING_THRESHOLD);
    assert_eq!(at_threshold, vec![vec![0, 1]], "distance 10 must group");

    let over_threshold = group_indices(&files, &[base, eleven_bits], DEFAULT_HAMMING_THRESHOLD);
    assert!(over_threshold.is_empty(), "distance 11 must not group");
}

#[test]
fn size_fallbacks_never_match_by_fingerprint() {
    let files = stub_files(2);
    let fps = [Fingerprint::SizeOnly(100), Fingerprint::SizeOnly(100)];
    assert!(group_indices(&files, &fps, DEFAULT_HAMMING_THRESHOLD).is_empty());
}

#[test]
fn transitive_pairs_form_one_component() {
    // 0↔1 and 1↔2 are near; 0↔2 is not. Union-find must still produce a
    // single three-member group.
    let files = stub_files(3);
    let fps = [
        Fingerprint::Dct(0),
        Fingerprint::Dct((1u64 << 8) - 1),  // 8 bits from 0
        Fingerprint::Dct((1u64 << 16) - 1), // 8 bits from the middle, 16 from 0
    ];
    let groups = group_indices(&files, &fps, DEFAULT_HAMMING_THRESHOLD);
    assert_eq!(groups, vec![vec![0, 1, 2]]);
}

#[test]
fn kept_member_is_shortest_name_first_on_ties() {
    let files = vec![
        png_buffer("photo-long-name.jpg", 3),
        png_buffer("photo.jpg", 3),
        png_buffer("photb.jpg", 3),
    ];
    // All identical content → one group. "photo.jpg" and "photb.jpg" tie
    // on length; the earlier member wins.
    let groups = detect_duplicates(&files, None);
    assert_eq!(groups.len(), 1);
    let group = &groups[0];
    assert_eq!(group.members[group.kept].file_name, "photo.jpg");
}

#[tokio::test]
async fn background_variant_uses_tighter_threshold() {
    let files = stub_files(2);
    let two_bits = [Fingerprint::Dct(0), Fingerprint::Dct(0b11)];
    let three_bits = [Fingerprint::Dct(0), Fingerprint::Dct(0b111)];

    assert_eq!(
        group_indices(&files, &two_bits, BACKGROUND_HAMMING_THRESHOLD),
        vec![vec![0, 1]]
    );
    assert!(group_indices(&files, &three_bits, BACKGROUND_HAMMING_THRESHOLD).is_empty());

    // End-to-end: identical images group regardless of variant.
    let real = vec![png_buffer("x.png", 5), png_buffer("y.png", 5)];
    let groups = scan_index_groups(real).await;
    assert_eq!(groups, vec![vec![0, 1]]);
}
