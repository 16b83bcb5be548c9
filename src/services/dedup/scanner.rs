//! Duplicate detection over a submitted photo batch.
//!
//! Two signals connect files: equal normalized filenames (the " (n)" copy
//! suffix stripped, case-insensitive) and near perceptual fingerprints.
//! Connected components are extracted with union-find; only components of
//! two or more files are reported.
//!
//! The all-pairs comparison is O(n²) and intentional: review batches are
//! bounded (≤500 files). A BK-tree over the 64-bit hashes is the upgrade
//! path if that bound ever moves.

use crate::services::hash;
use crate::types::dup_scan::{DuplicateGroup, DuplicateMember, Fingerprint};
use crate::types::photo::ImageBuffer;
use log::{debug, warn};
use rayon::prelude::*;
use regex::Regex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::LazyLock;

/// Hamming threshold for the interactive review scan.
pub const DEFAULT_HAMMING_THRESHOLD: u32 = 10;
/// Tighter threshold for the background batch variant.
pub const BACKGROUND_HAMMING_THRESHOLD: u32 = 2;

/// Compiled regex for the " (n)" duplicate suffix between stem and
/// extension, e.g. `photo (2).jpg`.
static RE_COPY_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)\s*\(\d+\)(\.[^.]*)?$").expect("valid regex"));

/// Progress callback: (processed, total), invoked after every file
/// whether or not its fingerprint succeeded.
pub type ScanProgress = dyn Fn(usize, usize) + Send + Sync;

/// Scan a batch for duplicate groups at the default threshold.
///
/// A file that cannot be fingerprinted degrades to a size-derived
/// fallback and can still be grouped by filename; one bad image never
/// aborts the batch.
pub fn detect_duplicates(
    files: &[ImageBuffer],
    on_progress: Option<&ScanProgress>,
) -> Vec<DuplicateGroup> {
    let fingerprints = compute_fingerprints(files, on_progress);
    let components = group_indices(files, &fingerprints, DEFAULT_HAMMING_THRESHOLD);
    debug!(
        "dedup: {} files formed {} duplicate group(s)",
        files.len(),
        components.len()
    );
    build_groups(files, &fingerprints, components)
}

/// Background variant: same grouping semantics at the tighter threshold,
/// returning index groups only for the caller to re-hydrate. Runs the
/// whole scan off the async scheduler.
pub async fn scan_index_groups(files: Vec<ImageBuffer>) -> Vec<Vec<usize>> {
    tokio::task::spawn_blocking(move || {
        let fingerprints = compute_fingerprints(&files, None);
        group_indices(&files, &fingerprints, BACKGROUND_HAMMING_THRESHOLD)
    })
    .await
    .unwrap_or_else(|error| {
        warn!("dedup: background scan worker failed: {error}");
        Vec::new()
    })
}

/// Fingerprint every file in parallel, reporting progress per file.
fn compute_fingerprints(
    files: &[ImageBuffer],
    on_progress: Option<&ScanProgress>,
) -> Vec<Fingerprint> {
    let total = files.len();
    let processed = AtomicUsize::new(0);
    files
        .par_iter()
        .map(|file| {
            let fp = hash::fingerprint(file).unwrap_or_else(|error| {
                warn!(
                    "dedup: fingerprint degraded to size fallback for {}: {error}",
                    file.file_name()
                );
                Fingerprint::SizeOnly(file.size() as u64)
            });
            let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
            if let Some(progress) = on_progress {
                progress(done, total);
            }
            fp
        })
        .collect()
}

/// Strip the " (n)" copy suffix and lowercase, so `Photo (2).JPG`
/// normalizes to `photo.jpg`.
pub(crate) fn normalized_file_name(name: &str) -> String {
    match RE_COPY_SUFFIX.captures(name) {
        Some(caps) => {
            let stem = caps.get(1).map_or("", |m| m.as_str());
            let ext = caps.get(2).map_or("", |m| m.as_str());
            format!("{stem}{ext}").to_lowercase()
        }
        None => name.to_lowercase(),
    }
}

/// All-pairs union scan → connected components of size ≥ 2, each sorted
/// by submission index, components ordered by their first member.
fn group_indices(
    files: &[ImageBuffer],
    fingerprints: &[Fingerprint],
    threshold: u32,
) -> Vec<Vec<usize>> {
    let n = files.len();
    let normalized: Vec<String> = files
        .iter()
        .map(|f| normalized_file_name(f.file_name()))
        .collect();

    let mut parent: Vec<usize> = (0..n).collect();
    for left in 0..n {
        for right in (left + 1)..n {
            let name_match = normalized[left] == normalized[right];
            let near = fingerprints[left]
                .hamming_distance(&fingerprints[right])
                .is_some_and(|d| d <= threshold);
            if name_match || near {
                union(&mut parent, left, right);
            }
        }
    }

    let mut components: HashMap<usize, Vec<usize>> = HashMap::new();
    for index in 0..n {
        let root = find(&mut parent, index);
        components.entry(root).or_default().push(index);
    }

    let mut groups: Vec<Vec<usize>> = components
        .into_values()
        .filter(|members| members.len() > 1)
        .collect();
    for group in &mut groups {
        group.sort_unstable();
    }
    groups.sort_unstable_by_key(|group| group[0]);
    groups
}

fn build_groups(
    files: &[ImageBuffer],
    fingerprints: &[Fingerprint],
    components: Vec<Vec<usize>>,
) -> Vec<DuplicateGroup> {
    components
        .into_iter()
        .map(|indices| {
            let members: Vec<DuplicateMember> = indices
                .iter()
                .map(|&index| DuplicateMember {
                    index,
                    file_name: files[index].file_name().to_string(),
                    size_bytes: files[index].size() as u64,
                    reliable_fingerprint: fingerprints[index].is_reliable(),
                })
                .collect();

            // Kept file: shortest filename, first on ties.
            let kept = members
                .iter()
                .enumerate()
                .min_by_key(|(pos, m)| (m.file_name.len(), *pos))
                .map(|(pos, _)| pos)
                .unwrap_or(0);

            DuplicateGroup { kept, members }
        })
        .collect()
}

fn find(parent: &mut [usize], index: usize) -> usize {
    if parent[index] == index {
        return index;
    }
    let root = find(parent, parent[index]);
    parent[index] = root;
    root
}

fn union(parent: &mut [usize], left: usize, right: usize) {
    let left_root = find(parent, left);
    let right_root = find(parent, right);
    if left_root != right_root {
        parent[right_root] = left_root;
    }
}

#[cfg(test)]
#[path = "tests/dedup_scanner_tests.rs"]
mod dedup_scanner_tests;
