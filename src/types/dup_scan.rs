//! Duplicate scanner contracts.
//!
//! Results are **group-based**: one scan produces many groups, and each
//! group contains 2..N members connected by filename or fingerprint
//! similarity. Groups live only for the duration of one batch review;
//! they are never persisted.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 64-bit perceptual fingerprint.
///
/// `Dct` is derived from the low-frequency DCT coefficients of a 32×32
/// grayscale downsample. `SizeOnly` is the degraded fallback for images
/// that failed to decode; it is derived from the byte length alone and is
/// deliberately excluded from Hamming comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fingerprint {
    Dct(u64),
    SizeOnly(u64),
}

impl Fingerprint {
    /// True for fingerprints derived from actual pixel content.
    pub fn is_reliable(&self) -> bool {
        matches!(self, Fingerprint::Dct(_))
    }

    /// Hamming distance between two fingerprints, or `None` when either
    /// side is a size-derived fallback.
    pub fn hamming_distance(&self, other: &Fingerprint) -> Option<u32> {
        match (self, other) {
            (Fingerprint::Dct(a), Fingerprint::Dct(b)) => Some((a ^ b).count_ones()),
            _ => None,
        }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fingerprint::Dct(bits) => write!(f, "{bits:064b}"),
            Fingerprint::SizeOnly(size) => write!(f, "size:{size}"),
        }
    }
}

/// A cluster of likely duplicates with 2..N members.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateGroup {
    /// Index into `members` of the file the caller is advised to keep.
    /// Default: shortest filename, first on ties. Callers may override.
    pub kept: usize,
    pub members: Vec<DuplicateMember>,
}

/// One file inside a duplicate group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateMember {
    /// Position of the file in the submitted batch.
    pub index: usize,
    pub file_name: String,
    pub size_bytes: u64,
    /// False when this member was matched on filename only because its
    /// fingerprint degraded to the size fallback.
    pub reliable_fingerprint: bool,
}
