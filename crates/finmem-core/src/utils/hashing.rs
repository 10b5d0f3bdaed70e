//! Hashing Utilities

use sha2::{Digest, Sha256};

/// Map a feature to a bucket in `[0, buckets)` and a sign of ±1.
///
/// Stable across processes and platforms, unlike `std` hashers.
pub fn feature_bucket(feature: &str, buckets: usize) -> (usize, f32) {
    let digest = Sha256::digest(feature.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    let value = u64::from_le_bytes(head);
    let bucket = (value % buckets.max(1) as u64) as usize;
    let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
    (bucket, sign)
}
