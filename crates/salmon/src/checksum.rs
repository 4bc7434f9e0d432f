//! SHA-256 checksum utility for drift detection.

use sha2::{Digest, Sha256};

/// Compute the lowercase hex SHA-256 of raw migration bytes.
///
/// Always fed the file exactly as read; no whitespace or comment
/// normalization happens before hashing.
pub fn compute_checksum(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let result = hasher.finalize();
    format!("{:x}", result)
}
