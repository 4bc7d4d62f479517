//! Content hashing helpers.
//!
//! All content-addressed identifiers and cache-key components in Svar go
//! through [`sha256_hex`] so that identical input always maps to the same
//! identifier without any coordination.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of a UTF-8 string.
pub fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}
