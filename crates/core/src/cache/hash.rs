//! Content-addressed cache key generation.

use sha2::{Digest, Sha256};

/// Compute the cache key for a URL.
///
/// The key is the hex SHA-256 of the exact URL bytes. No normalization is
/// applied, so `https://a.onion` and `https://a.onion/` are different entries.
pub fn compute_cache_key(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}
