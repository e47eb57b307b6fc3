//! Request key generation.

use sha2::{Digest, Sha256};

/// Compute the cache key for a request from its method and URL.
///
/// The method is case-normalized; the URL is expected to be canonical
/// already (fragment stripped, host lowercased). Header variance is checked
/// separately against the stored `Vary` values.
pub fn compute_cache_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
