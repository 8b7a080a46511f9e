//! Content-addressed cache key generation.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Compute the cache key for a URL: lowercase hex SHA-256 of the URL bytes.
pub fn cache_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Storage location of a cache key under `root`.
///
/// Entries fan out into a two-level directory tree keyed by the first and
/// last two hex characters of the digest, bounding the number of entries per
/// directory: `root/<first-2>/<last-2>/<digest>`.
pub fn shard_path(root: &Path, key: &str) -> PathBuf {
    root.join(&key[..2]).join(&key[key.len() - 2..]).join(key)
}
