//! Disk-backed page cache.
//!
//! Persists fetch results across process runs, keyed by URL, under a
//! two-level sharded directory tree. Expiration is logical: a stale entry
//! reads as a miss but stays on disk until overwritten or deleted. Writes
//! go to a temp file in the target directory and are renamed into place, so
//! a concurrent reader observes either the old or the new entry, never a
//! partial one.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::Error;
use crate::cache::entry::CacheEntry;
use crate::cache::hash::{cache_key, shard_path};

static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Content-addressed persistent cache of page bodies.
#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
    expires: Option<chrono::Duration>,
    compress: bool,
}

impl DiskCache {
    /// Create a cache rooted at `root`. `expires` of `None` keeps entries
    /// forever; `compress` controls zlib compression of stored entries.
    ///
    /// The directory tree is created lazily on first write.
    pub fn new(root: PathBuf, expires: Option<Duration>, compress: bool) -> Self {
        let expires = expires.and_then(|d| chrono::Duration::from_std(d).ok());
        Self { root, expires, compress }
    }

    /// Filesystem location of the entry for `url`.
    pub fn entry_path(&self, url: &str) -> PathBuf {
        shard_path(&self.root, &cache_key(url))
    }

    /// Fetch the cached body for `url`.
    ///
    /// Signals `Error::CacheMiss` when no entry exists, the entry has
    /// expired (left on disk), or the entry cannot be decoded (a garbled
    /// entry degrades to a miss rather than an error).
    pub async fn get(&self, url: &str) -> Result<Vec<u8>, Error> {
        let path = self.entry_path(url);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::CacheMiss(url.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let entry = match CacheEntry::decode(&raw, self.compress) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("discarding malformed cache entry for '{}': {}", url, e);
                return Err(Error::CacheMiss(url.to_string()));
            }
        };

        if entry.is_expired(self.expires) {
            return Err(Error::CacheMiss(url.to_string()));
        }

        Ok(entry.content)
    }

    /// Store `content` under `url`, overwriting any prior entry.
    pub async fn set(&self, url: &str, content: &[u8]) -> Result<(), Error> {
        let entry = CacheEntry::new(url, content.to_vec());
        let encoded = entry.encode(self.compress)?;

        let path = self.entry_path(url);
        let dir = path
            .parent()
            .ok_or_else(|| Error::Cache(format!("no parent directory for '{}'", path.display())))?;
        tokio::fs::create_dir_all(dir).await?;

        // Unique temp name so concurrent writers for the same key cannot
        // interleave; the rename publishes the entry atomically.
        let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("tmp-{}-{}", std::process::id(), seq));
        tokio::fs::write(&tmp, &encoded).await?;
        tokio::fs::rename(&tmp, &path).await?;

        tracing::debug!("cached {} bytes for '{}'", content.len(), url);
        Ok(())
    }

    /// Remove the entry for `url`, then prune the now-empty shard
    /// directories. Pruning is best-effort: a shared directory level may
    /// still hold other entries, so failures are ignored.
    pub async fn delete(&self, url: &str) -> Result<(), Error> {
        let path = self.entry_path(url);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::CacheMiss(url.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        let mut dir = path.parent();
        for _ in 0..2 {
            let Some(d) = dir else { break };
            if tokio::fs::remove_dir(d).await.is_err() {
                break;
            }
            dir = d.parent();
        }
        Ok(())
    }

    /// Fetch and remove the entry for `url` in one step.
    pub async fn pop(&self, url: &str) -> Result<Vec<u8>, Error> {
        let content = self.get(url).await?;
        self.delete(url).await?;
        Ok(content)
    }

    /// Remove the entire cache tree.
    pub async fn clear(&self) -> Result<(), Error> {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
