//! Page cache: backend selection and the disk implementation.

pub mod disk;
pub mod entry;
pub mod hash;

pub use disk::DiskCache;
pub use entry::CacheEntry;
pub use hash::{cache_key, shard_path};

use crate::Error;
use crate::config::{AppConfig, CacheBackend};

/// A constructed cache backend.
///
/// Backends are an enumerated set; selecting one is a match on
/// [`CacheBackend`], not a runtime name lookup. `Null` is the "no cache"
/// backend: every lookup misses and every store is dropped, so a requestor
/// built with it always goes to the network.
#[derive(Debug, Clone)]
pub enum PageCache {
    Disk(DiskCache),
    Null,
}

impl PageCache {
    /// Build the backend selected by `config`.
    pub fn from_config(config: &AppConfig) -> Self {
        match config.cache_backend {
            CacheBackend::Disk => PageCache::Disk(DiskCache::new(
                config.cache_dir.clone(),
                config.cache_expires(),
                config.cache_compress,
            )),
            CacheBackend::Null => PageCache::Null,
        }
    }

    /// Fetch the cached body for `url`; `Error::CacheMiss` when absent.
    pub async fn get(&self, url: &str) -> Result<Vec<u8>, Error> {
        match self {
            PageCache::Disk(cache) => cache.get(url).await,
            PageCache::Null => Err(Error::CacheMiss(url.to_string())),
        }
    }

    /// Store `content` under `url`.
    pub async fn set(&self, url: &str, content: &[u8]) -> Result<(), Error> {
        match self {
            PageCache::Disk(cache) => cache.set(url, content).await,
            PageCache::Null => Ok(()),
        }
    }

    /// Remove the entry for `url`.
    pub async fn delete(&self, url: &str) -> Result<(), Error> {
        match self {
            PageCache::Disk(cache) => cache.delete(url).await,
            PageCache::Null => Err(Error::CacheMiss(url.to_string())),
        }
    }

    /// Fetch and remove the entry for `url` in one step.
    pub async fn pop(&self, url: &str) -> Result<Vec<u8>, Error> {
        match self {
            PageCache::Disk(cache) => cache.pop(url).await,
            PageCache::Null => Err(Error::CacheMiss(url.to_string())),
        }
    }

    /// Remove all entries.
    pub async fn clear(&self) -> Result<(), Error> {
        match self {
            PageCache::Disk(cache) => cache.clear().await,
            PageCache::Null => Ok(()),
        }
    }
}
