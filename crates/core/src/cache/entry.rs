//! On-disk cache entry record.
//!
//! An entry is the exact response body as received, tagged with its URL and
//! fetch time. Entries are bincode-encoded and optionally zlib-compressed
//! before hitting the filesystem; both transforms round-trip byte-for-byte.

use std::io::{Read, Write};

use chrono::{DateTime, Utc};
use flate2::{Compression, read::ZlibDecoder, write::ZlibEncoder};
use serde::{Deserialize, Serialize};

use crate::Error;

/// One cached fetch result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The URL the body was fetched from.
    pub url: String,
    /// The exact response body as received.
    pub content: Vec<u8>,
    /// When the body was fetched.
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Create an entry stamped with the current time.
    pub fn new(url: impl Into<String>, content: Vec<u8>) -> Self {
        Self { url: url.into(), content, fetched_at: Utc::now() }
    }

    /// Whether the entry is stale under the given TTL. `None` never expires.
    pub fn is_expired(&self, ttl: Option<chrono::Duration>) -> bool {
        match ttl {
            Some(ttl) => Utc::now() - self.fetched_at > ttl,
            None => false,
        }
    }

    /// Serialize for storage, compressing when `compress` is set.
    pub fn encode(&self, compress: bool) -> Result<Vec<u8>, Error> {
        let data = bincode::serialize(self).map_err(|e| Error::Cache(e.to_string()))?;
        if !compress {
            return Ok(data);
        }
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&data)?;
        Ok(encoder.finish()?)
    }

    /// Inverse of [`encode`](Self::encode). Fails on truncated or garbled
    /// input, or input written under the opposite `compress` setting.
    pub fn decode(raw: &[u8], compress: bool) -> Result<Self, Error> {
        let data = if compress {
            let mut decoder = ZlibDecoder::new(raw);
            let mut data = Vec::new();
            decoder.read_to_end(&mut data)?;
            data
        } else {
            raw.to_vec()
        };
        bincode::deserialize(&data).map_err(|e| Error::Cache(e.to_string()))
    }
}
