//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (FETCHKIT_*)
//! 2. TOML config file (if FETCHKIT_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The loaded value is constructed once and passed by reference into each
//! component's constructor; components copy out only the fields they need.
//! Nothing reads configuration through global state at runtime.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Which cache backend a requestor uses.
///
/// Extending the cache means adding a variant here (future: `Sqlite`), not
/// resolving backend names at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Content-addressed entries on the local filesystem.
    Disk,
    /// No persistence: every lookup misses, every store is dropped.
    Null,
}

/// Politeness delay between requests to the same domain, in milliseconds.
///
/// Either a fixed value or a closed `[min, max]` interval sampled uniformly
/// per request (jittered politeness).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestDelay {
    Fixed(u64),
    Range(u64, u64),
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (FETCHKIT_*)
/// 2. TOML config file (if FETCHKIT_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Cache backend selection.
    ///
    /// Set via FETCHKIT_CACHE_BACKEND ("disk" or "null").
    #[serde(default = "default_cache_backend")]
    pub cache_backend: CacheBackend,

    /// Root directory of the disk cache tree.
    ///
    /// Set via FETCHKIT_CACHE_DIR environment variable.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Cache entry time-to-live in seconds. Absent means entries never
    /// expire.
    ///
    /// Set via FETCHKIT_CACHE_EXPIRES_SECS environment variable.
    #[serde(default)]
    pub cache_expires_secs: Option<u64>,

    /// Whether cache entries are zlib-compressed on disk.
    ///
    /// Set via FETCHKIT_CACHE_COMPRESS environment variable.
    #[serde(default = "default_true")]
    pub cache_compress: bool,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via FETCHKIT_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// User-Agent identity: a named identity ("chrome", "googlebot", ...)
    /// or a literal header value.
    ///
    /// Set via FETCHKIT_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Proxy URIs to choose from, uniformly at random, per request.
    ///
    /// Set via FETCHKIT_PROXY_POOL environment variable.
    #[serde(default)]
    pub proxy_pool: Vec<String>,

    /// Whether the proxy pool is consulted at all.
    ///
    /// Set via FETCHKIT_ENABLE_PROXY environment variable.
    #[serde(default = "default_true")]
    pub enable_proxy: bool,

    /// Per-domain politeness delay in milliseconds.
    ///
    /// Set via FETCHKIT_REQUEST_DELAY_MS (integer or `[min, max]`).
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: RequestDelay,

    /// Base retry backoff delay in milliseconds.
    ///
    /// Set via FETCHKIT_RETRY_DELAY_MS environment variable.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Whether retry backoff grows exponentially (`base * 2^n`).
    ///
    /// Set via FETCHKIT_RETRY_EXPONENTIAL environment variable.
    #[serde(default = "default_true")]
    pub retry_exponential: bool,

    /// Ceiling for the retry backoff delay in milliseconds.
    ///
    /// Set via FETCHKIT_RETRY_MAX_DELAY_MS environment variable.
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,

    /// Total attempt budget for retried requests. Absent means unbounded:
    /// a permanently failing operation will be retried forever, which is
    /// the caller's responsibility to bound.
    ///
    /// Set via FETCHKIT_RETRY_MAX_ATTEMPTS environment variable.
    #[serde(default)]
    pub retry_max_attempts: Option<u32>,
}

fn default_cache_backend() -> CacheBackend {
    CacheBackend::Disk
}

fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join("fetchkit-cache")
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_user_agent() -> String {
    "chrome".into()
}

fn default_request_delay() -> RequestDelay {
    RequestDelay::Range(0, 300_000)
}

fn default_retry_delay_ms() -> u64 {
    1_000
}

fn default_retry_max_delay_ms() -> u64 {
    1_800_000
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_backend: default_cache_backend(),
            cache_dir: default_cache_dir(),
            cache_expires_secs: None,
            cache_compress: true,
            timeout_ms: default_timeout_ms(),
            user_agent: default_user_agent(),
            proxy_pool: Vec::new(),
            enable_proxy: true,
            request_delay_ms: default_request_delay(),
            retry_delay_ms: default_retry_delay_ms(),
            retry_exponential: true,
            retry_max_delay_ms: default_retry_max_delay_ms(),
            retry_max_attempts: None,
        }
    }
}

impl AppConfig {
    /// Request timeout as a Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Cache TTL as a Duration; `None` means entries never expire.
    pub fn cache_expires(&self) -> Option<Duration> {
        self.cache_expires_secs.map(Duration::from_secs)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `FETCHKIT_`
    /// 2. TOML file from `FETCHKIT_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a source cannot be read or parsed, or if
    /// validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("FETCHKIT_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("FETCHKIT_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.cache_backend, CacheBackend::Disk);
        assert_eq!(config.cache_dir, std::env::temp_dir().join("fetchkit-cache"));
        assert!(config.cache_expires_secs.is_none());
        assert!(config.cache_compress);
        assert_eq!(config.timeout_ms, 10_000);
        assert_eq!(config.user_agent, "chrome");
        assert!(config.proxy_pool.is_empty());
        assert!(config.enable_proxy);
        assert_eq!(config.request_delay_ms, RequestDelay::Range(0, 300_000));
        assert_eq!(config.retry_delay_ms, 1_000);
        assert!(config.retry_exponential);
        assert_eq!(config.retry_max_delay_ms, 1_800_000);
        assert!(config.retry_max_attempts.is_none());
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(10_000));
    }

    #[test]
    fn test_cache_expires_duration() {
        let config = AppConfig { cache_expires_secs: Some(60), ..Default::default() };
        assert_eq!(config.cache_expires(), Some(Duration::from_secs(60)));
        assert_eq!(AppConfig::default().cache_expires(), None);
    }

    #[test]
    fn test_request_delay_forms() {
        let fixed: RequestDelay = serde_json_like("2000");
        assert_eq!(fixed, RequestDelay::Fixed(2000));
        let range: RequestDelay = serde_json_like("[0, 5000]");
        assert_eq!(range, RequestDelay::Range(0, 5000));
    }

    fn serde_json_like(raw: &str) -> RequestDelay {
        figment::Figment::from(figment::providers::Toml::string(&format!("v = {raw}")))
            .extract_inner("v")
            .unwrap()
    }

    #[test]
    fn test_cache_backend_names() {
        let disk: CacheBackend =
            figment::Figment::from(figment::providers::Toml::string("v = \"disk\""))
                .extract_inner("v")
                .unwrap();
        assert_eq!(disk, CacheBackend::Disk);
        let null: CacheBackend =
            figment::Figment::from(figment::providers::Toml::string("v = \"null\""))
                .extract_inner("v")
                .unwrap();
        assert_eq!(null, CacheBackend::Null);
    }
}
