//! The fetch pipeline: cache lookup, per-domain throttling, retried HTTP
//! attempts, and cache store behind a single entry point.
//!
//! ### Pipeline
//! For one `fetch` call: cache lookup first; a hit returns at once with no
//! throttle wait, no network, no store. On a miss: acquire the domain lock,
//! wait out the politeness delay, run the HTTP attempt under the retry
//! policy, release the lock, store the body, return it.
//!
//! ### Failure classification
//! - status ≥ 500 and transport timeouts are transient and retried
//! - 4xx and other non-success statuses propagate immediately
//! - a certificate failure gets one transparent unverified retry inside the
//!   transport before any of this applies
//!
//! ### Cache failures
//! A cache read error degrades to a miss; a cache write error after a
//! successful fetch is logged and the fresh body is still returned. The
//! cache never masks a fetch result.

pub mod transport;
pub mod url;
pub mod useragent;

use bytes::Bytes;
use reqwest::{Method, StatusCode, header};

use fetchkit_core::{AppConfig, Error, FailureKind, PageCache};

pub use transport::{
    FetchRequest, FetchResponse, HttpTransport, ReqwestTransport, TransportConfig,
};
pub use url::{UrlError, canonicalize};

use crate::retry::{Backoff, Retrier, RetryPolicy};
use crate::throttle::{DelayPolicy, DomainLocks, Throttle};

/// Failure kinds retried by default: transport timeouts and 5xx answers.
const TRANSIENT: &[FailureKind] = &[FailureKind::Timeout, FailureKind::RemoteHost];

/// Configuration for the fetch pipeline.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Transport settings: user agent, timeout, proxy pool.
    pub transport: TransportConfig,

    /// Per-domain politeness delay.
    pub delay: DelayPolicy,

    /// Retry policy for transient failures.
    pub retry: RetryPolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::from_app(&AppConfig::default())
    }
}

impl FetchConfig {
    /// Derive pipeline settings from the application configuration.
    pub fn from_app(config: &AppConfig) -> Self {
        let base = std::time::Duration::from_millis(config.retry_delay_ms);
        let backoff = if config.retry_exponential {
            Backoff::Exponential {
                base,
                max: std::time::Duration::from_millis(config.retry_max_delay_ms),
            }
        } else {
            Backoff::Fixed(base)
        };

        Self {
            transport: TransportConfig {
                user_agent: config.user_agent.clone(),
                timeout: config.timeout(),
                proxy_pool: config.proxy_pool.clone(),
                enable_proxy: config.enable_proxy,
                ..Default::default()
            },
            delay: DelayPolicy::from_config(config.request_delay_ms),
            retry: RetryPolicy::new(config.retry_max_attempts, backoff, TRANSIENT.to_vec()),
        }
    }
}

/// The consumer-facing fetch entry point.
///
/// Configured once, invoked per URL; safe to share across tasks. `fetch`
/// resolves with the page body or a single typed failure.
pub struct Requestor {
    transport: Box<dyn HttpTransport>,
    throttle: Throttle,
    locks: DomainLocks,
    retrier: Retrier,
    cache: PageCache,
    default_headers: header::HeaderMap,
}

impl Requestor {
    /// Build the production pipeline from the application configuration.
    pub fn new(config: &AppConfig) -> Result<Self, Error> {
        let fetch_config = FetchConfig::from_app(config);
        let transport = ReqwestTransport::new(&fetch_config.transport)?;
        Self::with_transport(fetch_config, PageCache::from_config(config), Box::new(transport))
    }

    /// Build the pipeline around an explicit transport and cache.
    pub fn with_transport(
        config: FetchConfig,
        cache: PageCache,
        transport: Box<dyn HttpTransport>,
    ) -> Result<Self, Error> {
        let mut default_headers = header::HeaderMap::new();
        let user_agent = useragent::resolve(&config.transport.user_agent);
        if !user_agent.is_empty() {
            let value = header::HeaderValue::from_str(user_agent)
                .map_err(|e| Error::Transport(format!("invalid User-Agent value: {e}")))?;
            default_headers.insert(header::USER_AGENT, value);
        }

        Ok(Self {
            transport,
            throttle: Throttle::new(config.delay),
            locks: DomainLocks::new(),
            retrier: Retrier::new(config.retry),
            cache,
            default_headers,
        })
    }

    /// Fetch a URL with GET and default headers, returning the body.
    pub async fn fetch(&self, url: &str) -> Result<Bytes, Error> {
        self.fetch_with(url, Method::GET, header::HeaderMap::new())
            .await
            .map(|response| response.bytes)
    }

    /// Fetch a URL, returning the full response.
    ///
    /// `headers` are merged over the configured defaults. The call blocks
    /// through throttle and backoff sleeps; dropping the future cancels it
    /// at any suspension point.
    pub async fn fetch_with(
        &self,
        url: &str,
        method: Method,
        headers: header::HeaderMap,
    ) -> Result<FetchResponse, Error> {
        let url = canonicalize(url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        match self.cache.get(url.as_str()).await {
            Ok(content) => {
                tracing::info!("found '{}' in the cache", url);
                return Ok(cached_response(url, content));
            }
            Err(Error::CacheMiss(_)) => {}
            Err(err) => {
                // a broken cache read must not fail the fetch
                tracing::warn!("cache read for '{}' failed, refetching: {}", url, err);
            }
        }

        let domain = url::domain(&url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let mut merged = self.default_headers.clone();
        merged.extend(headers);
        let request = FetchRequest { url: url.clone(), method, headers: merged };

        let response = {
            // serialize same-domain traffic across the wait and the attempt,
            // otherwise two tasks could both see a stale access time and
            // neither would wait
            let _guard = self.locks.acquire(&domain).await;
            self.throttle.wait(&url).await?;
            tracing::info!("requesting '{}'", url);
            self.retrier
                .call(|| {
                    let transport = &*self.transport;
                    let request = &request;
                    async move { check_status(transport.execute(request).await?) }
                })
                .await?
        };

        if let Err(err) = self.cache.set(url.as_str(), &response.bytes).await {
            tracing::warn!("failed to cache '{}': {}", url, err);
        }

        Ok(response)
    }
}

/// Classify a completed exchange: 2xx passes, 5xx is a retryable remote
/// host failure, anything else is a terminal client error.
fn check_status(response: FetchResponse) -> Result<FetchResponse, Error> {
    if response.status.is_success() {
        Ok(response)
    } else if response.status.is_server_error() {
        Err(Error::RemoteHost {
            status: response.status.as_u16(),
            url: response.url.to_string(),
        })
    } else {
        Err(Error::ClientStatus {
            status: response.status.as_u16(),
            url: response.url.to_string(),
        })
    }
}

/// A response materialized from the cache rather than the network.
fn cached_response(url: reqwest::Url, content: Vec<u8>) -> FetchResponse {
    FetchResponse {
        url: url.clone(),
        final_url: url,
        status: StatusCode::OK,
        content_type: None,
        bytes: Bytes::from(content),
        headers: header::HeaderMap::new(),
        fetch_ms: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fetchkit_core::DiskCache;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Mutex;

    /// Transport that replays a scripted sequence of (status, body) pairs.
    struct ScriptedTransport {
        script: Mutex<VecDeque<(u16, &'static str)>>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(script: Vec<(u16, &'static str)>) -> Self {
            Self { script: Mutex::new(script.into()), calls: AtomicUsize::new(0) }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn execute(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (status, body) = self
                .script
                .lock()
                .await
                .pop_front()
                .expect("scripted transport ran out of responses");
            Ok(FetchResponse {
                url: request.url.clone(),
                final_url: request.url.clone(),
                status: StatusCode::from_u16(status).unwrap(),
                content_type: None,
                bytes: Bytes::from_static(body.as_bytes()),
                headers: header::HeaderMap::new(),
                fetch_ms: 1,
            })
        }
    }

    fn test_config() -> FetchConfig {
        FetchConfig {
            delay: DelayPolicy::Fixed(Duration::ZERO),
            retry: RetryPolicy::new(
                Some(3),
                Backoff::Fixed(Duration::ZERO),
                TRANSIENT.to_vec(),
            ),
            ..Default::default()
        }
    }

    fn requestor(
        cache: PageCache,
        script: Vec<(u16, &'static str)>,
    ) -> (Requestor, std::sync::Arc<ScriptedTransport>) {
        let transport = std::sync::Arc::new(ScriptedTransport::new(script));
        let requestor = Requestor::with_transport(
            test_config(),
            cache,
            Box::new(ArcTransport(transport.clone())),
        )
        .unwrap();
        (requestor, transport)
    }

    /// Lets a test keep a handle on the transport it hands to the requestor.
    struct ArcTransport(std::sync::Arc<ScriptedTransport>);

    #[async_trait::async_trait]
    impl HttpTransport for ArcTransport {
        async fn execute(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
            self.0.execute(request).await
        }
    }

    fn disk_cache(dir: &tempfile::TempDir) -> DiskCache {
        DiskCache::new(dir.path().join("cache"), None, true)
    }

    #[tokio::test]
    async fn test_uncached_fetch_issues_one_request() {
        let (requestor, transport) = requestor(PageCache::Null, vec![(200, "<html>ok</html>")]);
        let body = requestor.fetch("http://example.test/page").await.unwrap();
        assert_eq!(body, Bytes::from_static(b"<html>ok</html>"));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let dir = tempfile::tempdir().unwrap();
        let cache = disk_cache(&dir);
        // pre-populate under the canonical form of the fetched URL
        let url = canonicalize("http://example.test/page").unwrap();
        cache.set(url.as_str(), b"cached body").await.unwrap();

        let (requestor, transport) = requestor(PageCache::Disk(cache), vec![]);
        let body = requestor.fetch("http://example.test/page").await.unwrap();

        assert_eq!(body, Bytes::from_static(b"cached body"));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_retry_on_503_then_store() {
        let dir = tempfile::tempdir().unwrap();
        let cache = disk_cache(&dir);
        let (requestor, transport) =
            requestor(PageCache::Disk(cache.clone()), vec![(503, "unavailable"), (200, "fresh")]);

        let body = requestor.fetch("http://example.test/page").await.unwrap();
        assert_eq!(body, Bytes::from_static(b"fresh"));
        assert_eq!(transport.calls(), 2);

        let url = canonicalize("http://example.test/page").unwrap();
        assert_eq!(cache.get(url.as_str()).await.unwrap(), b"fresh");
    }

    #[tokio::test]
    async fn test_client_error_not_retried_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cache = disk_cache(&dir);
        let (requestor, transport) =
            requestor(PageCache::Disk(cache.clone()), vec![(404, "missing")]);

        let result = requestor.fetch("http://example.test/page").await;
        assert!(matches!(result, Err(Error::ClientStatus { status: 404, .. })));
        assert_eq!(transport.calls(), 1);

        let url = canonicalize("http://example.test/page").unwrap();
        assert!(matches!(cache.get(url.as_str()).await, Err(Error::CacheMiss(_))));
    }

    #[tokio::test]
    async fn test_persistent_5xx_exhausts_budget() {
        let (requestor, transport) = requestor(
            PageCache::Null,
            vec![(500, "down"), (500, "down"), (500, "down")],
        );

        let result = requestor.fetch("http://example.test/page").await;
        match result {
            Err(Error::RetryExhausted { attempts: 3, source }) => {
                assert!(matches!(*source, Error::RemoteHost { status: 500, .. }));
            }
            other => panic!("expected RetryExhausted, got {other:?}"),
        }
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_invalid_url_rejected_before_network() {
        let (requestor, transport) = requestor(PageCache::Null, vec![]);
        let result = requestor.fetch("").await;
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_expired_entry_triggers_refetch() {
        let dir = tempfile::tempdir().unwrap();
        let cache =
            DiskCache::new(dir.path().join("cache"), Some(Duration::from_secs(1)), true);
        let url = canonicalize("http://example.test/page").unwrap();
        cache.set(url.as_str(), b"stale").await.unwrap();
        tokio::time::sleep(Duration::from_millis(1_100)).await;

        let (requestor, transport) =
            requestor(PageCache::Disk(cache.clone()), vec![(200, "fresh")]);
        let body = requestor.fetch("http://example.test/page").await.unwrap();

        assert_eq!(body, Bytes::from_static(b"fresh"));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_default_headers_carry_user_agent() {
        struct CaptureTransport(Mutex<Option<FetchRequest>>);

        #[async_trait::async_trait]
        impl HttpTransport for CaptureTransport {
            async fn execute(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
                *self.0.lock().await = Some(request.clone());
                Ok(FetchResponse {
                    url: request.url.clone(),
                    final_url: request.url.clone(),
                    status: StatusCode::OK,
                    content_type: None,
                    bytes: Bytes::new(),
                    headers: header::HeaderMap::new(),
                    fetch_ms: 0,
                })
            }
        }

        let capture = std::sync::Arc::new(CaptureTransport(Mutex::new(None)));
        struct Fwd(std::sync::Arc<CaptureTransport>);
        #[async_trait::async_trait]
        impl HttpTransport for Fwd {
            async fn execute(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
                self.0.execute(request).await
            }
        }

        let requestor =
            Requestor::with_transport(test_config(), PageCache::Null, Box::new(Fwd(capture.clone())))
                .unwrap();
        requestor.fetch("http://example.test/").await.unwrap();

        let seen = capture.0.lock().await.take().unwrap();
        assert_eq!(
            seen.headers.get(header::USER_AGENT).unwrap(),
            useragent::CHROME
        );
        assert_eq!(seen.method, Method::GET);
    }
}
