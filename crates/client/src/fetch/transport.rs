//! HTTP transport: the seam between the fetch pipeline and the network.
//!
//! `HttpTransport` executes a single request attempt and reports transport
//! failures in the pipeline's error taxonomy; retry and caching live above
//! it. `ReqwestTransport` is the production implementation: one client pair
//! per proxy-pool entry (plus a direct pair), built up front, with a single
//! transparent unverified retry when certificate validation fails.

use std::time::{Duration, Instant};

use bytes::Bytes;
use rand::Rng;
use reqwest::{Client, Method, StatusCode, Url, header};

use fetchkit_core::Error;

use crate::fetch::useragent;

/// One request attempt, as handed to the transport.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Canonicalized target URL.
    pub url: Url,
    /// HTTP method (GET unless the caller says otherwise).
    pub method: Method,
    /// Fully merged headers, defaults included.
    pub headers: header::HeaderMap,
}

/// Response from a single fetch attempt.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The original URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
    /// Response headers
    pub headers: header::HeaderMap,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl FetchResponse {
    /// The body decoded as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Executes single HTTP attempts.
///
/// The trait exists so the pipeline can be driven by a scripted transport
/// in tests; `ReqwestTransport` is the only production implementation.
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform one attempt. Statuses pass through untouched; only
    /// transport-level failures (timeout, TLS, connection) are errors.
    async fn execute(&self, request: &FetchRequest) -> Result<FetchResponse, Error>;
}

/// Configuration for building a [`ReqwestTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// User agent: a named identity or a literal string.
    pub user_agent: String,

    /// Per-attempt request timeout.
    pub timeout: Duration,

    /// Proxy URIs; one is chosen uniformly at random per request.
    pub proxy_pool: Vec<String>,

    /// Whether the proxy pool is consulted at all.
    pub enable_proxy: bool,

    /// Maximum number of redirects to follow.
    pub max_redirects: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            user_agent: "chrome".to_string(),
            timeout: Duration::from_secs(10),
            proxy_pool: Vec::new(),
            enable_proxy: true,
            max_redirects: 5,
        }
    }
}

/// A verified client and its certificate-check-disabled twin.
///
/// The unverified client exists only for the one-shot TLS fallback; it is
/// built eagerly so the fallback path allocates nothing.
struct ClientPair {
    verified: Client,
    unverified: Client,
}

impl ClientPair {
    fn build(config: &TransportConfig, proxy: Option<&str>) -> Result<Self, Error> {
        Ok(Self {
            verified: Self::builder(config, proxy)?
                .build()
                .map_err(|e| Error::Transport(format!("failed to build HTTP client: {e}")))?,
            unverified: Self::builder(config, proxy)?
                .danger_accept_invalid_certs(true)
                .build()
                .map_err(|e| Error::Transport(format!("failed to build HTTP client: {e}")))?,
        })
    }

    fn builder(config: &TransportConfig, proxy: Option<&str>) -> Result<reqwest::ClientBuilder, Error> {
        let mut builder = Client::builder()
            .user_agent(useragent::resolve(&config.user_agent))
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true);
        if let Some(uri) = proxy {
            let proxy = reqwest::Proxy::all(uri)
                .map_err(|e| Error::InvalidUrl(format!("invalid proxy URI '{uri}': {e}")))?;
            builder = builder.proxy(proxy);
        }
        Ok(builder)
    }
}

/// Production HTTP transport backed by reqwest.
pub struct ReqwestTransport {
    direct: ClientPair,
    proxied: Vec<ClientPair>,
    enable_proxy: bool,
}

impl ReqwestTransport {
    /// Build all clients up front: one direct pair plus one pair per proxy
    /// pool entry.
    pub fn new(config: &TransportConfig) -> Result<Self, Error> {
        let direct = ClientPair::build(config, None)?;
        let proxied = config
            .proxy_pool
            .iter()
            .map(|uri| ClientPair::build(config, Some(uri)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { direct, proxied, enable_proxy: config.enable_proxy })
    }

    /// Uniform-random proxy choice per request; direct when the pool is
    /// empty or proxying is disabled.
    fn pick(&self) -> &ClientPair {
        if self.enable_proxy && !self.proxied.is_empty() {
            let idx = rand::thread_rng().gen_range(0..self.proxied.len());
            &self.proxied[idx]
        } else {
            &self.direct
        }
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        let start = Instant::now();
        let pair = self.pick();

        let response = match send(&pair.verified, request).await {
            Ok(response) => response,
            Err(err) if is_tls_error(&err) => {
                // One transparent retry without certificate verification;
                // sites with broken certs are common enough in crawl sets.
                tracing::warn!(
                    "TLS validation failed for '{}', retrying unverified: {}",
                    request.url,
                    err
                );
                send(&pair.unverified, request)
                    .await
                    .map_err(|e| classify(e, &request.url))?
            }
            Err(err) => return Err(classify(err, &request.url)),
        };

        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify(e, &request.url))?;

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "{} '{}' -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status,
            fetch_ms,
            bytes.len()
        );

        Ok(FetchResponse {
            url: request.url.clone(),
            final_url,
            status,
            content_type,
            bytes,
            headers,
            fetch_ms,
        })
    }
}

async fn send(client: &Client, request: &FetchRequest) -> Result<reqwest::Response, reqwest::Error> {
    client
        .request(request.method.clone(), request.url.clone())
        .headers(request.headers.clone())
        .send()
        .await
}

/// Map a reqwest failure into the pipeline taxonomy.
fn classify(err: reqwest::Error, url: &Url) -> Error {
    if err.is_timeout() {
        Error::Timeout(format!("'{url}': {err}"))
    } else if is_tls_error(&err) {
        Error::Tls(format!("'{url}': {err}"))
    } else {
        Error::Transport(format!("'{url}': {err}"))
    }
}

/// Whether a reqwest error is a certificate validation failure.
///
/// rustls surfaces these as connect errors; the certificate detail only
/// appears in the source chain.
fn is_tls_error(err: &reqwest::Error) -> bool {
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        let message = cause.to_string();
        if message.contains("certificate") || message.contains("CertificateError") {
            return true;
        }
        source = cause.source();
    }
    false
}
