//! Unified error types for fetchkit.
//!
//! Every fallible operation in the fetch pipeline resolves to one of these
//! variants. `FailureKind` is the coarse classification retry policies are
//! written against: a policy names the kinds it retries, everything else
//! propagates immediately.

/// Unified error type for the fetch pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The URL could not be parsed or canonicalized. Never retried.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The server answered with a client-error status (4xx). Never retried.
    #[error("client error status {status} for '{url}'")]
    ClientStatus { status: u16, url: String },

    /// The server answered with a 5xx status. Retryable.
    #[error("remote host error: status {status} for '{url}'")]
    RemoteHost { status: u16, url: String },

    /// The request exceeded its timeout. Retryable.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Certificate validation failed, and so did the unverified retry.
    #[error("TLS validation failed: {0}")]
    Tls(String),

    /// Connection-level failure outside the retryable taxonomy.
    #[error("transport error: {0}")]
    Transport(String),

    /// No fresh cache entry for the URL. Internal control flow: the
    /// requestor translates this into "proceed to a network fetch".
    #[error("no cache entry for '{0}'")]
    CacheMiss(String),

    /// Cache entry could not be encoded or decoded.
    #[error("cache error: {0}")]
    Cache(String),

    /// Filesystem failure underneath the cache.
    #[error("cache I/O error: {0}")]
    CacheIo(#[from] std::io::Error),

    /// The retry budget was consumed; wraps the last observed failure.
    #[error("retries exhausted after {attempts} attempts: {source}")]
    RetryExhausted { attempts: u32, source: Box<Error> },
}

/// Coarse failure classification used by retry policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    ClientStatus,
    RemoteHost,
    Timeout,
    Tls,
    Transport,
    CacheMiss,
    Cache,
    RetryExhausted,
}

impl Error {
    /// The classification bucket this error falls into.
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::InvalidUrl(_) => FailureKind::InvalidUrl,
            Error::ClientStatus { .. } => FailureKind::ClientStatus,
            Error::RemoteHost { .. } => FailureKind::RemoteHost,
            Error::Timeout(_) => FailureKind::Timeout,
            Error::Tls(_) => FailureKind::Tls,
            Error::Transport(_) => FailureKind::Transport,
            Error::CacheMiss(_) => FailureKind::CacheMiss,
            Error::Cache(_) | Error::CacheIo(_) => FailureKind::Cache,
            Error::RetryExhausted { .. } => FailureKind::RetryExhausted,
        }
    }

    /// True for cache-layer errors, which must never mask a fetch result.
    pub fn is_cache_error(&self) -> bool {
        matches!(self, Error::CacheMiss(_) | Error::Cache(_) | Error::CacheIo(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::RemoteHost { status: 503, url: "http://example.test/".into() };
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("example.test"));
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(Error::Timeout("t".into()).kind(), FailureKind::Timeout);
        assert_eq!(
            Error::RemoteHost { status: 500, url: "u".into() }.kind(),
            FailureKind::RemoteHost
        );
        assert_eq!(
            Error::ClientStatus { status: 404, url: "u".into() }.kind(),
            FailureKind::ClientStatus
        );
        assert_eq!(Error::CacheMiss("u".into()).kind(), FailureKind::CacheMiss);
    }

    #[test]
    fn test_retry_exhausted_wraps_cause() {
        let err = Error::RetryExhausted {
            attempts: 3,
            source: Box::new(Error::Timeout("deadline elapsed".into())),
        };
        assert_eq!(err.kind(), FailureKind::RetryExhausted);
        assert!(err.to_string().contains("3 attempts"));
        assert!(err.to_string().contains("deadline elapsed"));
    }

    #[test]
    fn test_cache_errors_flagged() {
        assert!(Error::CacheMiss("u".into()).is_cache_error());
        assert!(Error::Cache("bad entry".into()).is_cache_error());
        assert!(!Error::Timeout("t".into()).is_cache_error());
    }
}
