//! Client code for fetchkit.
//!
//! This crate provides the resilient HTTP fetch pipeline: per-domain
//! throttling, retry with backoff, and transparent page caching behind a
//! single `Requestor` entry point.

pub mod fetch;
pub mod retry;
pub mod throttle;

pub use fetch::{
    FetchConfig, FetchRequest, FetchResponse, HttpTransport, ReqwestTransport, Requestor,
    TransportConfig,
};
pub use retry::{Backoff, Retrier, RetryPolicy};
pub use throttle::{DelayPolicy, DomainLocks, Throttle};
