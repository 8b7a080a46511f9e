//! Per-domain politeness throttling.
//!
//! `Throttle` enforces a minimum elapsed time between two requests to the
//! same domain (the URL's host[:port]). The delay is sampled per call, so a
//! configured interval gives jittered politeness. The minimum-interval
//! guarantee only holds when calls for the same domain are serialized;
//! `DomainLocks` provides that serialization and the requestor holds the
//! lock across the throttle wait and the network attempt.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;
use url::Url;

use fetchkit_core::{Error, RequestDelay};

use crate::fetch::url::domain;

/// How the politeness delay for a request is chosen.
#[derive(Clone)]
pub enum DelayPolicy {
    /// The same delay every time.
    Fixed(Duration),
    /// Uniformly random in `[min, max]`, drawn per call.
    Range(Duration, Duration),
    /// Caller-supplied function invoked per call.
    Dynamic(Arc<dyn Fn() -> Duration + Send + Sync>),
}

impl fmt::Debug for DelayPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DelayPolicy::Fixed(d) => f.debug_tuple("Fixed").field(d).finish(),
            DelayPolicy::Range(min, max) => {
                f.debug_tuple("Range").field(min).field(max).finish()
            }
            DelayPolicy::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

impl DelayPolicy {
    /// Delay policy for a configured `request_delay_ms` value.
    pub fn from_config(delay: RequestDelay) -> Self {
        match delay {
            RequestDelay::Fixed(ms) => DelayPolicy::Fixed(Duration::from_millis(ms)),
            RequestDelay::Range(min, max) => {
                DelayPolicy::Range(Duration::from_millis(min), Duration::from_millis(max))
            }
        }
    }

    fn sample(&self) -> Duration {
        match self {
            DelayPolicy::Fixed(delay) => *delay,
            DelayPolicy::Range(min, max) => {
                if max <= min {
                    *min
                } else {
                    rand::thread_rng().gen_range(*min..=*max)
                }
            }
            DelayPolicy::Dynamic(f) => f(),
        }
    }
}

/// Enforces a minimum interval between requests to the same domain.
pub struct Throttle {
    policy: DelayPolicy,
    domains: Mutex<HashMap<String, Instant>>,
}

impl Throttle {
    pub fn new(policy: DelayPolicy) -> Self {
        Self { policy, domains: Mutex::new(HashMap::new()) }
    }

    /// Block until the domain's minimum interval has elapsed, then record
    /// the access.
    ///
    /// The access time is recorded when `wait` returns, whether or not a
    /// sleep occurred, so a slow request already counts toward the next
    /// call's politeness window. Callers must serialize same-domain calls
    /// (see [`DomainLocks`]) for the interval guarantee to hold.
    pub async fn wait(&self, url: &Url) -> Result<(), Error> {
        let domain = domain(url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let delay = self.policy.sample();

        let last_accessed = { self.domains.lock().await.get(&domain).copied() };
        if let Some(last_accessed) = last_accessed
            && delay > Duration::ZERO
        {
            let elapsed = last_accessed.elapsed();
            if elapsed < delay {
                let remaining = delay - elapsed;
                tracing::debug!("throttling '{}', waiting {:?}", domain, remaining);
                tokio::time::sleep(remaining).await;
            }
        }

        self.domains.lock().await.insert(domain, Instant::now());
        Ok(())
    }
}

/// Per-domain mutual exclusion for the throttle-then-fetch sequence.
///
/// Locks are created lazily per domain and live for the table's lifetime,
/// like the throttle's timestamps.
#[derive(Default)]
pub struct DomainLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl DomainLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `domain`, waiting behind any in-flight request
    /// to the same domain.
    pub async fn acquire(&self, domain: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(domain.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
