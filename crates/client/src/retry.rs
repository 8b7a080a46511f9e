//! Generic retry with configurable backoff.
//!
//! A `Retrier` drives a fallible async operation under a `RetryPolicy`:
//! failures whose kind the policy names are re-attempted after a backoff
//! delay, everything else propagates after a single invocation. When the
//! attempt budget runs out the last failure is wrapped in
//! `Error::RetryExhausted` so callers can tell exhaustion from a one-shot
//! failure.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use fetchkit_core::{Error, FailureKind};

/// Backoff strategy: how long to sleep before retry `n` (0-indexed).
#[derive(Clone)]
pub enum Backoff {
    /// The same delay before every retry.
    Fixed(Duration),
    /// `base * 2^n`, saturating, clamped to `max`.
    Exponential { base: Duration, max: Duration },
    /// Uniformly random in `[min, max]`, drawn per retry.
    Random { min: Duration, max: Duration },
    /// An explicit per-retry schedule. The schedule length pins the total
    /// attempt budget of any policy built from it.
    Schedule(Vec<Duration>),
    /// Caller-supplied delay function of the retry index.
    Custom(Arc<dyn Fn(u32) -> Duration + Send + Sync>),
}

impl fmt::Debug for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backoff::Fixed(d) => f.debug_tuple("Fixed").field(d).finish(),
            Backoff::Exponential { base, max } => f
                .debug_struct("Exponential")
                .field("base", base)
                .field("max", max)
                .finish(),
            Backoff::Random { min, max } => {
                f.debug_struct("Random").field("min", min).field("max", max).finish()
            }
            Backoff::Schedule(s) => f.debug_tuple("Schedule").field(s).finish(),
            Backoff::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl Backoff {
    /// Delay before retry `retry_index` (0 = first retry).
    fn delay(&self, retry_index: u32) -> Duration {
        match self {
            Backoff::Fixed(delay) => *delay,
            Backoff::Exponential { base, max } => {
                let delay = base.saturating_mul(2_u32.saturating_pow(retry_index));
                delay.min(*max)
            }
            Backoff::Random { min, max } => {
                if max <= min {
                    *min
                } else {
                    rand::thread_rng().gen_range(*min..=*max)
                }
            }
            Backoff::Schedule(schedule) => {
                let idx = (retry_index as usize).min(schedule.len().saturating_sub(1));
                schedule.get(idx).copied().unwrap_or(Duration::ZERO)
            }
            Backoff::Custom(f) => f(retry_index),
        }
    }
}

/// How a call should be retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: Option<u32>,
    backoff: Backoff,
    retry_on: Vec<FailureKind>,
}

impl RetryPolicy {
    /// Build a policy.
    ///
    /// `max_attempts` is the total invocation budget; `None` retries
    /// forever, which is legal and deliberate; a caller that needs an
    /// upper bound against a permanently failing operation must set one.
    /// A `Backoff::Schedule` overrides `max_attempts` with the schedule
    /// length: the delay schedule fully determines the attempt count.
    pub fn new(max_attempts: Option<u32>, backoff: Backoff, retry_on: Vec<FailureKind>) -> Self {
        let max_attempts = match &backoff {
            Backoff::Schedule(schedule) => Some(schedule.len() as u32),
            _ => max_attempts,
        };
        Self { max_attempts, backoff, retry_on }
    }

    /// Total invocation budget, if bounded.
    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    fn should_retry(&self, err: &Error) -> bool {
        self.retry_on.contains(&err.kind())
    }
}

/// Executes operations under a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct Retrier {
    policy: RetryPolicy,
}

impl Retrier {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Invoke `op` until it succeeds, fails non-retryably, or exhausts the
    /// attempt budget.
    ///
    /// The operation is re-invoked at most `max_attempts` times in total;
    /// idempotency across invocations is the caller's responsibility. The
    /// backoff sleep is a plain `.await`, so dropping the returned future
    /// cancels the whole call cleanly.
    pub async fn call<T, F, Fut>(&self, mut op: F) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if self.policy.should_retry(&err) => {
                    if let Some(max) = self.policy.max_attempts
                        && attempts >= max
                    {
                        return Err(Error::RetryExhausted { attempts, source: Box::new(err) });
                    }
                    let delay = self.policy.backoff.delay(attempts - 1);
                    tracing::warn!(
                        "attempt {} failed ({}), retrying in {:?}",
                        attempts,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
