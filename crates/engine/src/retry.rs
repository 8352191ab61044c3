//! Error taxonomy and an opt-in retry wrapper
//!
//! Service methods never retry. Callers that want retries wrap a whole call
//! in [`with_retry`]; each attempt re-runs the closure from scratch, so a
//! transaction body must be safe to run more than once (its store writes
//! are only applied by the attempt that commits).

use bazaar_core::{Error, Result, StoreCode};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

// ============================================================================
// Error taxonomy
// ============================================================================

/// Coarse error category for callers mapping failures to responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The target does not exist
    NotFound,
    /// The request was rejected as malformed or unsatisfiable
    Validation,
    /// A concurrent write won
    Conflict,
    /// The caller is not allowed to do this
    Forbidden,
    /// The store is unreachable or too slow
    ServiceUnavailable,
    /// Quota exhausted
    RateLimited,
    /// Anything else
    Unknown,
}

impl ErrorKind {
    /// Category of a store code
    pub fn from_code(code: StoreCode) -> Self {
        match code {
            StoreCode::NotFound => ErrorKind::NotFound,
            StoreCode::InvalidArgument
            | StoreCode::OutOfRange
            | StoreCode::FailedPrecondition
            | StoreCode::AlreadyExists => ErrorKind::Validation,
            StoreCode::Aborted => ErrorKind::Conflict,
            StoreCode::PermissionDenied | StoreCode::Unauthenticated => ErrorKind::Forbidden,
            StoreCode::Unavailable | StoreCode::DeadlineExceeded => ErrorKind::ServiceUnavailable,
            StoreCode::ResourceExhausted => ErrorKind::RateLimited,
            StoreCode::Cancelled
            | StoreCode::Unknown
            | StoreCode::Unimplemented
            | StoreCode::Internal
            | StoreCode::DataLoss => ErrorKind::Unknown,
        }
    }

    /// Category of an access-layer error
    pub fn classify(error: &Error) -> Self {
        match error {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Store(e) => Self::from_code(e.code),
            Error::Decode { .. } | Error::InvalidArgument(_) | Error::BatchTooLarge { .. } => {
                ErrorKind::Validation
            }
            Error::DeadlineExceeded => ErrorKind::ServiceUnavailable,
            Error::Cancelled | Error::Config(_) => ErrorKind::Unknown,
        }
    }
}

impl From<&Error> for ErrorKind {
    fn from(error: &Error) -> Self {
        ErrorKind::classify(error)
    }
}

// ============================================================================
// Retry policy
// ============================================================================

/// Bounded exponential backoff with full jitter
///
/// The delay before retry `n` (0-based) is drawn uniformly from
/// `[0, min(max_delay, base_delay * 2^n)]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first included
    pub max_attempts: u32,
    /// Base delay
    pub base_delay: Duration,
    /// Cap on any single delay
    pub max_delay: Duration,
    /// Store codes that trigger a retry
    pub retry_on: Vec<StoreCode>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            retry_on: Self::DEFAULT_RETRY_ON.to_vec(),
        }
    }
}

impl RetryPolicy {
    /// Codes retried unless configured otherwise
    pub const DEFAULT_RETRY_ON: [StoreCode; 4] = [
        StoreCode::Aborted,
        StoreCode::Unavailable,
        StoreCode::DeadlineExceeded,
        StoreCode::ResourceExhausted,
    ];

    /// A policy making a single attempt
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Set total attempts
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set base and maximum delay
    pub fn with_delays(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }

    /// Set the retried codes
    pub fn with_retry_on(mut self, codes: impl IntoIterator<Item = StoreCode>) -> Self {
        self.retry_on = codes.into_iter().collect();
        self
    }

    /// True if `error` is a store failure with a retried code
    pub fn should_retry(&self, error: &Error) -> bool {
        error
            .store_code()
            .map(|code| self.retry_on.contains(&code))
            .unwrap_or(false)
    }

    /// Upper bound of the delay before retry `attempt` (0-based)
    pub fn delay_ceiling(&self, attempt: u32) -> Duration {
        let shift = attempt.min(31);
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }

    /// Jittered delay before retry `attempt` (0-based)
    pub fn delay_for<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let ceiling = self.delay_ceiling(attempt);
        let nanos = ceiling.as_nanos().min(u64::MAX as u128) as u64;
        if nanos == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(rng.gen_range(0..=nanos))
    }
}

/// Run `op`, retrying retryable store failures per `policy`
///
/// Non-retryable errors and the error of the final attempt are returned
/// unchanged.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt + 1 < policy.max_attempts && policy.should_retry(&e) => {
                let delay = policy.delay_for(attempt, &mut rand::thread_rng());
                warn!(
                    target: "bazaar::retry",
                    attempt = attempt + 1,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying after store failure"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
