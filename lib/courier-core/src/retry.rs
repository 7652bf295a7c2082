//! Retry policy: whether a call may be retried, and how long to wait first.
//!
//! The policy is pure. The retry loop itself lives with the call orchestrator,
//! which sleeps for the returned [`RetryDecision`] and re-runs the whole
//! interceptor chain.

use std::collections::HashSet;
use std::time::Duration;

use crate::{Error, Method, Response};

/// Per-call override of the retry behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RetryMode {
    /// Always retry, whatever the method.
    Enable,
    /// Never retry.
    Disable,
    /// Retry when the configuration allows it for the call's method.
    #[default]
    Default,
}

/// Outcome of [`RetryConfiguration::retry_wait_time`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait this long, then make another attempt.
    Retry(Duration),
    /// Give up and return the last outcome.
    Stop,
}

impl RetryDecision {
    /// The wait before the next attempt, if any.
    #[must_use]
    pub const fn wait(&self) -> Option<Duration> {
        match self {
            Self::Retry(wait) => Some(*wait),
            Self::Stop => None,
        }
    }
}

/// Status codes retried by default.
pub const DEFAULT_RETRY_STATUS_CODES: [u16; 10] = [408, 413, 429, 500, 502, 503, 504, 521, 522, 524];

/// Methods retried by default.
pub const DEFAULT_RETRY_METHODS: [Method; 2] = [Method::Get, Method::Put];

/// Retry configuration, shared read-only by every call of a client.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use courier_core::RetryConfiguration;
///
/// let config = RetryConfiguration::default()
///     .with_max_attempts(3)
///     .with_retry_interval(Duration::from_millis(100))
///     .with_maximum_retry_wait_time(Duration::from_secs(5));
/// assert_eq!(config.max_attempts, 3);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfiguration {
    /// Retries allowed after the first attempt.
    pub max_attempts: u32,
    /// Retry attempts that timed out.
    pub retry_on_timeout: bool,
    /// Base wait, multiplied by `backoff_factor` raised to the attempt number.
    pub retry_interval: Duration,
    /// Upper bound on the total time spent waiting between attempts.
    pub maximum_retry_wait_time: Duration,
    /// Exponential backoff multiplier.
    pub backoff_factor: f64,
    /// Response statuses worth retrying.
    pub status_codes: HashSet<u16>,
    /// Methods retried under [`RetryMode::Default`].
    pub methods: HashSet<Method>,
}

impl Default for RetryConfiguration {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            retry_on_timeout: true,
            retry_interval: Duration::from_secs(1),
            maximum_retry_wait_time: Duration::ZERO,
            backoff_factor: 2.0,
            status_codes: DEFAULT_RETRY_STATUS_CODES.into_iter().collect(),
            methods: DEFAULT_RETRY_METHODS.into_iter().collect(),
        }
    }
}

impl RetryConfiguration {
    /// Set the number of retries after the first attempt.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set whether timed out attempts are retried.
    #[must_use]
    pub fn with_retry_on_timeout(mut self, retry_on_timeout: bool) -> Self {
        self.retry_on_timeout = retry_on_timeout;
        self
    }

    /// Set the base wait.
    #[must_use]
    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    /// Set the bound on the total wait.
    #[must_use]
    pub fn with_maximum_retry_wait_time(mut self, maximum: Duration) -> Self {
        self.maximum_retry_wait_time = maximum;
        self
    }

    /// Set the backoff multiplier.
    #[must_use]
    pub fn with_backoff_factor(mut self, backoff_factor: f64) -> Self {
        self.backoff_factor = backoff_factor;
        self
    }

    /// Replace the retryable status codes.
    #[must_use]
    pub fn with_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.status_codes = codes.into_iter().collect();
        self
    }

    /// Replace the retryable methods.
    #[must_use]
    pub fn with_methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.methods = methods.into_iter().collect();
        self
    }

    /// Whether a call may be retried at all.
    #[must_use]
    pub fn should_retry(&self, mode: RetryMode, method: Option<Method>) -> bool {
        match mode {
            RetryMode::Enable => true,
            RetryMode::Disable => false,
            RetryMode::Default => {
                self.max_attempts > 0 && method.is_some_and(|method| self.methods.contains(&method))
            }
        }
    }

    /// Decide on retry number `attempt` (1-based) after an outcome.
    ///
    /// `max_wait` is the wait budget still available to the call. Transport
    /// errors other than timeouts are never retried.
    #[must_use]
    pub fn retry_wait_time(
        &self,
        max_wait: Duration,
        attempt: u32,
        response: Option<&Response>,
        error: Option<&Error>,
    ) -> RetryDecision {
        if attempt > self.max_attempts {
            return RetryDecision::Stop;
        }

        let retry_after = match (error, response) {
            (Some(error), _) if error.is_timeout() => {
                if !self.retry_on_timeout {
                    return RetryDecision::Stop;
                }
                Duration::ZERO
            }
            (Some(_), _) | (None, None) => return RetryDecision::Stop,
            (None, Some(response)) => {
                let retry_after = response.retry_after();
                if retry_after.is_none() && !self.status_codes.contains(&response.status()) {
                    return RetryDecision::Stop;
                }
                retry_after.unwrap_or_default()
            }
        };

        let Some(backoff) = self.backoff(attempt) else {
            return RetryDecision::Stop;
        };
        let wait = backoff.max(retry_after);
        if wait <= max_wait {
            RetryDecision::Retry(wait)
        } else {
            RetryDecision::Stop
        }
    }

    /// `retry_interval * backoff_factor ^ attempt`, `None` when unrepresentable.
    fn backoff(&self, attempt: u32) -> Option<Duration> {
        let seconds = self.retry_interval.as_secs_f64() * self.backoff_factor.powf(f64::from(attempt));
        Duration::try_from_secs_f64(seconds).ok()
    }
}
