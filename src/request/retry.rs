//! Bounded retry with exponential backoff for transport failures.
//!
//! [`RetryPolicy::execute`] wraps one backend invocation. Errors that report
//! themselves as [`Transient`] (network-level failures) are retried; every
//! other error, including HTTP error statuses, is returned on first sight.
//!
//! # Delay Calculation
//!
//! ```text
//! delay(attempt) = min(base_delay * 2^(attempt - 1), max_delay)
//! ```
//!
//! With defaults `delay_for` yields 1s, 2s, 4s for attempts 1, 2, 3. The last
//! attempt's failure is surfaced without waiting, so three attempts sleep 1s
//! then 2s.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, instrument, warn};

/// Default maximum attempts, including the first.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay for exponential backoff (1 second).
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default maximum delay cap (32 seconds).
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(32);

/// Errors that can tell the retry loop whether another attempt may help.
pub trait Transient {
    /// Returns true for transport-level failures worth retrying.
    fn is_transient(&self) -> bool;
}

/// Configuration for retry behavior with exponential backoff.
///
/// # Default Values
///
/// - `max_attempts`: 3
/// - `base_delay`: 1 second
/// - `max_delay`: 32 seconds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,

    /// Delay after the first failed attempt.
    base_delay: Duration,

    /// Maximum delay cap.
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a new retry policy with custom settings.
    ///
    /// `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Creates a policy with a custom `max_attempts`, using defaults for other settings.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the wait after failed `attempt` (1-indexed).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1_u32 << exponent)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Runs `operation` until it succeeds, fails non-transiently, or
    /// attempts run out.
    ///
    /// The operation receives the 1-indexed attempt number so the error it
    /// builds can report how many attempts were made. Dropping the returned
    /// future during a backoff wait abandons the call cleanly.
    ///
    /// # Errors
    ///
    /// Returns the first non-transient error, or the last transient error
    /// once `max_attempts` have failed.
    #[instrument(skip_all, fields(max_attempts = self.max_attempts))]
    pub async fn execute<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + Display,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) if !error.is_transient() => {
                    debug!(attempt, error = %error, "non-transient failure, not retrying");
                    return Err(error);
                }
                Err(error) if attempt >= self.max_attempts => {
                    warn!(attempt, error = %error, "max attempts exhausted");
                    return Err(error);
                }
                Err(error) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        attempt,
                        next_attempt = attempt + 1,
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "transient failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
