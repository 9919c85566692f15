//! Shared admission control for outbound CrossRef requests.
//!
//! This module provides the [`RateLimiter`] struct which bounds the number of
//! calls admitted in any sliding window. One limiter is shared by every caller
//! of a backend, so the ceiling holds globally rather than per task.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use bibli_core::request::RateLimiter;
//!
//! # async fn example() {
//! // 50 calls per second, shared across tasks
//! let limiter = Arc::new(RateLimiter::crossref_default());
//!
//! let limiter_for_task = Arc::clone(&limiter);
//! tokio::spawn(async move {
//!     limiter_for_task.acquire().await;
//!     // ... issue request
//! });
//! # }
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

/// CrossRef ceiling: calls admitted per window.
pub const CROSSREF_MAX_CALLS: u32 = 50;

/// CrossRef ceiling: window length.
pub const CROSSREF_PERIOD: Duration = Duration::from_secs(1);

/// Warning threshold for a single admission wait.
const LONG_WAIT_WARNING_THRESHOLD: Duration = Duration::from_secs(5);

/// Sliding-window rate limiter.
///
/// At most `max_calls` acquisitions complete within any `period`. Callers that
/// exceed the budget wait; they are never rejected and no call is dropped.
///
/// # Thread Safety
///
/// `RateLimiter` is `Send + Sync`. Wrap it in `Arc` to share it across tasks.
/// The admission log sits behind a `tokio::sync::Mutex`, which is fair, so
/// waiters are admitted in arrival order.
///
/// # Cancellation
///
/// A slot is recorded only after the wait completes. Dropping an
/// `acquire()` future while it waits releases the lock and consumes nothing.
#[derive(Debug)]
pub struct RateLimiter {
    max_calls: u32,
    period: Duration,
    /// Admission times within the current window, oldest first.
    admitted: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter admitting `max_calls` per `period`.
    ///
    /// `max_calls` is clamped to at least 1.
    #[must_use]
    pub fn new(max_calls: u32, period: Duration) -> Self {
        let max_calls = max_calls.max(1);
        debug!(max_calls, period_ms = period.as_millis(), "creating rate limiter");
        Self {
            max_calls,
            period,
            admitted: Mutex::new(VecDeque::with_capacity(max_calls as usize)),
        }
    }

    /// Creates the CrossRef limiter: 50 calls per second.
    #[must_use]
    pub fn crossref_default() -> Self {
        Self::new(CROSSREF_MAX_CALLS, CROSSREF_PERIOD)
    }

    /// Returns the maximum calls admitted per window.
    #[must_use]
    pub fn max_calls(&self) -> u32 {
        self.max_calls
    }

    /// Returns the window length.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Waits until a slot is available, then claims it.
    ///
    /// Never fails. Suspends the caller cooperatively; other tasks keep
    /// running while it waits.
    #[instrument(skip(self), fields(max_calls = self.max_calls))]
    pub async fn acquire(&self) {
        let mut admitted = self.admitted.lock().await;

        loop {
            let now = Instant::now();
            while admitted
                .front()
                .is_some_and(|oldest| now.duration_since(*oldest) >= self.period)
            {
                admitted.pop_front();
            }

            if admitted.len() < self.max_calls as usize {
                admitted.push_back(now);
                return;
            }

            // Window is full: the oldest admission decides when a slot frees up.
            let Some(oldest) = admitted.front().copied() else {
                continue;
            };
            let wait = (oldest + self.period).saturating_duration_since(now);

            debug!(wait_ms = wait.as_millis(), "rate limit window full, waiting");
            if wait >= LONG_WAIT_WARNING_THRESHOLD {
                warn!(
                    wait_secs = wait.as_secs(),
                    "long rate limit wait - consider reducing request volume"
                );
            }

            tokio::time::sleep(wait).await;
        }
    }
}
