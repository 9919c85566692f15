//! Request discipline shared by the resolution backends.
//!
//! - [`RateLimiter`] - Shared sliding-window admission control (CrossRef path)
//! - [`RetryPolicy`] - Bounded retry with exponential backoff for transport failures
//! - [`RateLimitTracker`] - Last upstream rate-limit state parsed from headers

pub mod rate_limit_state;
pub mod rate_limiter;
mod retry;

pub use rate_limit_state::{RateLimitState, RateLimitTracker};
pub use rate_limiter::RateLimiter;
pub use retry::{DEFAULT_MAX_RETRIES, RetryPolicy, Transient};
