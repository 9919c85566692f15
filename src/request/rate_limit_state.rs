//! Rate-limit state reported by upstream response headers.
//!
//! Every response (success or error status) overwrites the tracked state from
//! `X-Rate-Limit-Remaining` and `X-Rate-Limit-Reset`. If either header is
//! missing or non-numeric, both fields are cleared: partial state from an
//! earlier response is never kept. The state is diagnostic only; it feeds the
//! reset time into rate-limit-exceeded errors.

use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::header::HeaderMap;
use tracing::debug;

/// Header carrying the remaining call budget.
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-rate-limit-remaining";

/// Header carrying the window reset as a Unix timestamp (seconds).
pub const RATE_LIMIT_RESET_HEADER: &str = "x-rate-limit-reset";

/// Latest reset accepted from upstream: 9999-12-31T23:59:59Z, the last
/// instant an HTTP date can express.
pub const MAX_RESET_SECS: u64 = 253_402_300_799;

/// Last known upstream rate-limit state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitState {
    /// Calls remaining in the current upstream window.
    pub remaining: Option<u64>,
    /// Absolute time the upstream window resets.
    pub reset_at: Option<SystemTime>,
}

impl RateLimitState {
    /// Parses the state from response headers.
    ///
    /// Returns the empty state unless both headers are present and numeric,
    /// and the reset is no later than [`MAX_RESET_SECS`].
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let remaining = header_integer(headers, RATE_LIMIT_REMAINING_HEADER);
        let reset_at = header_integer(headers, RATE_LIMIT_RESET_HEADER)
            .filter(|secs| *secs <= MAX_RESET_SECS)
            .and_then(|secs| UNIX_EPOCH.checked_add(Duration::from_secs(secs)));

        match (remaining, reset_at) {
            (Some(remaining), Some(reset_at)) => Self {
                remaining: Some(remaining),
                reset_at: Some(reset_at),
            },
            _ => Self::default(),
        }
    }
}

fn header_integer(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}

/// Per-backend holder for [`RateLimitState`].
///
/// Concurrent calls through one backend overwrite the state wholesale, so
/// the last response to land wins.
#[derive(Debug, Default)]
pub struct RateLimitTracker {
    state: Mutex<RateLimitState>,
}

impl RateLimitTracker {
    /// Creates a tracker with no known state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the tracked state with what `headers` report.
    pub fn update(&self, headers: &HeaderMap) {
        let parsed = RateLimitState::from_headers(headers);
        if parsed == RateLimitState::default() {
            debug!("rate limit headers missing or malformed, clearing tracked state");
        } else {
            debug!(remaining = ?parsed.remaining, "updated rate limit state");
        }
        match self.state.lock() {
            Ok(mut guard) => *guard = parsed,
            Err(poisoned) => *poisoned.into_inner() = parsed,
        }
    }

    /// Returns a copy of the tracked state.
    #[must_use]
    pub fn snapshot(&self) -> RateLimitState {
        match self.state.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_from_headers_parses_both_fields() {
        let state = RateLimitState::from_headers(&headers(&[
            ("x-rate-limit-remaining", "42"),
            ("x-rate-limit-reset", "1700000000"),
        ]));
        assert_eq!(state.remaining, Some(42));
        assert_eq!(
            state.reset_at,
            Some(UNIX_EPOCH + Duration::from_secs(1_700_000_000))
        );
    }

    #[test]
    fn test_from_headers_missing_reset_clears_both() {
        let state = RateLimitState::from_headers(&headers(&[("x-rate-limit-remaining", "42")]));
        assert_eq!(state, RateLimitState::default());
    }

    #[test]
    fn test_from_headers_non_numeric_clears_both() {
        let state = RateLimitState::from_headers(&headers(&[
            ("x-rate-limit-remaining", "lots"),
            ("x-rate-limit-reset", "1700000000"),
        ]));
        assert_eq!(state, RateLimitState::default());
    }

    #[test]
    fn test_from_headers_unrepresentable_reset_clears_both() {
        for reset in ["253402300800", "300000000000", "18446744073709551615"] {
            let state = RateLimitState::from_headers(&headers(&[
                ("x-rate-limit-remaining", "5"),
                ("x-rate-limit-reset", reset),
            ]));
            assert_eq!(state, RateLimitState::default(), "reset {reset}");
        }
    }

    #[test]
    fn test_from_headers_accepts_last_representable_reset() {
        let state = RateLimitState::from_headers(&headers(&[
            ("x-rate-limit-remaining", "5"),
            ("x-rate-limit-reset", "253402300799"),
        ]));
        assert_eq!(
            state.reset_at,
            Some(UNIX_EPOCH + Duration::from_secs(MAX_RESET_SECS))
        );
    }

    #[test]
    fn test_tracker_overwrites_previous_state_on_parse_failure() {
        let tracker = RateLimitTracker::new();
        tracker.update(&headers(&[
            ("x-rate-limit-remaining", "10"),
            ("x-rate-limit-reset", "1700000000"),
        ]));
        assert_eq!(tracker.snapshot().remaining, Some(10));

        tracker.update(&HeaderMap::new());
        assert_eq!(tracker.snapshot(), RateLimitState::default());
    }

    #[test]
    fn test_tracker_starts_empty() {
        let tracker = RateLimitTracker::new();
        assert!(tracker.snapshot().remaining.is_none());
        assert!(tracker.snapshot().reset_at.is_none());
    }
}
