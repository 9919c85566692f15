//! Error types for DOI resolution.
//!
//! Every backend-produced variant carries the [`Backend`] that raised it, so
//! CrossRef and `doi.org` failures stay distinguishable while sharing one
//! type. Variants carry structured fields (status code, reset time, attempt
//! count) rather than only a formatted message.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::request::rate_limit_state::MAX_RESET_SECS;
use crate::request::{RateLimitState, Transient};
use crate::transport::TransportError;

/// The upstream a resolution went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// CrossRef works API.
    Crossref,
    /// Content negotiation at `doi.org`.
    DoiOrg,
}

impl Backend {
    /// Stable lowercase label for logs and output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Crossref => "crossref",
            Self::DoiOrg => "doi.org",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Formats a reset time for error messages, or `unknown`.
///
/// Times past the last HTTP date also read `unknown`.
fn display_reset(reset_at: Option<&SystemTime>) -> String {
    let latest = UNIX_EPOCH + Duration::from_secs(MAX_RESET_SECS);
    match reset_at {
        Some(at) if *at <= latest => httpdate::fmt_http_date(*at),
        _ => "unknown".to_string(),
    }
}

/// Errors that can occur while resolving a DOI.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// Input rejected before any network call.
    #[error("invalid DOI '{input}': {reason}")]
    InvalidInput {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Upstream returned 404.
    #[error("DOI not found via {backend}: {doi}")]
    NotFound {
        /// Backend that reported the miss.
        backend: Backend,
        /// The DOI requested.
        doi: String,
    },

    /// Upstream returned 429.
    #[error("{backend} rate limit exceeded. Reset at {}", display_reset(.reset_at.as_ref()))]
    RateLimited {
        /// Backend that throttled the call.
        backend: Backend,
        /// The DOI requested.
        doi: String,
        /// Best-known reset time from the tracked rate-limit headers.
        reset_at: Option<SystemTime>,
    },

    /// Upstream returned any other non-200 status.
    #[error("{backend} API error for {doi}: HTTP {status}")]
    Api {
        /// Backend that returned the status.
        backend: Backend,
        /// The DOI requested.
        doi: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Transport failure, surfaced once retries are exhausted.
    #[error("network error resolving {doi} via {backend} after {attempts} attempt(s): {source}")]
    Network {
        /// Backend whose request failed.
        backend: Backend,
        /// The DOI requested.
        doi: String,
        /// Attempts made, including the failing one.
        attempts: u32,
        /// The underlying transport failure.
        #[source]
        source: TransportError,
    },

    /// A 200 response whose body could not be used.
    #[error("unexpected {backend} response for {doi}: {reason}")]
    InvalidResponse {
        /// Backend that produced the body.
        backend: Backend,
        /// The DOI requested.
        doi: String,
        /// What was wrong with the body.
        reason: String,
    },

    /// A backend was built without a transport.
    #[error("{backend} backend has no HTTP transport configured")]
    MissingTransport {
        /// Backend being built.
        backend: Backend,
    },
}

impl ResolveError {
    /// Creates an `InvalidInput` error.
    #[must_use]
    pub fn invalid_input(input: &str, reason: &str) -> Self {
        Self::InvalidInput {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Creates a `NotFound` error.
    #[must_use]
    pub fn not_found(backend: Backend, doi: &str) -> Self {
        Self::NotFound {
            backend,
            doi: doi.to_string(),
        }
    }

    /// Creates a `RateLimited` error from the tracked rate-limit state.
    #[must_use]
    pub fn rate_limited(backend: Backend, doi: &str, state: RateLimitState) -> Self {
        Self::RateLimited {
            backend,
            doi: doi.to_string(),
            reset_at: state.reset_at,
        }
    }

    /// Creates an `Api` error.
    #[must_use]
    pub fn api(backend: Backend, doi: &str, status: u16) -> Self {
        Self::Api {
            backend,
            doi: doi.to_string(),
            status,
        }
    }

    /// Creates a `Network` error.
    #[must_use]
    pub fn network(backend: Backend, doi: &str, attempts: u32, source: TransportError) -> Self {
        Self::Network {
            backend,
            doi: doi.to_string(),
            attempts,
            source,
        }
    }

    /// Creates an `InvalidResponse` error.
    #[must_use]
    pub fn invalid_response(backend: Backend, doi: &str, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            backend,
            doi: doi.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns the backend that raised this error, if any.
    #[must_use]
    pub fn backend(&self) -> Option<Backend> {
        match self {
            Self::InvalidInput { .. } => None,
            Self::NotFound { backend, .. }
            | Self::RateLimited { backend, .. }
            | Self::Api { backend, .. }
            | Self::Network { backend, .. }
            | Self::InvalidResponse { backend, .. }
            | Self::MissingTransport { backend } => Some(*backend),
        }
    }

    /// Maps a non-200 status onto the error taxonomy.
    ///
    /// Returns `None` for 200.
    #[must_use]
    pub fn from_status(
        backend: Backend,
        doi: &str,
        status: u16,
        state: RateLimitState,
    ) -> Option<Self> {
        match status {
            200 => None,
            404 => Some(Self::not_found(backend, doi)),
            429 => Some(Self::rate_limited(backend, doi, state)),
            other => Some(Self::api(backend, doi, other)),
        }
    }
}

impl Transient for ResolveError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}
