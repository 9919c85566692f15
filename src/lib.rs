//! Bibli Core Library
//!
//! Resolves bibliographic metadata for DOIs through two upstream strategies:
//! the CrossRef works API and content negotiation at `doi.org`.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`doi`] - DOI syntax validation
//! - [`request`] - Rate limiting, retry with backoff, and rate-limit header tracking
//! - [`transport`] - Injectable HTTP transport and its `reqwest` implementation
//! - [`resolver`] - CrossRef and `doi.org` backends, metadata types, proxy rewriting

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod doi;
pub mod request;
pub mod resolver;
#[cfg(test)]
pub mod test_support;
pub mod transport;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use doi::validate_doi;
pub use request::{
    DEFAULT_MAX_RETRIES, RateLimitState, RateLimitTracker, RateLimiter, RetryPolicy, Transient,
};
pub use resolver::{
    Author, Backend, CanonicalMetadata, CrossrefBackend, CrossrefMessage, DoiBackend,
    DoiOrgBackend, InstitutionalProxy, RawUpstreamRecord, ResolveError, UrlTransformer,
    normalize,
};
pub use transport::{
    HttpTransport, ReqwestTransport, TransportError, TransportErrorKind, TransportResponse,
};
