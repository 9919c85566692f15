//! DOI resolution backends.
//!
//! Two independent strategies turn a DOI into bibliographic metadata:
//!
//! - [`CrossrefBackend`] - CrossRef works API, rate limited, normalized to
//!   [`CanonicalMetadata`]
//! - [`DoiOrgBackend`] - `doi.org` content negotiation, validated input,
//!   returned as a [`RawUpstreamRecord`]
//!
//! Both share the [`DoiBackend`] trait, the [`ResolveError`] taxonomy, the
//! retry policy for transport failures, and optional [`UrlTransformer`]
//! proxying.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use bibli_core::{CrossrefBackend, ReqwestTransport, RateLimiter};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = CrossrefBackend::builder()
//!     .transport(Arc::new(ReqwestTransport::new()?))
//!     .rate_limiter(Arc::new(RateLimiter::crossref_default()))
//!     .mailto("me@example.com")
//!     .build()?;
//!
//! let metadata = backend.resolve("10.1234/example.doi").await?;
//! println!("{:?}", metadata.title);
//! # Ok(())
//! # }
//! ```

mod crossref;
mod doi_org;
mod error;
mod fetch;
mod metadata;
mod proxy;

pub use crossref::{
    CrossrefAuthor, CrossrefBackend, CrossrefBackendBuilder, CrossrefDate, CrossrefMessage,
    DEFAULT_CROSSREF_BASE_URL, normalize,
};
pub use doi_org::{CSL_JSON, DEFAULT_DOI_ORG_BASE_URL, DoiOrgBackend, DoiOrgBackendBuilder};
pub use error::{Backend, ResolveError};
pub use metadata::{Author, CanonicalMetadata, RawUpstreamRecord};
pub use proxy::{InstitutionalProxy, UT_PROXY_HOST, UrlTransformer};

use async_trait::async_trait;
use serde::Serialize;

/// A strategy that resolves a DOI to a serializable record.
#[async_trait]
pub trait DoiBackend: Send + Sync {
    /// Record shape this backend produces.
    type Record: Serialize + Send;

    /// Which upstream this backend talks to.
    fn backend(&self) -> Backend;

    /// Resolves `doi`.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolveError`] tagged with [`DoiBackend::backend`] for
    /// upstream failures, or `InvalidInput` for rejected input.
    async fn resolve(&self, doi: &str) -> Result<Self::Record, ResolveError>;
}
