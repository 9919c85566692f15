//! Injectable HTTP transport used by the resolution backends.
//!
//! Backends never construct their own client: a [`HttpTransport`] is handed
//! in at build time so connection ownership stays with the caller and tests
//! can substitute a scripted transport.
//!
//! - [`HttpTransport`] - Async trait performing a single `GET`
//! - [`TransportResponse`] - Status, headers, and raw body of one response
//! - [`TransportError`] - Transport-level failure (connect, timeout, body read)
//! - [`ReqwestTransport`] - Production implementation over `reqwest`

mod error;
mod reqwest_client;

pub use error::{TransportError, TransportErrorKind};
pub use reqwest_client::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT, ReqwestTransport};

use async_trait::async_trait;
use reqwest::header::HeaderMap;

/// One HTTP response as seen by the backends.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Fully buffered response body.
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Creates a response from its parts.
    #[must_use]
    pub fn new(status: u16, headers: HeaderMap, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the body is not valid JSON for `T`.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Performs HTTP `GET` requests on behalf of a backend.
///
/// # Object Safety
///
/// Uses `async_trait` so backends can hold an `Arc<dyn HttpTransport>`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issues a `GET` to `url` with the given headers.
    ///
    /// HTTP error statuses are returned as responses, not errors. Only
    /// transport-level failures produce a [`TransportError`].
    async fn get(&self, url: &str, headers: &HeaderMap)
    -> Result<TransportResponse, TransportError>;
}
