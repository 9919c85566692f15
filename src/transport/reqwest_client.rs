//! `reqwest`-backed [`HttpTransport`] with shared timeout policy.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::HeaderMap;
use tracing::{debug, instrument};

use super::{HttpTransport, TransportError, TransportErrorKind, TransportResponse};

/// Default TCP/TLS connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default whole-request timeout.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Production transport over a single pooled `reqwest::Client`.
///
/// Build it once and share it (`Arc<ReqwestTransport>`) between backends.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport with the default timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the underlying client cannot be built
    /// (for example, no TLS backend is available).
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeouts(DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT)
    }

    /// Creates a transport with custom connect and read timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the underlying client cannot be built.
    #[instrument(fields(connect_ms = connect_timeout.as_millis(), read_ms = read_timeout.as_millis()))]
    pub fn with_timeouts(
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(read_timeout)
            .gzip(true)
            .build()
            .map_err(|error| {
                TransportError::new(
                    "",
                    TransportErrorKind::Other,
                    format!("HTTP client construction failed: {error}"),
                )
            })?;
        debug!("built reqwest transport");
        Ok(Self { client })
    }

    /// Wraps an already configured client.
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        headers: &HeaderMap,
    ) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .headers(headers.clone())
            .send()
            .await
            .map_err(|error| TransportError::from_reqwest(url, &error))?;

        let status = response.status().as_u16();
        let response_headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|error| TransportError::from_reqwest(url, &error))?;

        debug!(url, status, body_len = body.len(), "received response");
        Ok(TransportResponse::new(status, response_headers, body.to_vec()))
    }
}
