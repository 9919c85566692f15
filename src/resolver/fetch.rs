//! One guarded request/response cycle shared by both backends.

use reqwest::header::HeaderMap;
use tracing::debug;

use crate::request::{RateLimitTracker, RateLimiter, RetryPolicy};
use crate::transport::{HttpTransport, TransportResponse};

use super::{Backend, ResolveError};

/// Everything one backend call needs to issue its request.
pub(crate) struct Fetch<'a> {
    pub(crate) backend: Backend,
    pub(crate) doi: &'a str,
    pub(crate) url: &'a str,
    pub(crate) headers: &'a HeaderMap,
    pub(crate) transport: &'a dyn HttpTransport,
    pub(crate) retry: &'a RetryPolicy,
    pub(crate) rate_limits: &'a RateLimitTracker,
    /// Admission gate; `None` skips client-side throttling.
    pub(crate) limiter: Option<&'a RateLimiter>,
}

impl Fetch<'_> {
    /// Runs the request under the retry policy and classifies the status.
    ///
    /// Returns the 200 response. Transport failures are retried; any
    /// non-200 status is mapped to its error on first sight.
    pub(crate) async fn send(self) -> Result<TransportResponse, ResolveError> {
        let Fetch {
            backend,
            doi,
            url,
            headers,
            transport,
            retry,
            rate_limits,
            limiter,
        } = self;

        retry
            .execute(move |attempt| async move {
                if let Some(limiter) = limiter {
                    limiter.acquire().await;
                }

                debug!(%backend, url, attempt, "sending request");
                let response = transport
                    .get(url, headers)
                    .await
                    .map_err(|source| ResolveError::network(backend, doi, attempt, source))?;

                rate_limits.update(&response.headers);

                let state = rate_limits.snapshot();
                match ResolveError::from_status(backend, doi, response.status, state) {
                    Some(error) => {
                        debug!(%backend, status = response.status, "upstream error status");
                        Err(error)
                    }
                    None => Ok(response),
                }
            })
            .await
    }
}
