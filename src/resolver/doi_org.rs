//! DOI.org backend - CSL-JSON content negotiation.
//!
//! The record is returned as the upstream sent it. When a proxy is
//! configured, the `URL` and `link` fields are additionally rewritten into
//! `proxied_url` and `proxied_link`; the originals stay untouched.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::{debug, warn};

use crate::doi::validate_doi;
use crate::request::{RateLimitState, RateLimitTracker, RetryPolicy};
use crate::transport::HttpTransport;
use crate::user_agent::DEFAULT_USER_AGENT;

use super::fetch::Fetch;
use super::{
    Backend, DoiBackend, InstitutionalProxy, RawUpstreamRecord, ResolveError, UrlTransformer,
};

/// Default DOI resolver base URL.
pub const DEFAULT_DOI_ORG_BASE_URL: &str = "https://doi.org";

/// Media type requested through content negotiation.
pub const CSL_JSON: &str = "application/vnd.citationstyles.csl+json";

/// Resolves DOIs to raw CSL-JSON records via `doi.org`.
///
/// Unlike [`CrossrefBackend`](super::CrossrefBackend), input is validated
/// syntactically before any request, and no client-side rate limiter is
/// applied. Transport failures are still retried.
pub struct DoiOrgBackend {
    transport: Arc<dyn HttpTransport>,
    retry: RetryPolicy,
    rate_limits: RateLimitTracker,
    proxy: Option<Arc<dyn UrlTransformer>>,
    base_url: String,
    headers: HeaderMap,
}

impl DoiOrgBackend {
    /// Starts building a backend.
    #[must_use]
    pub fn builder() -> DoiOrgBackendBuilder {
        DoiOrgBackendBuilder::default()
    }

    /// Creates a backend routed through the University of Texas proxy.
    ///
    /// # Errors
    ///
    /// Never fails in practice; shares the builder's signature.
    pub fn with_institutional_access(
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, ResolveError> {
        Self::builder()
            .transport(transport)
            .institutional_access()
            .build()
    }

    /// Returns the last rate-limit state reported by `doi.org`.
    #[must_use]
    pub fn rate_limit_state(&self) -> RateLimitState {
        self.rate_limits.snapshot()
    }

    /// Resolves `doi` to its raw CSL-JSON record.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::InvalidInput`] when `doi` fails validation (no request is made)
    /// - [`ResolveError::NotFound`], [`ResolveError::RateLimited`],
    ///   [`ResolveError::Api`] for 404, 429, and other non-200 statuses
    /// - [`ResolveError::Network`] once transport retries are exhausted
    /// - [`ResolveError::InvalidResponse`] when the body is not a JSON object
    #[tracing::instrument(skip(self), fields(backend = "doi.org"))]
    pub async fn resolve(&self, doi: &str) -> Result<RawUpstreamRecord, ResolveError> {
        if !validate_doi(doi) {
            return Err(ResolveError::invalid_input(doi, "Invalid DOI format"));
        }

        let mut url = format!("{}/{doi}", self.base_url);
        if let Some(proxy) = &self.proxy {
            url = proxy.transform(&url);
        }
        debug!(api_url = %url, "Calling doi.org");

        let response = Fetch {
            backend: Backend::DoiOrg,
            doi,
            url: &url,
            headers: &self.headers,
            transport: self.transport.as_ref(),
            retry: &self.retry,
            rate_limits: &self.rate_limits,
            limiter: None,
        }
        .send()
        .await?;

        let mut record = response.json::<RawUpstreamRecord>().map_err(|error| {
            warn!(error = %error, "doi.org body is not a JSON object");
            ResolveError::invalid_response(Backend::DoiOrg, doi, error.to_string())
        })?;

        if let Some(proxy) = &self.proxy {
            add_proxied_fields(&mut record, proxy.as_ref());
        }
        Ok(record)
    }
}

/// Adds `proxied_url` and `proxied_link` next to the source keys.
fn add_proxied_fields(record: &mut RawUpstreamRecord, proxy: &dyn UrlTransformer) {
    if let Some(url) = record.get("URL").and_then(Value::as_str) {
        let proxied = proxy.transform(url);
        record.insert("proxied_url".to_string(), Value::String(proxied));
    }
    if let Some(proxied) = record.get("link").and_then(|link| proxied_link(link, proxy)) {
        record.insert("proxied_link".to_string(), proxied);
    }
}

/// CSL `link` is a URL string or an array of `{ "URL": .. }` objects.
fn proxied_link(link: &Value, proxy: &dyn UrlTransformer) -> Option<Value> {
    match link {
        Value::String(url) => Some(Value::String(proxy.transform(url))),
        Value::Array(entries) => Some(Value::Array(
            entries
                .iter()
                .filter_map(|entry| match entry {
                    Value::String(url) => Some(url.as_str()),
                    Value::Object(fields) => fields.get("URL").and_then(Value::as_str),
                    _ => None,
                })
                .map(|url| Value::String(proxy.transform(url)))
                .collect(),
        )),
        _ => None,
    }
}

impl std::fmt::Debug for DoiOrgBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DoiOrgBackend")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .field("proxied", &self.proxy.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DoiBackend for DoiOrgBackend {
    type Record = RawUpstreamRecord;

    fn backend(&self) -> Backend {
        Backend::DoiOrg
    }

    async fn resolve(&self, doi: &str) -> Result<RawUpstreamRecord, ResolveError> {
        DoiOrgBackend::resolve(self, doi).await
    }
}

/// Builder for [`DoiOrgBackend`].
#[derive(Default)]
pub struct DoiOrgBackendBuilder {
    transport: Option<Arc<dyn HttpTransport>>,
    retry: Option<RetryPolicy>,
    proxy: Option<Arc<dyn UrlTransformer>>,
    base_url: Option<String>,
}

impl DoiOrgBackendBuilder {
    /// Sets the HTTP transport (required).
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the retry policy. Defaults to [`RetryPolicy::default`].
    #[must_use]
    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Routes requests and returned links through `proxy`.
    #[must_use]
    pub fn proxy(mut self, proxy: Arc<dyn UrlTransformer>) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Shorthand for [`InstitutionalProxy::university_of_texas`].
    #[must_use]
    pub fn institutional_access(self) -> Self {
        self.proxy(Arc::new(InstitutionalProxy::university_of_texas()))
    }

    /// Overrides the resolver base URL (for testing with wiremock).
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Builds the backend.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::MissingTransport`] when no transport was supplied.
    pub fn build(self) -> Result<DoiOrgBackend, ResolveError> {
        let transport = self.transport.ok_or(ResolveError::MissingTransport {
            backend: Backend::DoiOrg,
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(CSL_JSON));
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));

        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_DOI_ORG_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(DoiOrgBackend {
            transport,
            retry: self.retry.unwrap_or_default(),
            rate_limits: RateLimitTracker::new(),
            proxy: self.proxy,
            base_url,
            headers,
        })
    }
}
