//! CrossRef backend - resolves DOIs to canonical metadata via the works API.
//!
//! The [`CrossrefBackend`] calls `{base}/works/{doi}` through the shared
//! [`RateLimiter`] and [`RetryPolicy`], then flattens the `message` payload
//! into a [`CanonicalMetadata`] record with [`normalize`].

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::request::{RateLimitState, RateLimitTracker, RateLimiter, RetryPolicy};
use crate::transport::HttpTransport;
use crate::user_agent::resolver_user_agent;

use super::fetch::Fetch;
use super::{Author, Backend, CanonicalMetadata, DoiBackend, ResolveError, UrlTransformer};

/// Default CrossRef API base URL.
pub const DEFAULT_CROSSREF_BASE_URL: &str = "https://api.crossref.org";

// ==================== CrossRef API Response Types ====================

/// Top-level CrossRef works response.
#[derive(Debug, Deserialize)]
struct CrossrefResponse {
    message: Option<CrossrefMessage>,
}

/// The `message` field from a CrossRef works response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrossrefMessage {
    pub title: Option<Vec<String>>,
    pub author: Option<Vec<CrossrefAuthor>>,
    #[serde(rename = "DOI")]
    pub doi: Option<String>,
    #[serde(rename = "URL")]
    pub url: Option<String>,
    pub container_title: Option<Vec<String>>,
    #[serde(rename = "ISSN")]
    pub issn: Option<Vec<String>>,
    pub issue: Option<String>,
    pub volume: Option<String>,
    pub publisher: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub language: Option<String>,
    pub published_print: Option<CrossrefDate>,
    pub published_online: Option<CrossrefDate>,
    pub created: Option<CrossrefDate>,
}

/// An author entry from the CrossRef response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CrossrefAuthor {
    pub given: Option<String>,
    pub family: Option<String>,
}

/// A date entry from the CrossRef response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrossrefDate {
    pub date_parts: Option<Vec<Vec<Option<i64>>>>,
}

// ==================== Normalization ====================

/// Flattens a CrossRef `message` into the canonical record.
///
/// Pure and deterministic. Missing or empty source arrays yield `None`
/// (or an empty author list), never an error. The year comes from the first
/// of `published-print`, `published-online`, `created` whose first date part
/// is present and non-zero.
#[must_use]
pub fn normalize(message: &CrossrefMessage) -> CanonicalMetadata {
    CanonicalMetadata {
        title: first(message.title.as_deref()),
        authors: message
            .author
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|author| Author {
                first_name: author.given.clone(),
                last_name: author.family.clone(),
            })
            .collect(),
        doi: message.doi.clone(),
        url: message.url.clone(),
        journal: first(message.container_title.as_deref()),
        issn: first(message.issn.as_deref()),
        issue: message.issue.clone(),
        volume: message.volume.clone(),
        year: extract_year(message),
        publisher: message.publisher.clone(),
        kind: message.kind.clone(),
        language: message.language.clone(),
    }
}

fn first(values: Option<&[String]>) -> Option<String> {
    values.and_then(<[String]>::first).cloned()
}

fn extract_year(message: &CrossrefMessage) -> Option<i64> {
    [
        message.published_print.as_ref(),
        message.published_online.as_ref(),
        message.created.as_ref(),
    ]
    .into_iter()
    .flatten()
    .find_map(year_of)
}

fn year_of(date: &CrossrefDate) -> Option<i64> {
    date.date_parts
        .as_ref()
        .and_then(|parts| parts.first())
        .and_then(|inner| inner.first())
        .copied()
        .flatten()
        .filter(|year| *year != 0)
}

// ==================== CrossrefBackend ====================

/// Resolves DOIs to [`CanonicalMetadata`] via the CrossRef works API.
///
/// Every attempt first takes a slot from the shared [`RateLimiter`]. Share
/// one limiter (`Arc`) between all CrossRef backends in the process so the
/// ceiling holds globally.
///
/// # Polite Pool
///
/// Requests identify with `User-Agent: Bibli/1.0 (mailto:...)` and, when a
/// contact address is configured, a `mailto` query parameter.
pub struct CrossrefBackend {
    transport: Arc<dyn HttpTransport>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    rate_limits: RateLimitTracker,
    proxy: Option<Arc<dyn UrlTransformer>>,
    base_url: String,
    mailto: Option<String>,
    headers: HeaderMap,
}

impl CrossrefBackend {
    /// Starts building a backend.
    #[must_use]
    pub fn builder() -> CrossrefBackendBuilder {
        CrossrefBackendBuilder::default()
    }

    /// Returns the last rate-limit state reported by CrossRef.
    #[must_use]
    pub fn rate_limit_state(&self) -> RateLimitState {
        self.rate_limits.snapshot()
    }

    /// Builds the request URL for `doi`, before proxy rewriting.
    fn works_url(&self, doi: &str) -> String {
        let mut url = format!("{}/works/{doi}", self.base_url);
        if let Some(mailto) = &self.mailto {
            url.push_str("?mailto=");
            url.push_str(&urlencoding::encode(mailto));
        }
        url
    }

    /// Resolves `doi` to canonical metadata.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::InvalidInput`] for an empty DOI (no request is made)
    /// - [`ResolveError::NotFound`], [`ResolveError::RateLimited`],
    ///   [`ResolveError::Api`] for 404, 429, and other non-200 statuses
    /// - [`ResolveError::Network`] once transport retries are exhausted
    /// - [`ResolveError::InvalidResponse`] when the body has no usable `message`
    #[tracing::instrument(skip(self), fields(backend = "crossref"))]
    pub async fn resolve(&self, doi: &str) -> Result<CanonicalMetadata, ResolveError> {
        if doi.is_empty() {
            return Err(ResolveError::invalid_input(doi, "DOI cannot be empty"));
        }

        let mut url = self.works_url(doi);
        if let Some(proxy) = &self.proxy {
            url = proxy.transform(&url);
        }
        debug!(api_url = %url, "Calling CrossRef API");

        let response = Fetch {
            backend: Backend::Crossref,
            doi,
            url: &url,
            headers: &self.headers,
            transport: self.transport.as_ref(),
            retry: &self.retry,
            rate_limits: &self.rate_limits,
            limiter: Some(self.limiter.as_ref()),
        }
        .send()
        .await?;

        let body = response.json::<CrossrefResponse>().map_err(|error| {
            warn!(error = %error, "Failed to parse CrossRef response JSON");
            ResolveError::invalid_response(Backend::Crossref, doi, error.to_string())
        })?;
        let Some(message) = body.message else {
            return Err(ResolveError::invalid_response(
                Backend::Crossref,
                doi,
                "response has no `message` object",
            ));
        };

        Ok(normalize(&message))
    }
}

impl std::fmt::Debug for CrossrefBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrossrefBackend")
            .field("base_url", &self.base_url)
            .field("mailto", &self.mailto)
            .field("retry", &self.retry)
            .field("proxied", &self.proxy.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DoiBackend for CrossrefBackend {
    type Record = CanonicalMetadata;

    fn backend(&self) -> Backend {
        Backend::Crossref
    }

    async fn resolve(&self, doi: &str) -> Result<CanonicalMetadata, ResolveError> {
        CrossrefBackend::resolve(self, doi).await
    }
}

/// Builder for [`CrossrefBackend`].
#[derive(Default)]
pub struct CrossrefBackendBuilder {
    transport: Option<Arc<dyn HttpTransport>>,
    limiter: Option<Arc<RateLimiter>>,
    retry: Option<RetryPolicy>,
    proxy: Option<Arc<dyn UrlTransformer>>,
    base_url: Option<String>,
    mailto: Option<String>,
}

impl CrossrefBackendBuilder {
    /// Sets the HTTP transport (required).
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the shared rate limiter. Defaults to a fresh 50/s limiter.
    #[must_use]
    pub fn rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Sets the retry policy. Defaults to [`RetryPolicy::default`].
    #[must_use]
    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Routes requests through an institutional proxy.
    #[must_use]
    pub fn proxy(mut self, proxy: Arc<dyn UrlTransformer>) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Overrides the API base URL (for testing with wiremock).
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the polite-pool contact address.
    #[must_use]
    pub fn mailto(mut self, mailto: impl Into<String>) -> Self {
        self.mailto = Some(mailto.into());
        self
    }

    /// Builds the backend.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::MissingTransport`] when no transport was supplied
    /// - [`ResolveError::InvalidInput`] when `mailto` cannot be sent in a header
    pub fn build(self) -> Result<CrossrefBackend, ResolveError> {
        let transport = self.transport.ok_or(ResolveError::MissingTransport {
            backend: Backend::Crossref,
        })?;

        let mailto = self
            .mailto
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let user_agent = resolver_user_agent(mailto.as_deref());
        let user_agent = HeaderValue::from_str(&user_agent).map_err(|_| {
            ResolveError::invalid_input(
                mailto.as_deref().unwrap_or_default(),
                "mailto contains characters not allowed in a header",
            )
        })?;
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, user_agent);

        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_CROSSREF_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(CrossrefBackend {
            transport,
            limiter: self
                .limiter
                .unwrap_or_else(|| Arc::new(RateLimiter::crossref_default())),
            retry: self.retry.unwrap_or_default(),
            rate_limits: RateLimitTracker::new(),
            proxy: self.proxy,
            base_url,
            mailto,
            headers,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use crate::transport::ReqwestTransport;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, ResponseTemplate};

    fn message(json: serde_json::Value) -> CrossrefMessage {
        serde_json::from_value(json).unwrap()
    }

    // ==================== Normalization Tests ====================

    #[test]
    fn test_normalize_full_message() {
        let metadata = normalize(&message(serde_json::json!({
            "title": ["A Study", "Subtitle"],
            "author": [
                {"given": "A", "family": "Smith"},
                {"family": "Consortium"},
                {"given": "C", "family": "Third"}
            ],
            "DOI": "10.1234/example.doi",
            "URL": "https://doi.org/10.1234/example.doi",
            "container-title": ["Journal of Examples"],
            "ISSN": ["1234-5678", "8765-4321"],
            "issue": "4",
            "volume": "12",
            "publisher": "Example Press",
            "type": "journal-article",
            "language": "en",
            "published-print": {"date-parts": [[2020, 5]]}
        })));

        assert_eq!(metadata.title.as_deref(), Some("A Study"));
        assert_eq!(metadata.authors.len(), 3);
        assert_eq!(metadata.authors[1].first_name, None);
        assert_eq!(metadata.authors[1].last_name.as_deref(), Some("Consortium"));
        assert_eq!(metadata.authors[2].first_name.as_deref(), Some("C"));
        assert_eq!(metadata.journal.as_deref(), Some("Journal of Examples"));
        assert_eq!(metadata.issn.as_deref(), Some("1234-5678"));
        assert_eq!(metadata.issue.as_deref(), Some("4"));
        assert_eq!(metadata.volume.as_deref(), Some("12"));
        assert_eq!(metadata.year, Some(2020));
        assert_eq!(metadata.publisher.as_deref(), Some("Example Press"));
        assert_eq!(metadata.kind.as_deref(), Some("journal-article"));
        assert_eq!(metadata.language.as_deref(), Some("en"));
    }

    #[test]
    fn test_normalize_empty_arrays_are_absent() {
        let metadata = normalize(&message(serde_json::json!({
            "title": [],
            "author": []
        })));

        assert_eq!(metadata.title, None);
        assert!(metadata.authors.is_empty());
        assert_eq!(metadata.journal, None);
        assert_eq!(metadata.issn, None);
        assert_eq!(metadata.year, None);
    }

    #[test]
    fn test_normalize_empty_message() {
        assert_eq!(normalize(&CrossrefMessage::default()), CanonicalMetadata::default());
    }

    #[test]
    fn test_normalize_year_prefers_published_print() {
        let metadata = normalize(&message(serde_json::json!({
            "created": {"date-parts": [[2018, 1, 1]]},
            "published-online": {"date-parts": [[2019, 3]]},
            "published-print": {"date-parts": [[2020]]}
        })));
        assert_eq!(metadata.year, Some(2020));
    }

    #[test]
    fn test_normalize_year_falls_back_to_online_then_created() {
        let online = normalize(&message(serde_json::json!({
            "published-online": {"date-parts": [[2019]]},
            "created": {"date-parts": [[2018]]}
        })));
        assert_eq!(online.year, Some(2019));

        let created = normalize(&message(serde_json::json!({
            "created": {"date-parts": [[2018]]}
        })));
        assert_eq!(created.year, Some(2018));
    }

    #[test]
    fn test_normalize_year_skips_present_field_without_year() {
        let metadata = normalize(&message(serde_json::json!({
            "published-print": {"date-parts": [[null]]},
            "published-online": {},
            "created": {"date-parts": [[2017, 2]]}
        })));
        assert_eq!(metadata.year, Some(2017));
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let msg = message(serde_json::json!({
            "title": ["Stable"],
            "author": [{"given": "B", "family": "Jones"}],
            "created": {"date-parts": [[2001]]}
        }));
        let first_pass = serde_json::to_vec(&normalize(&msg)).unwrap();
        let second_pass = serde_json::to_vec(&normalize(&msg)).unwrap();
        assert_eq!(first_pass, second_pass);
    }

    // ==================== Backend Tests ====================

    fn backend_for(base_url: &str) -> CrossrefBackend {
        CrossrefBackend::builder()
            .transport(Arc::new(ReqwestTransport::new().unwrap()))
            .base_url(base_url)
            .mailto("test@example.com")
            .retry_policy(RetryPolicy::new(
                3,
                Duration::from_millis(1),
                Duration::from_millis(4),
            ))
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_without_transport_fails_fast() {
        let err = CrossrefBackend::builder().build().unwrap_err();
        assert!(matches!(
            err,
            ResolveError::MissingTransport {
                backend: Backend::Crossref
            }
        ));
    }

    #[test]
    fn test_build_rejects_header_breaking_mailto() {
        let err = CrossrefBackend::builder()
            .transport(Arc::new(ReqwestTransport::new().unwrap()))
            .mailto("evil@example.com\r\nX-Injected: 1")
            .build()
            .unwrap_err();
        assert!(matches!(err, ResolveError::InvalidInput { .. }));
    }

    #[test]
    fn test_works_url_encodes_mailto() {
        let backend = CrossrefBackend::builder()
            .transport(Arc::new(ReqwestTransport::new().unwrap()))
            .mailto("a+b@example.com")
            .build()
            .unwrap();
        assert_eq!(
            backend.works_url("10.1234/x"),
            "https://api.crossref.org/works/10.1234/x?mailto=a%2Bb%40example.com"
        );
    }

    #[tokio::test]
    async fn test_resolve_empty_doi_is_invalid_input() {
        let backend = backend_for("http://127.0.0.1:9");
        let err = backend.resolve("").await.unwrap_err();
        assert!(matches!(err, ResolveError::InvalidInput { .. }));
        assert!(err.to_string().contains("cannot be empty"));
    }

    #[tokio::test]
    async fn test_resolve_sends_polite_user_agent_and_normalizes() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("GET"))
            .and(path("/works/10.1234/example.doi"))
            .and(query_param("mailto", "test@example.com"))
            .and(header("user-agent", "Bibli/1.0 (mailto:test@example.com)"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "ok",
                "message": {
                    "title": ["A Study"],
                    "author": [{"given": "A", "family": "Smith"}],
                    "DOI": "10.1234/example.doi",
                    "published-print": {"date-parts": [[2020, 5]]}
                }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let metadata = backend_for(&mock_server.uri())
            .resolve("10.1234/example.doi")
            .await
            .unwrap();

        assert_eq!(metadata.title.as_deref(), Some("A Study"));
        assert_eq!(metadata.doi.as_deref(), Some("10.1234/example.doi"));
        assert_eq!(metadata.year, Some(2020));
    }

    #[tokio::test]
    async fn test_resolve_tracks_rate_limit_headers() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("X-Rate-Limit-Remaining", "49")
                    .insert_header("X-Rate-Limit-Reset", "1700000000")
                    .set_body_json(serde_json::json!({"message": {}})),
            )
            .mount(&mock_server)
            .await;

        let backend = backend_for(&mock_server.uri());
        backend.resolve("10.1234/x").await.unwrap();

        let state = backend.rate_limit_state();
        assert_eq!(state.remaining, Some(49));
        assert!(state.reset_at.is_some());
    }

    #[tokio::test]
    async fn test_resolve_missing_message_is_invalid_response() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "ok"})))
            .mount(&mock_server)
            .await;

        let err = backend_for(&mock_server.uri())
            .resolve("10.1234/x")
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_resolve_500_is_not_retried() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&mock_server)
            .await;

        let err = backend_for(&mock_server.uri())
            .resolve("10.1234/x")
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Api { status: 503, .. }));
    }
}
