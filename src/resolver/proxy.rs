//! Institutional access proxy URL rewriting.
//!
//! A proxy is a black-box URL transformer: [`UrlTransformer::transform`] is
//! pure, never touches the network, and leaves input it cannot parse
//! unchanged. [`InstitutionalProxy`] implements the EZproxy host-rewriting
//! scheme, where `https://doi.org/10.1/x` becomes
//! `https://doi-org.ezproxy.lib.example.edu/10.1/x`.

use tracing::trace;
use url::Url;

/// Proxy host for the University of Texas libraries.
pub const UT_PROXY_HOST: &str = "ezproxy.lib.utexas.edu";

/// Maps a canonical URL to an institution-specific access URL.
pub trait UrlTransformer: Send + Sync {
    /// Returns the rewritten URL.
    fn transform(&self, url: &str) -> String;
}

impl<F> UrlTransformer for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn transform(&self, url: &str) -> String {
        self(url)
    }
}

/// EZproxy-style host rewriting proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstitutionalProxy {
    proxy_host: String,
}

impl InstitutionalProxy {
    /// Creates a proxy that rewrites hosts under `proxy_host`.
    #[must_use]
    pub fn new(proxy_host: impl Into<String>) -> Self {
        let proxy_host = proxy_host.into();
        Self {
            proxy_host: proxy_host.trim().trim_matches('.').to_ascii_lowercase(),
        }
    }

    /// Preconfigured proxy for the University of Texas libraries.
    #[must_use]
    pub fn university_of_texas() -> Self {
        Self::new(UT_PROXY_HOST)
    }

    /// Returns the proxy host suffix.
    #[must_use]
    pub fn proxy_host(&self) -> &str {
        &self.proxy_host
    }
}

impl UrlTransformer for InstitutionalProxy {
    fn transform(&self, url: &str) -> String {
        let Ok(mut parsed) = Url::parse(url) else {
            return url.to_string();
        };
        let Some(host) = parsed.host_str().map(str::to_ascii_lowercase) else {
            return url.to_string();
        };
        if host == self.proxy_host || host.ends_with(&format!(".{}", self.proxy_host)) {
            return url.to_string();
        }

        // EZproxy serves every rewritten origin over its own TLS endpoint.
        let proxied_host = format!("{}.{}", host.replace('.', "-"), self.proxy_host);
        if parsed.set_scheme("https").is_err()
            || parsed.set_host(Some(&proxied_host)).is_err()
            || parsed.set_port(None).is_err()
        {
            return url.to_string();
        }

        trace!(from = url, to = %parsed, "proxied URL");
        parsed.to_string()
    }
}
