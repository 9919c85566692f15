//! Shared User-Agent string for upstream metadata requests.
//!
//! Both backends identify with a contact address so CrossRef routes traffic
//! to its polite pool.

/// Contact address used when no `mailto` is configured.
pub(crate) const DEFAULT_MAILTO: &str = "support@bibli.com";

/// User-Agent sent when no `mailto` is configured.
pub(crate) const DEFAULT_USER_AGENT: &str = "Bibli/1.0 (mailto:support@bibli.com)";

/// Builds `Bibli/1.0 (mailto:{address})`, falling back to [`DEFAULT_MAILTO`].
#[must_use]
pub(crate) fn resolver_user_agent(mailto: Option<&str>) -> String {
    let address = mailto
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_MAILTO);
    format!("Bibli/1.0 (mailto:{address})")
}
