//! DOI syntax validation.
//!
//! Validity is purely syntactic: `10.` followed by a registrant code of at
//! least four digits, a `/`, and a suffix drawn from a restricted character
//! class. No network call is made.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

/// Anchored DOI grammar: `10.NNNN/suffix`.
#[allow(clippy::expect_used)]
static DOI_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^10\.\d{4,}/[-._;()/:\w]+$").expect("DOI regex is valid") // Static pattern, safe to panic
});

/// Returns true if `doi` is a syntactically valid DOI.
///
/// Empty input returns false rather than failing.
///
/// # Examples
///
/// ```
/// use bibli_core::doi::validate_doi;
///
/// assert!(validate_doi("10.1234/example.doi"));
/// assert!(!validate_doi("11.1234/example"));
/// assert!(!validate_doi(""));
/// ```
#[must_use]
pub fn validate_doi(doi: &str) -> bool {
    if doi.is_empty() {
        return false;
    }
    let valid = DOI_PATTERN.is_match(doi);
    trace!(doi, valid, "validated DOI syntax");
    valid
}
