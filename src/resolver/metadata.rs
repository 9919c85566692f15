//! Record shapes returned by the backends.

use serde::{Deserialize, Serialize};

/// One author in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    /// Given name (`given` in CrossRef).
    pub first_name: Option<String>,
    /// Family name (`family` in CrossRef).
    pub last_name: Option<String>,
}

/// Canonical bibliographic record produced by the CrossRef backend.
///
/// Absent source fields are `None` (serialized as `null`), never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalMetadata {
    pub title: Option<String>,
    pub authors: Vec<Author>,
    pub doi: Option<String>,
    pub url: Option<String>,
    pub journal: Option<String>,
    pub issn: Option<String>,
    pub issue: Option<String>,
    pub volume: Option<String>,
    pub year: Option<i64>,
    pub publisher: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub language: Option<String>,
}

/// CSL-JSON record returned verbatim by the `doi.org` backend.
///
/// When a proxy is configured the record also carries `proxied_url` and
/// `proxied_link` next to the untouched `URL` and `link` keys.
pub type RawUpstreamRecord = serde_json::Map<String, serde_json::Value>;
