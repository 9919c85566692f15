//! Error types for transport-level failures.

use std::fmt;

use thiserror::Error;

/// Category of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// DNS resolution or TCP/TLS connection failure.
    Connect,
    /// The request or response exceeded the configured timeout.
    Timeout,
    /// The response body could not be read.
    Body,
    /// Any other request failure.
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Connect => "connection failed",
            Self::Timeout => "timed out",
            Self::Body => "body read failed",
            Self::Other => "request failed",
        };
        f.write_str(label)
    }
}

/// A request that never produced an HTTP response.
#[derive(Debug, Clone, Error)]
#[error("{kind} for {url}: {message}")]
pub struct TransportError {
    /// The URL being requested.
    pub url: String,
    /// Failure category.
    pub kind: TransportErrorKind,
    /// Description of the underlying failure.
    pub message: String,
}

impl TransportError {
    /// Creates a transport error.
    #[must_use]
    pub fn new(url: impl Into<String>, kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind,
            message: message.into(),
        }
    }

    /// Creates a connection failure.
    #[must_use]
    pub fn connect(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(url, TransportErrorKind::Connect, message)
    }

    /// Creates a timeout failure.
    #[must_use]
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::new(url, TransportErrorKind::Timeout, "no response before deadline")
    }

    /// Maps a `reqwest` error onto a transport error.
    #[must_use]
    pub fn from_reqwest(url: &str, error: &reqwest::Error) -> Self {
        let kind = if error.is_timeout() {
            TransportErrorKind::Timeout
        } else if error.is_connect() {
            TransportErrorKind::Connect
        } else if error.is_body() || error.is_decode() {
            TransportErrorKind::Body
        } else {
            TransportErrorKind::Other
        };
        Self::new(url, kind, error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_message_includes_kind_and_url() {
        let err = TransportError::connect("https://doi.org/10.1234/x", "connection refused");
        let msg = err.to_string();
        assert!(msg.contains("connection failed"));
        assert!(msg.contains("https://doi.org/10.1234/x"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn test_transport_error_timeout_kind() {
        let err = TransportError::timeout("https://api.crossref.org/works/x");
        assert_eq!(err.kind, TransportErrorKind::Timeout);
        assert!(err.to_string().contains("timed out"));
    }
}
