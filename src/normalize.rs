//! Response normalization
//!
//! Turns the outcome of any transport into one result shape: a decoded JSON
//! body with an optional freshness TTL, or a classified [`FetchError`].

use reqwest::header::{HeaderMap, CACHE_CONTROL};
use thiserror::Error;

use crate::transport::RawResponse;

/// Directive inside `Cache-Control` that carries the freshness lifetime
const MAX_AGE_DIRECTIVE: &str = "max-age";

/// Classified reason a request did not produce a JSON body
#[derive(Debug, Error)]
pub enum RequestError {
    /// The server answered with a status the transport does not accept
    #[error("Unexpected status code [{status}] on URL {url}")]
    Status { status: u16, url: String },

    /// The request failed and the transport cannot observe a status code
    #[error("Unexpected status code on URL {url}")]
    Rejected { url: String },

    /// The transport gave up waiting for a response
    #[error("Request timeout")]
    Timeout { url: String },

    /// Connection, TLS or protocol failure
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The body was received but is not valid JSON
    #[error("Failed to parse JSON response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The runtime dropped the request before it completed
    #[error("Request abandoned before completion on URL {url}")]
    Abandoned { url: String },
}

impl RequestError {
    /// HTTP status code, when the failure carries one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            RequestError::Status { status, .. } => Some(*status),
            RequestError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// A failed request together with whatever response metadata was observed
#[derive(Debug, Error)]
#[error("{error}")]
pub struct FetchError {
    /// What went wrong
    #[source]
    pub error: RequestError,
    /// Response handle, if the server answered at all
    pub raw: Option<RawResponse>,
}

impl FetchError {
    /// Creates a failure without response metadata
    pub fn new(error: impl Into<RequestError>) -> Self {
        Self {
            error: error.into(),
            raw: None,
        }
    }

    /// Creates a failure that keeps the response handle
    pub fn with_raw(error: impl Into<RequestError>, raw: RawResponse) -> Self {
        Self {
            error: error.into(),
            raw: Some(raw),
        }
    }

    /// HTTP status code, when the failure carries one
    pub fn status_code(&self) -> Option<u16> {
        self.error.status_code()
    }
}

/// Builds the status error for a response the transport rejects
pub fn status_error(raw: RawResponse, status: u16) -> FetchError {
    let url = raw.url.clone();
    FetchError::with_raw(RequestError::Status { status, url }, raw)
}

/// Decodes a JSON body, keeping the response handle on failure
pub fn decode_body(bytes: &[u8], raw: &RawResponse) -> Result<serde_json::Value, FetchError> {
    serde_json::from_slice(bytes).map_err(|e| FetchError::with_raw(e, raw.clone()))
}

/// Extracts the `max-age` lifetime from a single `Cache-Control` value
///
/// The directive name is matched case-insensitively and whitespace around
/// `=` is tolerated. Returns `None` when the directive is missing or its
/// value is not a base-10 integer that fits in a `u64`.
///
/// # Examples
/// ```
/// use apiqueue::ttl_from_cache_control;
///
/// assert_eq!(ttl_from_cache_control("public, max-age=300"), Some(300));
/// assert_eq!(ttl_from_cache_control("no-store"), None);
/// ```
pub fn ttl_from_cache_control(value: &str) -> Option<u64> {
    value.split(',').find_map(|directive| {
        let (name, seconds) = directive.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case(MAX_AGE_DIRECTIVE) {
            return None;
        }
        let seconds = seconds.trim();
        if seconds.is_empty() || !seconds.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        seconds.parse().ok()
    })
}

/// Extracts the TTL from every `Cache-Control` header present, first match wins
pub fn ttl_from_headers(headers: &HeaderMap) -> Option<u64> {
    headers
        .get_all(CACHE_CONTROL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(ttl_from_cache_control)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportKind;
    use reqwest::header::HeaderValue;

    fn raw(status: Option<u16>) -> RawResponse {
        RawResponse {
            kind: TransportKind::Fetch,
            url: "https://api.example.com/v1/docs".to_string(),
            status,
            headers: HeaderMap::new(),
        }
    }

    #[test]
    fn test_ttl_public_max_age() {
        assert_eq!(ttl_from_cache_control("public, max-age=300"), Some(300));
    }

    #[test]
    fn test_ttl_only_directive() {
        assert_eq!(ttl_from_cache_control("max-age=0"), Some(0));
        assert_eq!(ttl_from_cache_control("max-age=31536000"), Some(31_536_000));
    }

    #[test]
    fn test_ttl_case_insensitive_directive_name() {
        assert_eq!(ttl_from_cache_control("Max-Age=60"), Some(60));
        assert_eq!(ttl_from_cache_control("private, MAX-AGE=5"), Some(5));
    }

    #[test]
    fn test_ttl_whitespace_around_equals() {
        assert_eq!(ttl_from_cache_control("max-age = 120"), Some(120));
        assert_eq!(ttl_from_cache_control("public,max-age=7 , must-revalidate"), Some(7));
    }

    #[test]
    fn test_ttl_missing_directive_is_unset() {
        assert_eq!(ttl_from_cache_control("no-cache, no-store"), None);
        assert_eq!(ttl_from_cache_control(""), None);
    }

    #[test]
    fn test_ttl_s_maxage_is_not_max_age() {
        assert_eq!(ttl_from_cache_control("s-maxage=600"), None);
        assert_eq!(ttl_from_cache_control("s-maxage=600, max-age=30"), Some(30));
    }

    #[test]
    fn test_ttl_rejects_non_digit_values() {
        assert_eq!(ttl_from_cache_control("max-age=-1"), None);
        assert_eq!(ttl_from_cache_control("max-age=abc"), None);
        assert_eq!(ttl_from_cache_control("max-age=\"60\""), None);
        assert_eq!(ttl_from_cache_control("max-age="), None);
    }

    #[test]
    fn test_ttl_overflow_is_unset() {
        assert_eq!(ttl_from_cache_control("max-age=99999999999999999999999"), None);
    }

    #[test]
    fn test_ttl_from_headers_absent() {
        assert_eq!(ttl_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn test_ttl_from_headers_scans_all_values() {
        let mut headers = HeaderMap::new();
        headers.append(CACHE_CONTROL, HeaderValue::from_static("public"));
        headers.append(CACHE_CONTROL, HeaderValue::from_static("max-age=42"));
        assert_eq!(ttl_from_headers(&headers), Some(42));
    }

    #[test]
    fn test_status_error_message_and_code() {
        let err = status_error(raw(Some(404)), 404);
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(
            err.to_string(),
            "Unexpected status code [404] on URL https://api.example.com/v1/docs"
        );
        assert!(err.raw.is_some());
    }

    #[test]
    fn test_rejected_and_timeout_have_no_status() {
        let rejected = FetchError::new(RequestError::Rejected {
            url: "https://api.example.com".to_string(),
        });
        assert_eq!(rejected.status_code(), None);
        assert_eq!(
            rejected.to_string(),
            "Unexpected status code on URL https://api.example.com"
        );

        let timeout = FetchError::new(RequestError::Timeout {
            url: "https://api.example.com".to_string(),
        });
        assert_eq!(timeout.status_code(), None);
        assert_eq!(timeout.to_string(), "Request timeout");
    }

    #[test]
    fn test_decode_body_valid() {
        let body = decode_body(br#"{"results": [1, 2]}"#, &raw(Some(200))).unwrap();
        assert_eq!(body["results"][1], 2);
    }

    #[test]
    fn test_decode_body_malformed_keeps_raw() {
        let err = decode_body(b"{not json", &raw(Some(200))).unwrap_err();
        assert!(matches!(err.error, RequestError::Decode(_)));
        assert_eq!(err.raw.as_ref().and_then(|r| r.status), Some(200));
        assert_eq!(err.status_code(), None);
    }
}
