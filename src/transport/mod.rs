//! HTTP transports
//!
//! A transport performs exactly one GET against a URL and yields either a
//! decoded JSON body with its metadata or a classified failure. Three
//! interchangeable variants exist; a dispatcher uses exactly one of them.

pub mod credentialed;
pub mod fetch;
pub mod legacy;

pub use credentialed::CredentialedTransport;
pub use fetch::FetchTransport;
pub use legacy::LegacyTransport;

use std::fmt;
use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::header::HeaderMap;

use crate::normalize::FetchError;

/// Media type requested from the API
pub(crate) const JSON_MEDIA_TYPE: &str = "application/json";

/// Default per-request timeout
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Identifies a transport variant, listed in preference order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Credential-carrying, cookie-aware client
    Credentialed,
    /// Status-blind cross-domain style client
    Legacy,
    /// Generic fetch-style client
    Fetch,
}

impl TransportKind {
    /// All variants, most preferred first
    pub const PREFERENCE: [TransportKind; 3] = [
        TransportKind::Credentialed,
        TransportKind::Legacy,
        TransportKind::Fetch,
    ];

    /// Short name used on the command line and in logs
    pub fn name(&self) -> &'static str {
        match self {
            TransportKind::Credentialed => "credentialed",
            TransportKind::Legacy => "legacy",
            TransportKind::Fetch => "fetch",
        }
    }

    /// Parses a transport name (case-insensitive, with a few aliases)
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<TransportKind> {
        match s.to_lowercase().trim() {
            "credentialed" | "xhr" => Some(TransportKind::Credentialed),
            "legacy" | "xdr" => Some(TransportKind::Legacy),
            "fetch" => Some(TransportKind::Fetch),
            _ => None,
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Settings shared by every transport variant
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Upper bound on a single request, connect through body
    pub timeout: Duration,
    /// `User-Agent` sent by the fetch transport
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: concat!("apiqueue/", env!("CARGO_PKG_VERSION"), " rust").to_string(),
        }
    }
}

/// Transport-specific view of the response that produced a result
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// Transport that performed the request
    pub kind: TransportKind,
    /// Requested URL
    pub url: String,
    /// HTTP status, when the transport can observe it
    pub status: Option<u16>,
    /// Response headers visible to the transport
    pub headers: HeaderMap,
}

impl RawResponse {
    /// Captures status and headers from a reqwest response
    pub(crate) fn observe(kind: TransportKind, url: &str, response: &reqwest::Response) -> Self {
        Self {
            kind,
            url: url.to_string(),
            status: Some(response.status().as_u16()),
            headers: response.headers().clone(),
        }
    }
}

/// A successfully decoded response
#[derive(Debug, Clone)]
pub struct Fetched {
    /// Decoded JSON body
    pub body: serde_json::Value,
    /// Response metadata
    pub raw: RawResponse,
    /// Freshness lifetime in seconds
    ///
    /// `Some(0)` means the response must not be cached; `None` means the
    /// server gave no freshness information.
    pub ttl: Option<u64>,
}

/// A mechanism able to perform one JSON GET request
///
/// The returned future owns everything it needs so it can be spawned.
pub trait Transport: Send + Sync {
    /// Which variant this is
    fn kind(&self) -> TransportKind;

    /// Performs a GET against `url`
    fn perform(&self, url: String) -> BoxFuture<'static, Result<Fetched, FetchError>>;
}
