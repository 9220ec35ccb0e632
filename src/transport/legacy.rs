//! Status-blind cross-domain transport
//!
//! Only load, error and timeout outcomes are observable: no status code and
//! no response headers. Responses are therefore never cacheable and always
//! report a TTL of zero.

use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::header::HeaderMap;
use reqwest::Client;

use super::{Fetched, RawResponse, Transport, TransportConfig, TransportKind};
use crate::normalize::{decode_body, FetchError, RequestError};

/// Keep-alive probe interval for idle connections
const KEEPALIVE_INTERVAL_SECS: u64 = 15;

/// Transport reporting only load/error/timeout
#[derive(Debug, Clone)]
pub struct LegacyTransport {
    client: Client,
}

impl LegacyTransport {
    /// Builds the transport
    ///
    /// Idle pooled connections are kept alive so slow long-poll responses
    /// are not dropped between progress events.
    pub fn new(config: &TransportConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .tcp_keepalive(Duration::from_secs(KEEPALIVE_INTERVAL_SECS))
            .pool_idle_timeout(None)
            .build()?;
        Ok(Self { client })
    }

    /// Creates the transport around an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn get(client: Client, url: String) -> Result<Fetched, FetchError> {
        let response = match client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => return Err(FetchError::new(classify(e, &url))),
        };

        let raw = RawResponse {
            kind: TransportKind::Legacy,
            url: url.clone(),
            status: None,
            headers: HeaderMap::new(),
        };

        if !response.status().is_success() {
            return Err(FetchError::with_raw(RequestError::Rejected { url }, raw));
        }

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return Err(FetchError::with_raw(classify(e, &url), raw)),
        };
        let body = decode_body(&bytes, &raw)?;

        Ok(Fetched {
            body,
            raw,
            ttl: Some(0),
        })
    }
}

/// Maps a client failure onto the error/timeout signals this transport exposes
fn classify(error: reqwest::Error, url: &str) -> RequestError {
    let url = url.to_string();
    if error.is_timeout() {
        RequestError::Timeout { url }
    } else {
        RequestError::Rejected { url }
    }
}

impl Transport for LegacyTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Legacy
    }

    fn perform(&self, url: String) -> BoxFuture<'static, Result<Fetched, FetchError>> {
        Self::get(self.client.clone(), url).boxed()
    }
}
