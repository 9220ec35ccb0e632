//! Generic fetch-style transport

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::header::ACCEPT;
use reqwest::Client;

use super::{Fetched, RawResponse, Transport, TransportConfig, TransportKind, JSON_MEDIA_TYPE};
use crate::normalize::{decode_body, status_error, ttl_from_headers, FetchError};

/// Transport accepting any 2xx and identifying itself with a user agent
#[derive(Debug, Clone)]
pub struct FetchTransport {
    client: Client,
}

impl FetchTransport {
    /// Builds the transport
    pub fn new(config: &TransportConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Creates the transport around an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn get(client: Client, url: String) -> Result<Fetched, FetchError> {
        let response = client
            .get(&url)
            .header(ACCEPT, JSON_MEDIA_TYPE)
            .send()
            .await
            .map_err(FetchError::new)?;

        let raw = RawResponse::observe(TransportKind::Fetch, &url, &response);
        let status = response.status();
        // Classified before the body is read
        if !status.is_success() {
            return Err(status_error(raw, status.as_u16()));
        }

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return Err(FetchError::with_raw(e, raw)),
        };
        let body = decode_body(&bytes, &raw)?;
        let ttl = ttl_from_headers(&raw.headers);

        Ok(Fetched { body, raw, ttl })
    }
}

impl Transport for FetchTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Fetch
    }

    fn perform(&self, url: String) -> BoxFuture<'static, Result<Fetched, FetchError>> {
        Self::get(self.client.clone(), url).boxed()
    }
}
