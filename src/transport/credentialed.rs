//! Credential-carrying transport
//!
//! Keeps a cookie store across requests and accepts only `200 OK`.

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};

use super::{Fetched, RawResponse, Transport, TransportConfig, TransportKind, JSON_MEDIA_TYPE};
use crate::normalize::{decode_body, status_error, ttl_from_headers, FetchError};

/// Transport that sends stored credentials and requires an exact 200
#[derive(Debug, Clone)]
pub struct CredentialedTransport {
    client: Client,
}

impl CredentialedTransport {
    /// Builds the transport with a cookie-enabled client
    pub fn new(config: &TransportConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .cookie_store(true)
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

        let raw = RawResponse::observe(TransportKind::Credentialed, &url, &response);
        let status = response.status();
        if status != StatusCode::OK {
            return Err(status_error(raw, status.as_u16()));
        }

        let ttl = ttl_from_headers(&raw.headers);
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return Err(FetchError::with_raw(e, raw)),
        };
        let body = decode_body(&bytes, &raw)?;

        Ok(Fetched { body, raw, ttl })
    }
}

impl Transport for CredentialedTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Credentialed
    }

    fn perform(&self, url: String) -> BoxFuture<'static, Result<Fetched, FetchError>> {
        Self::get(self.client.clone(), url).boxed()
    }
}
