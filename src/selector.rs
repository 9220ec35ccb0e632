//! Transport selection
//!
//! Picks the single transport a dispatcher will use, walking the variants in
//! preference order and falling back past any that is unavailable.

use std::sync::Arc;

use thiserror::Error;

use crate::transport::{
    CredentialedTransport, FetchTransport, LegacyTransport, Transport, TransportConfig,
    TransportKind,
};

/// Environment variable listing the transports available to the process
pub const TRANSPORTS_ENV: &str = "APIQUEUE_TRANSPORTS";

/// Fatal configuration errors raised while building a dispatcher
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No transport capability is enabled
    #[error("No request handler available (tried credentialed, legacy & fetch)")]
    NoTransport,

    /// Every enabled transport failed to build its HTTP client
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// The dispatcher was created outside a tokio runtime
    #[error("No tokio runtime available to drive requests")]
    NoRuntime,

    /// A transport list named something that is not a transport
    #[error("Invalid transport: '{0}'. Valid transports: credentialed, legacy, fetch")]
    InvalidTransport(String),
}

/// Which transport variants are usable in this process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Credential-carrying client available
    pub credentialed: bool,
    /// Status-blind cross-domain client available
    pub legacy: bool,
    /// Generic fetch-style client available
    pub fetch: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            credentialed: true,
            legacy: true,
            fetch: true,
        }
    }
}

impl Capabilities {
    /// No transport available
    pub fn none() -> Self {
        Self {
            credentialed: false,
            legacy: false,
            fetch: false,
        }
    }

    /// Exactly one transport available
    pub fn only(kind: TransportKind) -> Self {
        Self::none().with(kind, true)
    }

    /// Same capabilities with `kind` removed
    pub fn without(self, kind: TransportKind) -> Self {
        self.with(kind, false)
    }

    fn with(mut self, kind: TransportKind, enabled: bool) -> Self {
        match kind {
            TransportKind::Credentialed => self.credentialed = enabled,
            TransportKind::Legacy => self.legacy = enabled,
            TransportKind::Fetch => self.fetch = enabled,
        }
        self
    }

    /// Whether `kind` is available
    pub fn supports(&self, kind: TransportKind) -> bool {
        match kind {
            TransportKind::Credentialed => self.credentialed,
            TransportKind::Legacy => self.legacy,
            TransportKind::Fetch => self.fetch,
        }
    }

    /// Parses a comma-separated transport list such as `"legacy,fetch"`
    ///
    /// # Returns
    /// * `Ok(Capabilities)` with exactly the listed transports enabled
    /// * `Err(ConfigError::InvalidTransport)` for an unknown name
    pub fn from_list(list: &str) -> Result<Self, ConfigError> {
        list.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .try_fold(Self::none(), |caps, name| {
                TransportKind::from_str(name)
                    .map(|kind| caps.with(kind, true))
                    .ok_or_else(|| ConfigError::InvalidTransport(name.to_string()))
            })
    }

    /// Most preferred available transport
    pub fn preferred(&self) -> Option<TransportKind> {
        TransportKind::PREFERENCE
            .into_iter()
            .find(|kind| self.supports(*kind))
    }
}

/// Builds the transport for a single variant
pub fn build_transport(
    kind: TransportKind,
    config: &TransportConfig,
) -> Result<Arc<dyn Transport>, reqwest::Error> {
    let transport: Arc<dyn Transport> = match kind {
        TransportKind::Credentialed => Arc::new(CredentialedTransport::new(config)?),
        TransportKind::Legacy => Arc::new(LegacyTransport::new(config)?),
        TransportKind::Fetch => Arc::new(FetchTransport::new(config)?),
    };
    Ok(transport)
}

/// Selects the first usable transport in preference order
///
/// A variant whose client cannot be built is skipped in favour of the next
/// one. Fails with [`ConfigError::NoTransport`] when nothing is enabled, or
/// with the last client error when every enabled variant failed to build.
pub fn select_transport(
    capabilities: &Capabilities,
    config: &TransportConfig,
) -> Result<Arc<dyn Transport>, ConfigError> {
    let mut last_error = None;

    for kind in TransportKind::PREFERENCE {
        if !capabilities.supports(kind) {
            continue;
        }
        match build_transport(kind, config) {
            Ok(transport) => {
                tracing::info!(transport = %kind, "selected transport");
                return Ok(transport);
            }
            Err(e) => {
                tracing::warn!(transport = %kind, error = %e, "transport unavailable, falling back");
                last_error = Some(e);
            }
        }
    }

    Err(last_error.map_or(ConfigError::NoTransport, ConfigError::Client))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_default_all_enabled() {
        let caps = Capabilities::default();
        assert!(caps.credentialed);
        assert!(caps.legacy);
        assert!(caps.fetch);
        assert_eq!(caps.preferred(), Some(TransportKind::Credentialed));
    }

    #[test]
    fn test_preferred_falls_back_in_order() {
        let caps = Capabilities::default().without(TransportKind::Credentialed);
        assert_eq!(caps.preferred(), Some(TransportKind::Legacy));

        let caps = caps.without(TransportKind::Legacy);
        assert_eq!(caps.preferred(), Some(TransportKind::Fetch));

        let caps = caps.without(TransportKind::Fetch);
        assert_eq!(caps.preferred(), None);
    }

    #[test]
    fn test_only_enables_single_kind() {
        let caps = Capabilities::only(TransportKind::Fetch);
        assert!(!caps.supports(TransportKind::Credentialed));
        assert!(!caps.supports(TransportKind::Legacy));
        assert!(caps.supports(TransportKind::Fetch));
    }

    #[test]
    fn test_from_list_parses_names() {
        let caps = Capabilities::from_list("legacy, fetch").unwrap();
        assert_eq!(caps, Capabilities::default().without(TransportKind::Credentialed));
    }

    #[test]
    fn test_from_list_empty_is_none() {
        assert_eq!(Capabilities::from_list("").unwrap(), Capabilities::none());
        assert_eq!(Capabilities::from_list(" , ").unwrap(), Capabilities::none());
    }

    #[test]
    fn test_from_list_rejects_unknown_name() {
        let err = Capabilities::from_list("fetch,carrier-pigeon").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTransport(ref name) if name == "carrier-pigeon"));
        assert!(err.to_string().contains("Invalid transport"));
    }

    #[test]
    fn test_select_transport_prefers_credentialed() {
        let transport =
            select_transport(&Capabilities::default(), &TransportConfig::default()).unwrap();
        assert_eq!(transport.kind(), TransportKind::Credentialed);
    }

    #[test]
    fn test_select_transport_without_credentialed_uses_legacy() {
        let caps = Capabilities::default().without(TransportKind::Credentialed);
        let transport = select_transport(&caps, &TransportConfig::default()).unwrap();
        assert_eq!(transport.kind(), TransportKind::Legacy);
    }

    #[test]
    fn test_select_transport_fetch_only() {
        let caps = Capabilities::only(TransportKind::Fetch);
        let transport = select_transport(&caps, &TransportConfig::default()).unwrap();
        assert_eq!(transport.kind(), TransportKind::Fetch);
    }

    #[test]
    fn test_select_transport_none_is_fatal() {
        let result = select_transport(&Capabilities::none(), &TransportConfig::default());
        assert!(matches!(result, Err(ConfigError::NoTransport)));
    }
}
