//! Command-line interface parsing for apiqueue
//!
//! Handles parsing of CLI arguments using clap and turns them into the
//! transport capabilities, transport settings and cache settings the fetch
//! run starts with.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::selector::{Capabilities, ConfigError};
use crate::transport::{TransportConfig, TransportKind};

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The specified transport name is not recognized
    #[error("Invalid transport: '{0}'. Valid transports: credentialed, legacy, fetch")]
    InvalidTransport(String),

    /// The transport list from the environment could not be parsed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A zero timeout would fail every request
    #[error("Timeout must be at least one second")]
    ZeroTimeout,
}

/// apiqueue - fetch JSON from an API with a bounded number of requests in flight
#[derive(Parser, Debug)]
#[command(name = "apiqueue")]
#[command(about = "Fetch JSON from an API with at most 20 requests in flight")]
#[command(version)]
pub struct Cli {
    /// URLs to fetch; one JSON line is printed per URL
    #[arg(value_name = "URL", required = true)]
    pub urls: Vec<String>,

    /// Use only this transport (credentialed, legacy, fetch)
    #[arg(long, value_name = "KIND")]
    pub transport: Option<String>,

    /// Treat a transport as unavailable; may be repeated
    #[arg(long, value_name = "KIND")]
    pub disable: Vec<String>,

    /// Comma-separated list of available transports
    #[arg(long, env = "APIQUEUE_TRANSPORTS", value_name = "LIST")]
    pub transports: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub timeout: u64,

    /// Serve fresh responses from the on-disk cache and store cacheable ones
    #[arg(long)]
    pub cache: bool,

    /// Cache directory (defaults to the platform cache dir)
    #[arg(long, value_name = "DIR", requires = "cache")]
    pub cache_dir: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// Configuration derived from CLI arguments for a fetch run
#[derive(Debug, Clone)]
pub struct StartupConfig {
    /// URLs to fetch, in submission order
    pub urls: Vec<String>,
    /// Transports the selector may choose from
    pub capabilities: Capabilities,
    /// Settings applied to the selected transport
    pub transport: TransportConfig,
    /// Whether to consult and populate the cache
    pub use_cache: bool,
    /// Cache directory override
    pub cache_dir: Option<PathBuf>,
    /// Whether debug logging is enabled
    pub verbose: bool,
}

/// Parses a transport name argument
///
/// # Returns
/// * `Ok(TransportKind)` if the string names a transport
/// * `Err(CliError::InvalidTransport)` if it doesn't
pub fn parse_transport_arg(s: &str) -> Result<TransportKind, CliError> {
    TransportKind::from_str(s).ok_or_else(|| CliError::InvalidTransport(s.to_string()))
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// Capabilities start from `--transports`/`APIQUEUE_TRANSPORTS` (all
    /// transports when unset); `--transport` then narrows them to one, and
    /// each `--disable` removes one.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let mut capabilities = match &cli.transports {
            Some(list) => Capabilities::from_list(list)?,
            None => Capabilities::default(),
        };

        if let Some(name) = &cli.transport {
            capabilities = Capabilities::only(parse_transport_arg(name)?);
        }

        for name in &cli.disable {
            capabilities = capabilities.without(parse_transport_arg(name)?);
        }

        if cli.timeout == 0 {
            return Err(CliError::ZeroTimeout);
        }

        Ok(StartupConfig {
            urls: cli.urls.clone(),
            capabilities,
            transport: TransportConfig {
                timeout: Duration::from_secs(cli.timeout),
                ..TransportConfig::default()
            },
            use_cache: cli.cache,
            cache_dir: cli.cache_dir.clone(),
            verbose: cli.verbose,
        })
    }
}
