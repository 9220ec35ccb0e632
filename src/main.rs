//! apiqueue - fetch JSON from an API with a bounded number of requests in flight
//!
//! Every URL given on the command line is queued on one dispatcher; results
//! are printed as JSON lines on stdout and failures on stderr.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use apiqueue::app::{App, ReportLine};
use apiqueue::cache::CacheManager;
use apiqueue::cli::{Cli, StartupConfig};
use apiqueue::Dispatcher;

/// Exit code when configuration is unusable
const EXIT_CONFIG: u8 = 2;

/// Sets up stderr logging; `RUST_LOG` overrides the default level
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "apiqueue=debug" } else { "apiqueue=warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Resolves the cache for this run, if caching was requested
fn open_cache(config: &StartupConfig) -> Option<CacheManager> {
    if !config.use_cache {
        return None;
    }
    let cache = match &config.cache_dir {
        Some(dir) => Some(CacheManager::with_dir(dir.clone())),
        None => CacheManager::new(),
    };
    if cache.is_none() {
        tracing::warn!("no cache directory available, caching disabled");
    }
    cache
}

/// Fetches every URL and prints the results
///
/// # Returns
/// * `Ok(true)` if every URL produced a body
/// * `Ok(false)` if at least one URL failed
/// * `Err` if output could not be serialized
async fn run(app: &App, urls: &[String]) -> Result<bool, serde_json::Error> {
    let mut all_ok = true;

    for report in app.fetch_all(urls).await {
        match &report.result {
            Ok(hit) => {
                let line = ReportLine {
                    url: &report.url,
                    hit,
                };
                println!("{}", serde_json::to_string(&line)?);
            }
            Err(e) => {
                all_ok = false;
                eprintln!("error: {e}");
            }
        }
    }

    Ok(all_ok)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match StartupConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    init_tracing(config.verbose);

    let dispatcher = match Dispatcher::from_capabilities(&config.capabilities, &config.transport) {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    tracing::debug!(
        transport = %dispatcher.transport_kind(),
        urls = config.urls.len(),
        "starting fetch run"
    );

    let app = App::new(dispatcher, open_cache(&config));

    match run(&app, &config.urls).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
