//! Fetch run orchestration
//!
//! Sends every URL through one dispatcher at once and pairs each outcome with
//! the caller-owned cache: fresh entries skip the network, cacheable
//! responses are stored, and stale entries stand in when a request fails.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheManager;
use crate::dispatch::Dispatcher;
use crate::normalize::FetchError;

/// Where a reported body came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Fetched just now
    Network,
    /// Fresh cache entry, no request made
    Cache,
    /// Expired cache entry used because the request failed
    StaleCache,
}

/// A body obtained for one URL
#[derive(Debug, Clone, Serialize)]
pub struct Hit {
    /// Where the body came from
    pub source: Source,
    /// Remaining freshness in seconds, when known
    pub ttl: Option<u64>,
    /// JSON body
    pub body: Value,
}

/// Result for one requested URL
#[derive(Debug)]
pub struct Report {
    /// Requested URL
    pub url: String,
    /// Body or the error that prevented one
    pub result: Result<Hit, FetchError>,
}

/// One line of machine-readable output
#[derive(Debug, Serialize)]
pub struct ReportLine<'a> {
    pub url: &'a str,
    #[serde(flatten)]
    pub hit: &'a Hit,
}

/// Runs fetches for a set of URLs
#[derive(Debug, Clone)]
pub struct App {
    /// Queue every request goes through
    dispatcher: Dispatcher,
    /// Optional response cache
    cache: Option<CacheManager>,
}

impl App {
    /// Creates an App over a dispatcher and optional cache
    pub fn new(dispatcher: Dispatcher, cache: Option<CacheManager>) -> Self {
        Self { dispatcher, cache }
    }

    /// The dispatcher requests are queued on
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Fetches all URLs concurrently, reports in input order
    pub async fn fetch_all(&self, urls: &[String]) -> Vec<Report> {
        let fetches: Vec<_> = urls.iter().map(|url| self.fetch_one(url)).collect();
        futures::future::join_all(fetches).await
    }

    /// Fetches one URL
    ///
    /// # Behavior
    /// - Returns a fresh cache entry without making a request
    /// - Otherwise requests through the dispatcher
    /// - Stores the response when its TTL is positive
    /// - On failure, returns an expired cache entry if one exists
    pub async fn fetch_one(&self, url: &str) -> Report {
        if let Some(ref cache) = self.cache {
            if let Some(cached) = cache.read::<Value>(url) {
                if !cached.is_expired {
                    let remaining = (cached.expires_at - Utc::now()).num_seconds().max(0);
                    return Report {
                        url: url.to_string(),
                        result: Ok(Hit {
                            source: Source::Cache,
                            ttl: u64::try_from(remaining).ok(),
                            body: cached.data,
                        }),
                    };
                }
            }
        }

        let result = match self.dispatcher.request(url).await {
            Ok(fetched) => {
                if let (Some(cache), Some(ttl)) = (&self.cache, fetched.ttl) {
                    if ttl > 0 {
                        if let Err(e) = cache.write(url, &fetched.body, ttl) {
                            tracing::warn!(url, error = %e, "failed to write cache entry");
                        }
                    }
                }
                Ok(Hit {
                    source: Source::Network,
                    ttl: fetched.ttl,
                    body: fetched.body,
                })
            }
            Err(error) => match self.stale(url) {
                Some(body) => {
                    tracing::warn!(url, error = %error, "request failed, using stale cache entry");
                    Ok(Hit {
                        source: Source::StaleCache,
                        ttl: Some(0),
                        body,
                    })
                }
                None => Err(error),
            },
        };

        Report {
            url: url.to_string(),
            result,
        }
    }

    fn stale(&self, url: &str) -> Option<Value> {
        let cache = self.cache.as_ref()?;
        cache.read::<Value>(url).map(|cached| cached.data)
    }
}
