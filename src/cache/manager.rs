//! Cache manager for persisting fetched responses to disk
//!
//! Provides a `CacheManager` that stores serializable data to JSON files with
//! expiry timestamps derived from a response TTL in seconds.

use chrono::{DateTime, Duration, Utc};
use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Longest file stem used for a cache key
const MAX_KEY_LEN: usize = 120;

/// TTLs beyond this are clamped (100 years)
const MAX_TTL_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Wrapper struct for cached data stored on disk
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    /// URL the data was fetched from
    url: String,
    /// The cached data
    data: T,
    /// When the data was cached
    cached_at: DateTime<Utc>,
    /// When the cache entry expires
    expires_at: DateTime<Utc>,
}

/// Result of reading from cache, including metadata about cache freshness
#[derive(Debug)]
pub struct CachedData<T> {
    /// The cached data
    pub data: T,
    /// When the data was originally cached
    pub cached_at: DateTime<Utc>,
    /// When the data stops being fresh
    pub expires_at: DateTime<Utc>,
    /// Whether the cache entry has expired
    pub is_expired: bool,
}

/// Manages reading and writing cached responses to disk
///
/// Entries live as JSON files in an XDG-compliant cache directory
/// (`~/.cache/apiqueue/` on Linux), one per URL. Expired entries are still
/// returned (with `is_expired = true`) so callers can fall back to stale
/// data when a request fails.
#[derive(Debug, Clone)]
pub struct CacheManager {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
}

impl CacheManager {
    /// Creates a new CacheManager using the XDG-compliant cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "apiqueue")?;
        let cache_dir = project_dirs.cache_dir().to_path_buf();
        Some(Self { cache_dir })
    }

    /// Creates a new CacheManager with a custom cache directory
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Directory holding the cache files
    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Maps a URL to a filesystem-safe key
    ///
    /// Every character outside `[A-Za-z0-9.-]` becomes `_`, and the result
    /// is truncated. The full URL is stored in the entry and checked on read,
    /// so colliding keys never return the wrong response.
    pub fn cache_key(url: &str) -> String {
        let key: String = url
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .take(MAX_KEY_LEN)
            .collect();
        key
    }

    /// Returns the path to the cache file for the given URL
    fn cache_path(&self, url: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", Self::cache_key(url)))
    }

    /// Ensures the cache directory exists
    fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.cache_dir)
    }

    /// Writes data to the cache with a TTL (time-to-live) in seconds
    ///
    /// # Arguments
    /// * `url` - URL the data was fetched from
    /// * `data` - The data to cache (must implement Serialize)
    /// * `ttl_secs` - How long the entry should be considered fresh
    ///
    /// # Returns
    /// * `Ok(())` on success
    /// * `Err` if directory creation or file writing fails
    pub fn write<T: Serialize>(&self, url: &str, data: &T, ttl_secs: u64) -> std::io::Result<()> {
        self.ensure_dir()?;

        let now = Utc::now();
        let entry = CacheEntry {
            url: url.to_string(),
            data,
            cached_at: now,
            expires_at: now + Duration::seconds(ttl_secs.min(MAX_TTL_SECS) as i64),
        };

        let json = serde_json::to_string_pretty(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        fs::write(self.cache_path(url), json)
    }

    /// Reads data from the cache
    ///
    /// Returns `None` if no entry exists for the URL or it cannot be parsed.
    /// Returns `Some(CachedData)` with `is_expired = true` if the entry exists
    /// but has expired.
    pub fn read<T: DeserializeOwned>(&self, url: &str) -> Option<CachedData<T>> {
        let content = fs::read_to_string(self.cache_path(url)).ok()?;
        let entry: CacheEntry<T> = serde_json::from_str(&content).ok()?;
        if entry.url != url {
            return None;
        }

        let is_expired = Utc::now() > entry.expires_at;

        Some(CachedData {
            data: entry.data,
            cached_at: entry.cached_at,
            expires_at: entry.expires_at,
            is_expired,
        })
    }
}
