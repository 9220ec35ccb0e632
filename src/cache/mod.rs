//! Cache module for storing fetched responses to disk
//!
//! The dispatcher never caches; it only reports a TTL. This cache belongs to
//! the caller: it persists response bodies keyed by URL with an expiry taken
//! from that TTL, and returns expired entries flagged with `is_expired` so
//! stale data can stand in when a request fails.

mod manager;

pub use manager::{CacheManager, CachedData};
