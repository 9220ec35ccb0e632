//! apiqueue library
//!
//! Issues JSON GET requests with at most [`MAX_CONCURRENCY`] in flight,
//! through one transport picked from a preference-ordered set, and
//! normalizes every outcome into a body with a cache TTL or a classified
//! error.

pub mod app;
pub mod cache;
pub mod cli;
pub mod dispatch;
pub mod normalize;
pub mod selector;
pub mod transport;

pub use dispatch::{Completion, Dispatcher, Outcome, MAX_CONCURRENCY};
pub use normalize::{ttl_from_cache_control, ttl_from_headers, FetchError, RequestError};
pub use selector::{select_transport, Capabilities, ConfigError};
pub use transport::{Fetched, RawResponse, Transport, TransportConfig, TransportKind};
