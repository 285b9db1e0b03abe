//! Offline cache for nearloo.
//!
//! Versioned response caches on SQLite with a routing policy per request kind:
//! network-first for page loads, stale-while-revalidate for search and directory calls,
//! cache-first for same-origin assets.

pub mod error;
pub mod fetch;
pub mod manager;
pub mod policy;
pub mod route;
pub mod store;
pub mod types;

pub use error::OfflineError;
pub use fetch::{Fetcher, HttpFetcher};
pub use manager::CacheManager;
pub use route::{Route, Router};
pub use store::CacheStore;
pub use types::{cache_key, CacheRequest, CachedResponse};
