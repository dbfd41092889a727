//! Cache Module
//!
//! Fixed-capacity LRU cache with jittered TTL expiration.

mod entry;
mod expiry;
mod lru;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::CacheEntry;
pub use expiry::{ExpirationPolicy, RandomSource};
pub use lru::{LruIndex, OldestFirst};
pub use stats::Stats;
pub use store::{Cache, WeakCache};

pub(crate) use stats::Counters;
