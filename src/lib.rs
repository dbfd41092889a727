//! agecache - A thread-safe in-memory LRU cache with jittered TTL expiration
//!
//! Entries are evicted least-recently-used first once the cache is full, and
//! optionally expire after a configurable age, either when read (passive) or
//! through a background sweeper (active).

pub mod cache;
pub mod config;
pub mod error;
mod tasks;

pub use cache::{Cache, RandomSource, Stats, WeakCache};
pub use config::{Callback, Config, ExpirationMode};
pub use error::{CacheError, Result};
