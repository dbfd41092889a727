//! Cache Entry Module
//!
//! Defines the structure for individual cache entries.

use std::time::Duration;

use tokio::time::Instant;

// == Cache Entry ==
/// A single cached association.
///
/// The timestamp is the (possibly jitter-adjusted) moment the entry was
/// inserted or last set. Reads never refresh it.
#[derive(Debug, Clone)]
pub struct CacheEntry<K, V> {
    /// The key, duplicated from the index so removals can report it
    pub key: K,
    /// The stored value
    pub value: V,
    /// Creation or refresh time
    pub timestamp: Instant,
}

impl<K, V> CacheEntry<K, V> {
    // == Constructor ==
    pub fn new(key: K, value: V, timestamp: Instant) -> Self {
        Self {
            key,
            value,
            timestamp,
        }
    }

    // == Refresh ==
    /// Replaces the value and restarts the entry's age.
    pub fn refresh(&mut self, value: V, timestamp: Instant) {
        self.value = value;
        self.timestamp = timestamp;
    }

    // == Age ==
    /// Time elapsed since the entry's timestamp, as seen at `now`.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.timestamp)
    }

    // == Is Expired ==
    /// Checks if the entry is stale.
    ///
    /// A zero `max_age` disables expiration. Otherwise the entry is expired
    /// once its age is strictly greater than `max_age`.
    pub fn is_expired(&self, max_age: Duration, now: Instant) -> bool {
        !max_age.is_zero() && self.age(now) > max_age
    }

    pub fn into_pair(self) -> (K, V) {
        (self.key, self.value)
    }
}
