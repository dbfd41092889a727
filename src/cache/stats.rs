//! Cache Statistics Module
//!
//! Tracks sets, gets, hits, misses and evictions.

use serde::Serialize;

// == Stats ==
/// Point-in-time snapshot of cache statistics.
///
/// `capacity` and `count` are gauges; every other field is a counter that
/// only grows over the life of the cache. Use [`Stats::delta`] to report
/// counters as differences between two snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// Gauge, configured capacity
    pub capacity: u64,
    /// Gauge, number of entries in the cache
    pub count: u64,
    /// Counter, number of sets
    pub sets: u64,
    /// Counter, number of gets
    pub gets: u64,
    /// Counter, number of gets that found a fresh entry
    pub hits: u64,
    /// Counter, number of gets that found nothing or a stale entry
    pub misses: u64,
    /// Counter, number of entries evicted by the LRU policy
    pub evictions: u64,
}

impl Stats {
    // == Delta ==
    /// Counters as the difference since `previous`; gauges are kept as-is.
    pub fn delta(&self, previous: &Stats) -> Stats {
        Stats {
            capacity: self.capacity,
            count: self.count,
            sets: self.sets.saturating_sub(previous.sets),
            gets: self.gets.saturating_sub(previous.gets),
            hits: self.hits.saturating_sub(previous.hits),
            misses: self.misses.saturating_sub(previous.misses),
            evictions: self.evictions.saturating_sub(previous.evictions),
        }
    }

    // == Hit Rate ==
    /// Returns hits / gets, or 0.0 if no gets have been made.
    pub fn hit_rate(&self) -> f64 {
        if self.gets == 0 {
            0.0
        } else {
            self.hits as f64 / self.gets as f64
        }
    }
}

// == Counters ==
/// Monotonic counters, mutated under the cache's write lock.
#[derive(Debug, Clone, Default)]
pub(crate) struct Counters {
    sets: u64,
    gets: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl Counters {
    pub fn record_set(&mut self) {
        self.sets += 1;
    }

    pub fn record_get(&mut self) {
        self.gets += 1;
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn snapshot(&self, capacity: usize, count: usize) -> Stats {
        Stats {
            capacity: capacity as u64,
            count: count as u64,
            sets: self.sets,
            gets: self.gets,
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
        }
    }
}
