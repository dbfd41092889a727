//! Expiration Policy Module
//!
//! Age window, jittered timestamps and staleness checks.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;
use tokio::time::Instant;
use tracing::trace;

use crate::cache::CacheEntry;
use crate::error::{CacheError, Result};

// == Random Source ==
/// Uniform random integers, used only to pick jitter.
pub trait RandomSource: Send + Sync {
    /// Returns a value in `[0, n)`. Callers never pass zero.
    fn below(&mut self, n: u64) -> u64;
}

impl RandomSource for StdRng {
    fn below(&mut self, n: u64) -> u64 {
        self.gen_range(0..n)
    }
}

// == Expiration Policy ==
/// The `[min_age, max_age]` window entries expire in.
///
/// A zero `max_age` disables expiration. When `min_age < max_age`, each new
/// timestamp is pushed back by a uniform jitter in `[0, max_age - min_age)`,
/// so entries expire spread across `[min_age, max_age)` after being set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpirationPolicy {
    max_age: Duration,
    min_age: Duration,
}

impl ExpirationPolicy {
    pub fn new(max_age: Duration, min_age: Duration) -> Result<Self> {
        check_bounds(min_age, max_age)?;
        Ok(Self { max_age, min_age })
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub fn min_age(&self) -> Duration {
        self.min_age
    }

    pub fn is_enabled(&self) -> bool {
        !self.max_age.is_zero()
    }

    /// Width of the jitter window; zero when jitter is disabled.
    pub fn jitter_window(&self) -> Duration {
        self.max_age.saturating_sub(self.min_age)
    }

    pub fn set_max_age(&mut self, max_age: Duration) -> Result<()> {
        check_bounds(self.min_age, max_age)?;
        self.max_age = max_age;
        Ok(())
    }

    pub fn set_min_age(&mut self, min_age: Duration) -> Result<()> {
        check_bounds(min_age, self.max_age)?;
        self.min_age = min_age;
        Ok(())
    }

    // == Timestamp ==
    /// The timestamp to store for an entry set at `now`.
    pub fn timestamp(&self, now: Instant, rng: &mut dyn RandomSource) -> Instant {
        let window = self.jitter_window();
        if window.is_zero() {
            return now;
        }

        let nanos = u64::try_from(window.as_nanos()).unwrap_or(u64::MAX);
        backdate(now, Duration::from_nanos(rng.below(nanos)))
    }

    pub fn is_expired<K, V>(&self, entry: &CacheEntry<K, V>, now: Instant) -> bool {
        entry.is_expired(self.max_age, now)
    }
}

/// `now - jitter`, or `now` when the monotonic clock has not been running
/// long enough to go that far back.
fn backdate(now: Instant, jitter: Duration) -> Instant {
    match now.checked_sub(jitter) {
        Some(timestamp) => timestamp,
        None => {
            trace!(?jitter, "Jitter exceeds clock range, timestamp not backdated");
            now
        }
    }
}

fn check_bounds(min_age: Duration, max_age: Duration) -> Result<()> {
    if min_age > max_age {
        return Err(CacheError::InvalidAgeBounds { min_age, max_age });
    }
    Ok(())
}
