//! Cache Store Module
//!
//! Main cache engine combining the LRU index with TTL expiration, statistics
//! and the optional background sweeper.

use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::cache::{CacheEntry, Counters, ExpirationPolicy, LruIndex, RandomSource, Stats};
use crate::config::{Callback, Config, ExpirationMode};
use crate::error::{CacheError, Result};
use crate::tasks::{Sweep, Sweeper};

// == Notices ==
/// Callback invocations collected under the lock and run after releasing it.
struct Notices<K, V> {
    pending: Vec<(Callback<K, V>, K, V)>,
}

impl<K, V> Notices<K, V> {
    fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    fn push(&mut self, callback: &Option<Callback<K, V>>, entry: CacheEntry<K, V>) {
        if let Some(callback) = callback {
            let (key, value) = entry.into_pair();
            self.pending.push((Arc::clone(callback), key, value));
        }
    }

    fn dispatch(self) {
        for (callback, key, value) in self.pending {
            callback(key, value);
        }
    }
}

// == State ==
/// Everything guarded by the cache lock.
struct State<K, V> {
    entries: LruIndex<K, V>,
    capacity: usize,
    policy: ExpirationPolicy,
    counters: Counters,
    rng: Box<dyn RandomSource>,
    on_eviction: Option<Callback<K, V>>,
    on_expiration: Option<Callback<K, V>>,
}

impl<K, V> State<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn set(&mut self, key: K, value: V, notices: &mut Notices<K, V>) -> bool {
        self.counters.record_set();
        let timestamp = self.policy.timestamp(Instant::now(), self.rng.as_mut());

        if let Some(entry) = self.entries.touch(&key) {
            entry.refresh(value, timestamp);
            return false;
        }

        self.entries.push_front(CacheEntry::new(key, value, timestamp));

        let evict = self.entries.len() > self.capacity;
        if evict {
            self.evict_oldest(notices);
        }
        evict
    }

    fn get(&mut self, key: &K, notices: &mut Notices<K, V>) -> Option<V> {
        self.counters.record_get();

        let expired = match self.entries.peek(key) {
            Some(entry) => self.policy.is_expired(entry, Instant::now()),
            None => {
                self.counters.record_miss();
                return None;
            }
        };

        if expired {
            if let Some(entry) = self.entries.remove(key) {
                trace!("Expired entry on access");
                notices.push(&self.on_expiration, entry);
            }
            self.counters.record_miss();
            return None;
        }

        self.counters.record_hit();
        self.entries.touch(key).map(|entry| entry.value.clone())
    }

    fn evict_oldest(&mut self, notices: &mut Notices<K, V>) -> bool {
        let Some(entry) = self.entries.pop_back() else {
            return false;
        };

        self.counters.record_eviction();
        trace!("Evicted least recently used entry");
        notices.push(&self.on_eviction, entry);
        true
    }

    fn resize(&mut self, capacity: usize, notices: &mut Notices<K, V>) -> usize {
        self.capacity = capacity;

        let mut evicted = 0;
        while self.entries.len() > capacity && self.evict_oldest(notices) {
            evicted += 1;
        }
        evicted
    }

    fn expire_stale(&mut self, notices: &mut Notices<K, V>) -> usize {
        if !self.policy.is_enabled() {
            return 0;
        }

        let now = Instant::now();
        let stale: Vec<K> = self
            .entries
            .iter_oldest_first()
            .filter(|entry| self.policy.is_expired(entry, now))
            .map(|entry| entry.key.clone())
            .collect();

        for key in &stale {
            if let Some(entry) = self.entries.remove(key) {
                notices.push(&self.on_expiration, entry);
            }
        }
        stale.len()
    }

    fn stats(&self) -> Stats {
        self.counters.snapshot(self.capacity, self.entries.len())
    }
}

struct Shared<K, V> {
    state: RwLock<State<K, V>>,
    sweeper: Mutex<Option<Sweeper>>,
}

impl<K, V> Shared<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Runs `op` under the write lock, then fires the callbacks it queued.
    fn mutate<T>(&self, op: impl FnOnce(&mut State<K, V>, &mut Notices<K, V>) -> T) -> T {
        let mut notices = Notices::new();
        let result = {
            let mut state = self.state.write();
            op(&mut *state, &mut notices)
        };
        notices.dispatch();
        result
    }
}

impl<K, V> Sweep for Shared<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn sweep(&self) -> usize {
        self.mutate(|state, notices| state.expire_stale(notices))
    }
}

// == Cache ==
/// Thread-safe fixed-capacity LRU cache with optional jittered expiration.
///
/// `Cache` is a handle: clones share the same entries. The background
/// sweeper, if any, stops once the last handle is dropped.
///
/// Eviction and expiration callbacks run after the cache lock has been
/// released, so they may call back into the cache. A callback that does so
/// must capture a [`WeakCache`] from [`Cache::downgrade`]: a strong `Cache`
/// stored in a callback keeps the cache, and its sweeper, alive forever.
pub struct Cache<K, V> {
    shared: Arc<Shared<K, V>>,
}

impl<K, V> Clone for Cache<K, V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K, V> Cache<K, V> {
    /// Creates a non-owning handle to this cache.
    pub fn downgrade(&self) -> WeakCache<K, V> {
        WeakCache {
            shared: Arc::downgrade(&self.shared),
        }
    }
}

// == Weak Cache ==
/// Non-owning handle to a [`Cache`], for callbacks that read or write the
/// cache they are installed on.
pub struct WeakCache<K, V> {
    shared: Weak<Shared<K, V>>,
}

impl<K, V> WeakCache<K, V> {
    /// Returns a strong handle, or `None` once every `Cache` has been dropped.
    pub fn upgrade(&self) -> Option<Cache<K, V>> {
        self.shared.upgrade().map(|shared| Cache { shared })
    }
}

impl<K, V> Clone for WeakCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
        }
    }
}

impl<K, V> fmt::Debug for WeakCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakCache")
            .field("alive", &(self.shared.strong_count() > 0))
            .finish()
    }
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache from a validated configuration, seeding jitter from
    /// system entropy.
    ///
    /// Active expiration with a non-zero interval spawns the sweeper on the
    /// current tokio runtime and fails with [`CacheError::NoRuntime`] outside
    /// of one. The sweeper lives on that runtime: if the runtime shuts down
    /// first, the sweeper ends silently and the cache falls back to passive
    /// expiration on `get` (see [`Cache::is_sweeping`]).
    ///
    /// The sweeper runs expiration callbacks on a runtime worker thread, so
    /// they must not block.
    pub fn new(config: Config<K, V>) -> Result<Self> {
        Self::with_random(config, StdRng::from_entropy())
    }

    /// Creates a cache that draws jitter from `rng`.
    pub fn with_random<R>(config: Config<K, V>, rng: R) -> Result<Self>
    where
        R: RandomSource + 'static,
    {
        config.validate()?;
        let policy = ExpirationPolicy::new(config.max_age, config.effective_min_age())?;
        let interval = config.effective_interval();

        let state = State {
            entries: LruIndex::new(),
            capacity: config.capacity,
            policy,
            counters: Counters::default(),
            rng: Box::new(rng),
            on_eviction: config.on_eviction,
            on_expiration: config.on_expiration,
        };
        let shared = Arc::new(Shared {
            state: RwLock::new(state),
            sweeper: Mutex::new(None),
        });

        if config.expiration == ExpirationMode::Active {
            if interval.is_zero() {
                debug!("Active expiration without an interval, sweeper not started");
            } else {
                let sweeper = Sweeper::spawn(Arc::downgrade(&shared), interval)?;
                *shared.sweeper.lock() = Some(sweeper);
            }
        }

        debug!(
            capacity = config.capacity,
            max_age_ms = policy.max_age().as_millis() as u64,
            min_age_ms = policy.min_age().as_millis() as u64,
            expiration = ?config.expiration,
            "Cache initialized"
        );

        Ok(Self { shared })
    }

    // == Set ==
    /// Stores a value, making it the most recently used entry.
    ///
    /// Setting an existing key replaces the value and restarts its age.
    /// Returns true if the insert pushed the cache over capacity and the
    /// least recently used entry was evicted.
    pub fn set(&self, key: K, value: V) -> bool {
        self.shared.mutate(|state, notices| state.set(key, value, notices))
    }

    // == Get ==
    /// Retrieves a value, making it the most recently used entry.
    ///
    /// A stale entry is removed, reported to the expiration callback and
    /// counted as a miss.
    pub fn get(&self, key: &K) -> Option<V> {
        self.shared.mutate(|state, notices| state.get(key, notices))
    }

    // == Has ==
    /// Checks for a key without touching its recency or expiring it.
    pub fn has(&self, key: &K) -> bool {
        self.shared.state.read().entries.contains(key)
    }

    // == Peek ==
    /// Retrieves a value without touching its recency or expiring it.
    pub fn peek(&self, key: &K) -> Option<V> {
        self.shared
            .state
            .read()
            .entries
            .peek(key)
            .map(|entry| entry.value.clone())
    }

    // == Remove ==
    /// Removes a key, returning whether it was present.
    ///
    /// Explicit removal fires no callback.
    pub fn remove(&self, key: &K) -> bool {
        self.shared.state.write().entries.remove(key).is_some()
    }

    // == Evict Oldest ==
    /// Evicts the least recently used entry, returning whether one existed.
    pub fn evict_oldest(&self) -> bool {
        self.shared.mutate(|state, notices| state.evict_oldest(notices))
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.shared.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.state.read().entries.is_empty()
    }

    // == Clear ==
    /// Removes every entry without firing callbacks.
    pub fn clear(&self) {
        self.shared.state.write().entries.clear();
    }

    // == Keys ==
    /// All keys, in no particular order.
    pub fn keys(&self) -> Vec<K> {
        self.shared.state.read().entries.keys().cloned().collect()
    }

    /// All keys from least to most recently used.
    pub fn ordered_keys(&self) -> Vec<K> {
        self.shared
            .state
            .read()
            .entries
            .iter_oldest_first()
            .map(|entry| entry.key.clone())
            .collect()
    }

    // == Resize ==
    /// Changes the capacity, evicting least recently used entries until the
    /// cache fits. Returns the number of entries evicted.
    pub fn resize(&self, capacity: usize) -> Result<usize> {
        if capacity == 0 {
            return Err(CacheError::InvalidCapacity(capacity));
        }

        let evicted = self
            .shared
            .mutate(|state, notices| state.resize(capacity, notices));
        debug!(capacity, evicted, "Cache resized");
        Ok(evicted)
    }

    pub fn capacity(&self) -> usize {
        self.shared.state.read().capacity
    }

    // == Age Window ==
    /// Sets the maximum age. Zero disables expiration. Fails if it would fall
    /// below the current minimum age.
    pub fn set_max_age(&self, max_age: Duration) -> Result<()> {
        self.shared.state.write().policy.set_max_age(max_age)?;
        debug!(max_age_ms = max_age.as_millis() as u64, "Max age updated");
        Ok(())
    }

    /// Sets the minimum age. Equal to the maximum age disables jitter. Fails
    /// if it would exceed the current maximum age.
    pub fn set_min_age(&self, min_age: Duration) -> Result<()> {
        self.shared.state.write().policy.set_min_age(min_age)?;
        debug!(min_age_ms = min_age.as_millis() as u64, "Min age updated");
        Ok(())
    }

    pub fn max_age(&self) -> Duration {
        self.shared.state.read().policy.max_age()
    }

    pub fn min_age(&self) -> Duration {
        self.shared.state.read().policy.min_age()
    }

    // == Callbacks ==
    pub fn set_on_eviction(&self, callback: Option<Callback<K, V>>) {
        self.shared.state.write().on_eviction = callback;
    }

    pub fn set_on_expiration(&self, callback: Option<Callback<K, V>>) {
        self.shared.state.write().on_expiration = callback;
    }

    // == Stats ==
    pub fn stats(&self) -> Stats {
        self.shared.state.read().stats()
    }

    // == Expiration Sweep ==
    /// Removes every stale entry, firing the expiration callback for each.
    ///
    /// This is the pass the background sweeper runs. Returns the number of
    /// entries removed.
    pub fn expire_stale(&self) -> usize {
        self.shared.sweep()
    }

    /// Stops the background sweeper. Returns false if none was running.
    pub fn stop_sweeper(&self) -> bool {
        match self.shared.sweeper.lock().take() {
            Some(sweeper) => {
                sweeper.stop();
                debug!("Expiration sweeper stopped");
                true
            }
            None => false,
        }
    }

    /// Whether a background sweeper is still running. False after
    /// `stop_sweeper` or once the hosting runtime has shut down.
    pub fn is_sweeping(&self) -> bool {
        self.shared
            .sweeper
            .lock()
            .as_ref()
            .is_some_and(|sweeper| !sweeper.is_finished())
    }
}

impl<K, V> fmt::Debug for Cache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.read();
        f.debug_struct("Cache")
            .field("len", &state.entries.len())
            .field("capacity", &state.capacity)
            .field("policy", &state.policy)
            .finish()
    }
}

#[cfg(test)]
impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Asserts that the recency list and the index agree.
    pub(crate) fn check_invariants(&self) {
        self.shared.state.read().entries.check_invariants();
    }
}
