//! Property-Based Tests for Cache Module
//!
//! Drives the cache with random operation sequences and compares it against a
//! simple ordered model.

use proptest::prelude::*;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cache::{Cache, Stats};
use crate::config::Config;

// == Strategies ==
/// Small key space so operations collide often
fn key_strategy() -> impl Strategy<Value = u8> {
    0u8..16
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: u8, value: u32 },
    Get { key: u8 },
    Peek { key: u8 },
    Has { key: u8 },
    Remove { key: u8 },
    EvictOldest,
    Resize { capacity: usize },
    Clear,
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        6 => (key_strategy(), any::<u32>()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        4 => key_strategy().prop_map(|key| CacheOp::Get { key }),
        1 => key_strategy().prop_map(|key| CacheOp::Peek { key }),
        1 => key_strategy().prop_map(|key| CacheOp::Has { key }),
        2 => key_strategy().prop_map(|key| CacheOp::Remove { key }),
        1 => Just(CacheOp::EvictOldest),
        1 => (0usize..10).prop_map(|capacity| CacheOp::Resize { capacity }),
        1 => Just(CacheOp::Clear),
    ]
}

// == Model ==
/// Reference LRU: front = oldest, back = newest.
#[derive(Debug, Default)]
struct Model {
    order: VecDeque<(u8, u32)>,
    capacity: usize,
    stats: Stats,
    evicted: Vec<(u8, u32)>,
}

impl Model {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    fn take(&mut self, key: u8) -> Option<(u8, u32)> {
        let position = self.order.iter().position(|(k, _)| *k == key)?;
        self.order.remove(position)
    }

    fn evict(&mut self) -> bool {
        match self.order.pop_front() {
            Some(entry) => {
                self.evicted.push(entry);
                self.stats.evictions += 1;
                true
            }
            None => false,
        }
    }

    fn apply(&mut self, op: &CacheOp) {
        match *op {
            CacheOp::Set { key, value } => {
                self.stats.sets += 1;
                let existed = self.take(key).is_some();
                self.order.push_back((key, value));
                if !existed && self.order.len() > self.capacity {
                    self.evict();
                }
            }
            CacheOp::Get { key } => {
                self.stats.gets += 1;
                match self.take(key) {
                    Some(entry) => {
                        self.stats.hits += 1;
                        self.order.push_back(entry);
                    }
                    None => self.stats.misses += 1,
                }
            }
            CacheOp::Peek { .. } | CacheOp::Has { .. } => {}
            CacheOp::Remove { key } => {
                self.take(key);
            }
            CacheOp::EvictOldest => {
                self.evict();
            }
            CacheOp::Resize { capacity } => {
                if capacity > 0 {
                    self.capacity = capacity;
                    while self.order.len() > capacity {
                        self.evict();
                    }
                }
            }
            CacheOp::Clear => self.order.clear(),
        }
    }

    fn keys(&self) -> Vec<u8> {
        self.order.iter().map(|(k, _)| *k).collect()
    }

    fn value(&self, key: u8) -> Option<u32> {
        self.order.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // For any operation sequence, the cache matches the model after every
    // step: same recency order, same values, same counters, and the list and
    // index agree.
    #[test]
    fn prop_matches_lru_model(
        capacity in 1usize..8,
        ops in prop::collection::vec(cache_op_strategy(), 1..120)
    ) {
        let evicted = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&evicted);
        let config = Config::new(capacity).on_eviction(move |k: u8, v: u32| sink.lock().push((k, v)));
        let cache: Cache<u8, u32> = Cache::new(config).unwrap();
        let mut model = Model::new(capacity);

        for op in &ops {
            match *op {
                CacheOp::Get { key } => {
                    prop_assert_eq!(cache.get(&key), model.value(key));
                }
                CacheOp::Peek { key } => {
                    prop_assert_eq!(cache.peek(&key), model.value(key));
                }
                CacheOp::Has { key } => {
                    prop_assert_eq!(cache.has(&key), model.value(key).is_some());
                }
                CacheOp::Remove { key } => {
                    prop_assert_eq!(cache.remove(&key), model.value(key).is_some());
                }
                CacheOp::EvictOldest => {
                    prop_assert_eq!(cache.evict_oldest(), !model.order.is_empty());
                }
                CacheOp::Resize { capacity } => {
                    prop_assert_eq!(cache.resize(capacity).is_ok(), capacity > 0);
                }
                CacheOp::Set { key, value } => {
                    cache.set(key, value);
                }
                CacheOp::Clear => cache.clear(),
            }
            model.apply(op);

            prop_assert_eq!(cache.ordered_keys(), model.keys());
            prop_assert!(cache.len() <= cache.capacity());
            cache.check_invariants();
        }

        let expected = Stats {
            capacity: model.capacity as u64,
            count: model.order.len() as u64,
            ..model.stats
        };
        prop_assert_eq!(cache.stats(), expected);
        prop_assert_eq!(&*evicted.lock(), &model.evicted);
    }

    // Keys() and OrderedKeys() always describe the same set.
    #[test]
    fn prop_keys_match_ordered_keys(
        ops in prop::collection::vec(cache_op_strategy(), 1..60)
    ) {
        let cache: Cache<u8, u32> = Cache::new(Config::new(5)).unwrap();
        for op in ops {
            match op {
                CacheOp::Set { key, value } => { cache.set(key, value); }
                CacheOp::Get { key } => { cache.get(&key); }
                CacheOp::Remove { key } => { cache.remove(&key); }
                CacheOp::EvictOldest => { cache.evict_oldest(); }
                CacheOp::Resize { capacity } => { let _ = cache.resize(capacity); }
                CacheOp::Clear => cache.clear(),
                CacheOp::Peek { .. } | CacheOp::Has { .. } => {}
            }
        }

        let unordered: HashSet<u8> = cache.keys().into_iter().collect();
        let ordered: HashSet<u8> = cache.ordered_keys().into_iter().collect();
        prop_assert_eq!(unordered.len(), cache.len());
        prop_assert_eq!(unordered, ordered);
    }

    // Filling a full cache with a new key evicts exactly the least recently
    // touched key.
    #[test]
    fn prop_new_key_evicts_least_recent(
        keys in prop::collection::hash_set(key_strategy(), 2..8),
        touched in key_strategy(),
    ) {
        let keys: Vec<u8> = keys.into_iter().collect();
        let cache: Cache<u8, u32> = Cache::new(Config::new(keys.len())).unwrap();
        for key in &keys {
            cache.set(*key, u32::from(*key));
        }
        cache.get(&touched);

        let before = cache.ordered_keys();
        prop_assert!(cache.set(100, 0));
        let after = cache.ordered_keys();

        prop_assert_eq!(&after[..after.len() - 1], &before[1..]);
        prop_assert_eq!(after.last(), Some(&100));
    }
}
