//! LRU Index Module
//!
//! The recency list and the key index, kept together as one structure.

use std::collections::HashMap;
use std::hash::Hash;

use crate::cache::CacheEntry;

#[derive(Debug)]
struct Slot<K, V> {
    entry: Option<CacheEntry<K, V>>,
    /// Neighbour towards the front (more recently used)
    prev: Option<usize>,
    /// Neighbour towards the back (less recently used)
    next: Option<usize>,
}

impl<K, V> Slot<K, V> {
    fn occupied(entry: CacheEntry<K, V>) -> Self {
        Self {
            entry: Some(entry),
            prev: None,
            next: None,
        }
    }
}

// == LRU Index ==
/// Recency-ordered entries with O(1) keyed access.
///
/// Entries live in an arena of slots linked into a doubly-linked list:
/// - Front (head) = Most recently used
/// - Back (tail) = Least recently used
///
/// The hash index maps each key to its slot. Every removal goes through
/// `delete_slot`, so the list and the index always hold the same keys.
#[derive(Debug)]
pub struct LruIndex<K, V> {
    slots: Vec<Slot<K, V>>,
    free: Vec<usize>,
    index: HashMap<K, usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl<K, V> Default for LruIndex<K, V> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
        }
    }
}

impl<K, V> LruIndex<K, V>
where
    K: Eq + Hash + Clone,
{
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    // == Peek ==
    /// Looks up an entry without changing its position.
    pub fn peek(&self, key: &K) -> Option<&CacheEntry<K, V>> {
        let slot = *self.index.get(key)?;
        self.slots[slot].entry.as_ref()
    }

    // == Touch ==
    /// Moves an entry to the front and hands it out for modification.
    pub fn touch(&mut self, key: &K) -> Option<&mut CacheEntry<K, V>> {
        let slot = *self.index.get(key)?;
        self.move_to_front(slot);
        self.slots[slot].entry.as_mut()
    }

    // == Push Front ==
    /// Inserts an entry as the most recently used.
    ///
    /// An existing entry under the same key is removed first and returned.
    pub fn push_front(&mut self, entry: CacheEntry<K, V>) -> Option<CacheEntry<K, V>> {
        let replaced = self.remove(&entry.key);
        let key = entry.key.clone();
        let slot = self.alloc(entry);
        self.link_front(slot);
        self.index.insert(key, slot);
        replaced
    }

    // == Remove ==
    pub fn remove(&mut self, key: &K) -> Option<CacheEntry<K, V>> {
        let slot = *self.index.get(key)?;
        Some(self.delete_slot(slot))
    }

    // == Pop Back ==
    /// Removes and returns the least recently used entry.
    pub fn pop_back(&mut self) -> Option<CacheEntry<K, V>> {
        let slot = self.tail?;
        Some(self.delete_slot(slot))
    }

    /// All keys, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.index.keys()
    }

    /// All entries from least to most recently used.
    pub fn iter_oldest_first(&self) -> OldestFirst<'_, K, V> {
        OldestFirst {
            slots: &self.slots,
            cursor: self.tail,
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.index.clear();
        self.head = None;
        self.tail = None;
    }

    fn delete_slot(&mut self, slot: usize) -> CacheEntry<K, V> {
        self.unlink(slot);
        let entry = match self.slots[slot].entry.take() {
            Some(entry) => entry,
            None => unreachable!("linked slot {slot} holds no entry"),
        };
        self.index.remove(&entry.key);
        self.free.push(slot);
        entry
    }

    fn alloc(&mut self, entry: CacheEntry<K, V>) -> usize {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Slot::occupied(entry);
                slot
            }
            None => {
                self.slots.push(Slot::occupied(entry));
                self.slots.len() - 1
            }
        }
    }

    fn move_to_front(&mut self, slot: usize) {
        if self.head == Some(slot) {
            return;
        }
        self.unlink(slot);
        self.link_front(slot);
    }

    fn link_front(&mut self, slot: usize) {
        self.slots[slot].prev = None;
        self.slots[slot].next = self.head;
        match self.head {
            Some(head) => self.slots[head].prev = Some(slot),
            None => self.tail = Some(slot),
        }
        self.head = Some(slot);
    }

    fn unlink(&mut self, slot: usize) {
        let prev = self.slots[slot].prev.take();
        let next = self.slots[slot].next.take();
        match prev {
            Some(prev) => self.slots[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.slots[next].prev = prev,
            None => self.tail = prev,
        }
    }

    /// Walks the list both ways and compares it with the index.
    #[cfg(test)]
    pub fn check_invariants(&self) {
        use std::collections::HashSet;

        let forward: Vec<K> = {
            let mut keys = Vec::new();
            let mut cursor = self.head;
            while let Some(slot) = cursor {
                let entry = self.slots[slot].entry.as_ref().expect("linked slot is empty");
                assert_eq!(self.index.get(&entry.key), Some(&slot));
                keys.push(entry.key.clone());
                cursor = self.slots[slot].next;
            }
            keys
        };
        let backward: Vec<K> = self.iter_oldest_first().map(|e| e.key.clone()).collect();

        assert_eq!(forward.len(), self.index.len());
        assert_eq!(backward.len(), self.index.len());
        assert!(forward.iter().eq(backward.iter().rev()));

        let unique: HashSet<&K> = forward.iter().collect();
        assert_eq!(unique.len(), forward.len());
        assert_eq!(self.slots.len(), self.index.len() + self.free.len());
    }
}

// == Oldest First Iterator ==
/// Iterator from the back of the recency list to the front.
pub struct OldestFirst<'a, K, V> {
    slots: &'a [Slot<K, V>],
    cursor: Option<usize>,
}

impl<'a, K, V> Iterator for OldestFirst<'a, K, V> {
    type Item = &'a CacheEntry<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = &self.slots[self.cursor?];
        self.cursor = slot.prev;
        slot.entry.as_ref()
    }
}
