// Copyright 2026 the Adapter Forms Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Append-only, publish-once maps backing every process-wide table.
//!
//! ## Semantics
//!
//! - Lookups take a read lock.
//! - On a miss the value is built with no lock held, so builders may recurse into the same
//!   table (the varargs array builders do).
//! - Publication takes the write lock and stores the value only if the key is still vacant;
//!   otherwise the freshly built value is dropped and the winner returned.
//! - Entries are never removed.

use core::fmt;
use core::hash::Hash;

use hashbrown::HashMap;
use hashbrown::hash_map::Entry;
use parking_lot::RwLock;

/// A concurrent map whose entries are published at most once.
pub struct PublishOnceMap<K, V> {
    name: &'static str,
    slots: RwLock<HashMap<K, V>>,
}

impl<K, V> fmt::Debug for PublishOnceMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishOnceMap")
            .field("name", &self.name)
            .field("len", &self.slots.read().len())
            .finish()
    }
}

impl<K: Eq + Hash, V: Clone> PublishOnceMap<K, V> {
    /// Creates an empty map; `name` only appears in logs.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the published value for `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        self.slots.read().get(key).cloned()
    }

    /// Returns the value for `key`, building and publishing it on a miss.
    pub fn get_or_create(&self, key: K, build: impl FnOnce(&K) -> V) -> V {
        if let Some(v) = self.get(&key) {
            return v;
        }
        let built = build(&key);
        self.publish(key, built)
    }

    /// Like [`PublishOnceMap::get_or_create`] for fallible builders; failures publish nothing.
    pub fn try_get_or_create<E>(
        &self,
        key: K,
        build: impl FnOnce(&K) -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(v) = self.get(&key) {
            return Ok(v);
        }
        let built = build(&key)?;
        Ok(self.publish(key, built))
    }

    /// Publishes `value` unless `key` is taken; returns the published value.
    pub fn publish(&self, key: K, value: V) -> V {
        match self.slots.write().entry(key) {
            Entry::Occupied(e) => {
                log::debug!("{}: lost publication race, discarding", self.name);
                e.get().clone()
            }
            Entry::Vacant(e) => e.insert(value).clone(),
        }
    }

    /// Number of published entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// Returns `true` if nothing has been published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::sync::Arc;
    use core::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn first_publication_wins() {
        let map = PublishOnceMap::new("test");
        assert_eq!(map.publish(1, "a"), "a");
        assert_eq!(map.publish(1, "b"), "a");
        assert_eq!(map.get_or_create(1, |_| "c"), "a");
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn builders_may_recurse() {
        let map: PublishOnceMap<u32, u64> = PublishOnceMap::new("fib");
        fn fib(map: &PublishOnceMap<u32, u64>, n: u32) -> u64 {
            map.get_or_create(n, |&n| {
                if n < 2 {
                    u64::from(n)
                } else {
                    fib(map, n - 1) + fib(map, n - 2)
                }
            })
        }
        assert_eq!(fib(&map, 40), 102_334_155);
    }

    #[test]
    fn failed_builds_publish_nothing() {
        let map: PublishOnceMap<u8, u8> = PublishOnceMap::new("fallible");
        assert_eq!(map.try_get_or_create(0, |_| Err("nope")), Err("nope"));
        assert!(map.is_empty());
        assert_eq!(map.try_get_or_create::<()>(0, |_| Ok(9)), Ok(9));
    }

    #[test]
    fn concurrent_misses_agree_on_one_value() {
        let map = Arc::new(PublishOnceMap::new("race"));
        let builds = Arc::new(AtomicUsize::new(0));
        let handles: alloc::vec::Vec<_> = (0..8)
            .map(|i| {
                let map = Arc::clone(&map);
                let builds = Arc::clone(&builds);
                std::thread::spawn(move || {
                    map.get_or_create(7_u8, |_| {
                        builds.fetch_add(1, Ordering::Relaxed);
                        Arc::new(i)
                    })
                })
            })
            .collect();
        let results: alloc::vec::Vec<Arc<i32>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        for r in &results {
            assert!(Arc::ptr_eq(r, &results[0]), "all threads see the winner");
        }
        assert!(builds.load(Ordering::Relaxed) >= 1);
    }
}
