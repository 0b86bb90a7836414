// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A time-bounded keyed store for small pieces of per-sender state.
//!
//! Structurally the same shape as the abuse counters: process-local, keyed by
//! sender, forgotten after a deadline. The quiz mini-game keeps its pending
//! answer here instead of in ad-hoc handler fields.

use std::hash::Hash;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Keyed values that expire `ttl` after insertion.
#[derive(Debug)]
pub struct TtlStore<K: Eq + Hash, V> {
    ttl: Duration,
    entries: DashMap<K, (V, Instant)>,
}

impl<K, V> TtlStore<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    /// Store `value` under `key`, restarting its expiry clock.
    pub fn insert(&self, key: K, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    /// Return a clone of the live value under `key`, if any.
    pub fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// Remove and return the live value under `key`, if any.
    pub fn take(&self, key: &K) -> Option<V> {
        self.take_at(key, Instant::now())
    }

    /// Drop the value under `key` regardless of expiry.
    pub fn remove(&self, key: &K) {
        self.entries.remove(key);
    }

    fn insert_at(&self, key: K, value: V, now: Instant) {
        self.entries.insert(key, (value, now + self.ttl));
    }

    fn get_at(&self, key: &K, now: Instant) -> Option<V> {
        let entry = self.entries.get(key)?;
        let (value, expires_at) = entry.value();
        if now >= *expires_at {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        Some(value.clone())
    }

    fn take_at(&self, key: &K, now: Instant) -> Option<V> {
        let (_, (value, expires_at)) = self.entries.remove(key)?;
        (now < expires_at).then_some(value)
    }
}
