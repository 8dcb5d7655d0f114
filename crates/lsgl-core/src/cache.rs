// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::filter::DateRange;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

pub const FLIGHT_CACHE_CAPACITY: usize = 10;
pub const DAILY_CACHE_CAPACITY: usize = 5;

/// Canonical form of a query's parameters.
///
/// When both bounds are present the day window is irrelevant and dropped;
/// otherwise the bounds are dropped. Timestamps are kept as epoch millis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub window_days: Option<u32>,
    pub start_ms: Option<i64>,
    pub end_ms: Option<i64>,
}

impl From<&DateRange> for QueryKey {
    fn from(range: &DateRange) -> Self {
        match range.bounds() {
            Some((start, end)) => Self {
                window_days: None,
                start_ms: Some(start.timestamp_millis()),
                end_ms: Some(end.timestamp_millis()),
            },
            None => Self {
                window_days: Some(range.days),
                start_ms: None,
                end_ms: None,
            },
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn part<T: fmt::Display>(v: Option<T>) -> String {
            v.map(|v| v.to_string()).unwrap_or_else(|| "null".to_string())
        }
        write!(
            f,
            "{}|{}|{}",
            part(self.window_days),
            part(self.start_ms),
            part(self.end_ms)
        )
    }
}

/// A fixed-capacity map that evicts in insertion order (FIFO, not LRU).
#[derive(Debug)]
pub struct QueryCache<V> {
    capacity: usize,
    order: VecDeque<QueryKey>,
    entries: HashMap<QueryKey, Arc<V>>,
}

impl<V> QueryCache<V> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity + 1),
            entries: HashMap::with_capacity(capacity + 1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Hits do not refresh an entry's position.
    pub fn get(&self, key: &QueryKey) -> Option<Arc<V>> {
        self.entries.get(key).cloned()
    }

    /// Stores `value` and returns the key evicted to make room, if any.
    pub fn insert(&mut self, key: QueryKey, value: Arc<V>) -> Option<QueryKey> {
        if self.entries.insert(key, value).is_some() {
            return None;
        }
        self.order.push_back(key);

        if self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
                return Some(oldest);
            }
        }
        None
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.entries.clear();
    }
}
