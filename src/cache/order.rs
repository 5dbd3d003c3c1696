//! Access Order Module
//!
//! Recency tracking used to pick an eviction victim when the cache is full.

use std::collections::{BTreeMap, HashMap};

// == Access Order ==
/// Orders keys by last use.
///
/// Every touch stamps the key with a fresh tick; the smallest tick is the
/// least recently used key. Touch, remove and pop are O(log n).
#[derive(Debug, Default)]
pub struct AccessOrder {
    ticks: HashMap<String, u64>,
    by_tick: BTreeMap<u64, String>,
    clock: u64,
}

impl AccessOrder {
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as most recently used, inserting it if unknown.
    pub fn touch(&mut self, key: &str) {
        self.clock += 1;
        let tick = self.clock;
        if let Some(previous) = self.ticks.insert(key.to_string(), tick) {
            self.by_tick.remove(&previous);
        }
        self.by_tick.insert(tick, key.to_string());
    }

    // == Remove ==
    pub fn remove(&mut self, key: &str) {
        if let Some(tick) = self.ticks.remove(key) {
            self.by_tick.remove(&tick);
        }
    }

    // == Pop Least Recent ==
    /// Removes and returns the least recently used key.
    pub fn pop_least_recent(&mut self) -> Option<String> {
        let (_, key) = self.by_tick.pop_first()?;
        self.ticks.remove(&key);
        Some(key)
    }

    pub fn clear(&mut self) {
        self.ticks.clear();
        self.by_tick.clear();
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_returns_insertion_order_without_touches() {
        let mut order = AccessOrder::new();
        order.touch("a");
        order.touch("b");
        order.touch("c");

        assert_eq!(order.pop_least_recent().as_deref(), Some("a"));
        assert_eq!(order.pop_least_recent().as_deref(), Some("b"));
        assert_eq!(order.len(), 1);
    }

    #[test]
    fn test_touch_moves_key_to_most_recent() {
        let mut order = AccessOrder::new();
        order.touch("a");
        order.touch("b");
        order.touch("a");

        assert_eq!(order.len(), 2);
        assert_eq!(order.pop_least_recent().as_deref(), Some("b"));
        assert_eq!(order.pop_least_recent().as_deref(), Some("a"));
        assert!(order.pop_least_recent().is_none());
    }

    #[test]
    fn test_remove_unknown_key_is_noop() {
        let mut order = AccessOrder::new();
        order.touch("a");
        order.remove("missing");
        order.remove("a");
        order.remove("a");

        assert!(order.is_empty());
    }
}
