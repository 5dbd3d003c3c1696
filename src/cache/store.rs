//! Cache Store Module
//!
//! Keyed storage where each entry owns an eviction timer registered with a
//! [`Scheduler`]. Reads also compare against the scheduler clock, so an entry
//! is never returned past its expiration even if its timer runs late.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tracing::{debug, trace};

use crate::cache::{AccessOrder, CacheEntry, CacheStats, MAX_TTL};
use crate::scheduler::{Scheduler, TimerHandle};

// == Expiring Cache ==
/// Shared handle to a TTL cache. Cloning is cheap; clones see the same entries.
pub struct ExpiringCache<V> {
    shared: Arc<Mutex<Inner<V>>>,
    scheduler: Arc<dyn Scheduler>,
    default_ttl: Duration,
    max_entries: Option<usize>,
}

struct Inner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    order: AccessOrder,
    stats: CacheStats,
    next_generation: u64,
}

impl<V> Inner<V> {
    /// Removes an entry along with its timer and recency slot.
    fn remove(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        entry.cancel_timer();
        self.order.remove(key);
        self.stats.set_total_entries(self.entries.len());
        Some(entry)
    }
}

impl<V> ExpiringCache<V>
where
    V: Clone + Send + 'static,
{
    // == Constructor ==
    /// Creates an unbounded cache.
    ///
    /// # Arguments
    /// * `scheduler` - Clock and timer source for evictions
    /// * `default_ttl` - TTL used by [`ExpiringCache::set_default`]
    pub fn new(scheduler: Arc<dyn Scheduler>, default_ttl: Duration) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Inner {
                entries: HashMap::new(),
                order: AccessOrder::new(),
                stats: CacheStats::new(),
                next_generation: 0,
            })),
            scheduler,
            default_ttl,
            max_entries: None,
        }
    }

    /// Bounds the number of live entries. Zero means unbounded.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = (max_entries > 0).then_some(max_entries);
        self
    }

    /// TTL applied by [`ExpiringCache::set_default`].
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    // == Set ==
    /// Stores `value` under `key` for `ttl`.
    ///
    /// Any pending eviction for `key` is cancelled before the new timer is
    /// registered. When the cache is full and `key` is new, the least recently
    /// used entry is evicted first. TTLs above [`MAX_TTL`] are clamped.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let ttl = ttl.min(MAX_TTL);
        let mut inner = self.lock();

        let replaced = inner.remove(&key).is_some();

        if !replaced {
            if let Some(max) = self.max_entries {
                while inner.entries.len() >= max {
                    let Some(victim) = inner.order.pop_least_recent() else {
                        break;
                    };
                    if inner.remove(&victim).is_some() {
                        inner.stats.record_eviction();
                        trace!(key = %victim, "Evicted least recently used entry");
                    }
                }
            }
        }

        inner.next_generation += 1;
        let generation = inner.next_generation;
        let timer = self.schedule_eviction(key.clone(), generation, ttl);
        let entry = CacheEntry::new(value, self.scheduler.now(), ttl, generation, timer);

        inner.entries.insert(key.clone(), entry);
        inner.order.touch(&key);
        let total = inner.entries.len();
        inner.stats.set_total_entries(total);
    }

    /// Stores `value` under `key` for the default TTL.
    pub fn set_default(&self, key: impl Into<String>, value: V) {
        self.set(key, value, self.default_ttl);
    }

    // == Get ==
    /// Returns the live value for `key`, or `None` if absent or expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.scheduler.now();
        let mut inner = self.lock();

        let expired = match inner.entries.get(key) {
            Some(entry) => entry.is_expired(now),
            None => {
                inner.stats.record_miss();
                return None;
            }
        };

        if expired {
            inner.remove(key);
            inner.stats.record_expiration();
            inner.stats.record_miss();
            return None;
        }

        let value = inner.entries.get(key).map(|entry| entry.value.clone());
        inner.stats.record_hit();
        inner.order.touch(key);
        value
    }

    // == Delete ==
    /// Removes `key` and cancels its timer. Returns whether an entry existed.
    pub fn delete(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    // == Time To Live ==
    /// Remaining lifetime of a live entry.
    pub fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        let now = self.scheduler.now();
        self.lock()
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.ttl_remaining(now))
    }

    // == Clear ==
    /// Drops every entry and cancels all pending timers.
    pub fn clear(&self) {
        let mut inner = self.lock();
        for entry in inner.entries.values() {
            entry.cancel_timer();
        }
        inner.entries.clear();
        inner.order.clear();
        inner.stats.set_total_entries(0);
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        let mut stats = inner.stats.clone();
        stats.set_total_entries(inner.entries.len());
        stats
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    fn schedule_eviction(&self, key: String, generation: u64, ttl: Duration) -> TimerHandle {
        let weak = Arc::downgrade(&self.shared);
        self.scheduler.schedule(
            ttl,
            Box::new(move || evict_expired(&weak, &key, generation)),
        )
    }

    fn lock(&self) -> MutexGuard<'_, Inner<V>> {
        lock_inner(&self.shared)
    }
}

// == Eviction Callback ==
/// Runs when an entry's timer fires. Only the entry the timer was registered
/// for is removed; a newer entry under the same key is left alone.
fn evict_expired<V>(shared: &Weak<Mutex<Inner<V>>>, key: &str, generation: u64) {
    let Some(shared) = shared.upgrade() else {
        return;
    };
    let mut inner = lock_inner(&shared);

    let is_current = inner
        .entries
        .get(key)
        .is_some_and(|entry| entry.generation == generation);
    if is_current {
        inner.remove(key);
        inner.stats.record_expiration();
        debug!(key, "Cache entry expired");
    }
}

fn lock_inner<V>(shared: &Mutex<Inner<V>>) -> MutexGuard<'_, Inner<V>> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<V> Clone for ExpiringCache<V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            scheduler: Arc::clone(&self.scheduler),
            default_ttl: self.default_ttl,
            max_entries: self.max_entries,
        }
    }
}

impl<V> fmt::Debug for ExpiringCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiringCache")
            .field("entries", &lock_inner(&self.shared).entries.len())
            .field("default_ttl", &self.default_ttl)
            .field("max_entries", &self.max_entries)
            .finish()
    }
}
