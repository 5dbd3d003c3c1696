//! Cache Entry Module
//!
//! Defines a stored value together with its expiration bookkeeping.

use std::time::{Duration, Instant};

use crate::scheduler::TimerHandle;

/// Longest lifetime an entry can have. Longer TTLs are clamped to it.
pub const MAX_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

// == Cache Entry ==
/// A single live value and the timer that will evict it.
#[derive(Debug)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Instant the entry was inserted
    pub inserted_at: Instant,
    /// Instant after which the entry must read as absent
    pub expires_at: Instant,
    /// Insertion number; lets an eviction callback recognise its own entry
    pub generation: u64,
    timer: TimerHandle,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// `ttl` is clamped to [`MAX_TTL`].
    pub fn new(value: V, now: Instant, ttl: Duration, generation: u64, timer: TimerHandle) -> Self {
        Self {
            value,
            inserted_at: now,
            expires_at: now + ttl.min(MAX_TTL),
            generation,
            timer,
        }
    }

    // == Is Expired ==
    /// An entry is expired once `now` reaches `expires_at`.
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    // == Time To Live ==
    /// Remaining lifetime, zero once expired.
    pub fn ttl_remaining(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }

    /// Cancels the pending eviction timer.
    pub fn cancel_timer(&self) {
        self.timer.cancel();
    }
}
