//! Performance Metrics
//!
//! Process-wide counters shared by every request flow.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

// == Performance Metrics ==
/// Monotonic counters; safe to share across threads behind an `Arc`.
#[derive(Debug)]
pub struct PerformanceMetrics {
    api_calls: AtomicU64,
    errors: AtomicU64,
    started_at: DateTime<Utc>,
}

/// Point-in-time copy of [`PerformanceMetrics`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Upstream attempts, retries included
    pub api_calls: u64,
    /// Logical requests that ended in a network failure
    pub errors: u64,
    /// Seconds since the metrics were created
    pub uptime_secs: i64,
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self {
            api_calls: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    /// Counts one upstream attempt.
    pub fn record_api_call(&self) {
        self.api_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one request that exhausted its retries.
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn api_calls(&self) -> u64 {
        self.api_calls.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            api_calls: self.api_calls(),
            errors: self.errors(),
            uptime_secs: (Utc::now() - self.started_at).num_seconds(),
        }
    }
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self::new()
    }
}
