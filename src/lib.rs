//! Pulse Gateway - expiring cache and resilient upstream fetcher
//!
//! [`ExpiringCache`] stores values under per-key eviction timers.
//! [`ResilientFetcher`] performs upstream JSON calls with a deadline, bounded
//! constant-delay retries and a single [`NetworkFailure`] error.
//! The `api` module wires both behind a small HTTP gateway.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod metrics;
pub mod models;
pub mod observability;
pub mod scheduler;

pub use api::AppState;
pub use cache::ExpiringCache;
pub use config::Config;
pub use error::NetworkFailure;
pub use fetch::{RequestOptions, ResilientFetcher, RetryPolicy};
pub use metrics::PerformanceMetrics;
pub use scheduler::{ManualScheduler, Scheduler, TokioScheduler};
