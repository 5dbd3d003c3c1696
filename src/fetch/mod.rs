//! Fetch Module
//!
//! Upstream HTTP calls with a per-attempt deadline, bounded constant-delay
//! retries, optional response caching, and a single normalized error.

mod fetcher;
mod options;

pub use fetcher::{ResilientFetcher, RetryPolicy, CLIENT_VERSION_HEADER};
pub use options::RequestOptions;

/// Component name reported on terminal failures.
pub const COMPONENT: &str = "API";
