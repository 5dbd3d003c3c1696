//! Cache Module
//!
//! Keyed in-memory store where every entry carries its own expiration timer.

mod entry;
mod order;
mod stats;
mod store;


// Re-export public types
pub use entry::{CacheEntry, MAX_TTL};
pub use order::AccessOrder;
pub use stats::CacheStats;
pub use store::ExpiringCache;
