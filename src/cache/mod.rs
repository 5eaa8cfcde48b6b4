//! Cache Module
//!
//! Provides in-memory caching with TTL expiry and tag-based invalidation.

mod entry;
mod manager;
mod pattern;
mod stats;
mod store;
mod tags;


// Re-export public types
pub use entry::CacheEntry;
pub use manager::CacheManager;
pub use pattern::glob_matches;
pub use stats::CacheStats;
pub use store::CacheStore;
pub use tags::TagIndex;
