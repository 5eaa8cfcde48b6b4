//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL and tag support.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::time::Instant;

// == Cache Entry ==
/// Represents a single cache entry with its payload and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored payload (owned copy of the caller's value)
    pub data: Value,
    /// Monotonic creation instant, used for expiry
    pub created_at: Instant,
    /// Wall-clock creation time, used for diagnostics
    pub created_at_utc: DateTime<Utc>,
    /// Time-to-live
    pub ttl: Duration,
    /// Group labels for bulk invalidation
    pub tags: HashSet<String>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry stamped with the current time.
    pub fn new(data: Value, ttl: Duration, tags: HashSet<String>) -> Self {
        Self {
            data,
            created_at: Instant::now(),
            created_at_utc: Utc::now(),
            ttl,
            tags,
        }
    }

    // == Age ==
    /// Time elapsed since the entry was created.
    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.created_at)
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry stays readable while its age equals the TTL exactly and
    /// expires once the age is strictly greater.
    pub fn is_expired(&self) -> bool {
        self.age() > self.ttl
    }

    // == Time To Live ==
    /// Returns the remaining TTL, or zero once the entry has expired.
    pub fn ttl_remaining(&self) -> Duration {
        self.ttl.saturating_sub(self.age())
    }

    /// Returns true if the entry carries the given tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}
