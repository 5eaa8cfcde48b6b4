//! Response models for the cache layer
//!
//! Defines the page envelope returned by fetch functions and the diagnostic
//! snapshot produced by `debug()`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::CacheStats;

/// One page of a collection, as returned by a page fetch function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    /// Items on this page, in order
    pub data: Vec<T>,
    pub page: u64,
    pub limit: u64,
    /// Total number of items across all pages
    pub total: u64,
    /// ceil(total / limit)
    pub pages: u64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl<T> PaginatedResponse<T> {
    /// Creates a page envelope, deriving `pages` and the navigation flags.
    pub fn new(data: Vec<T>, page: u64, limit: u64, total: u64) -> Self {
        let pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            data,
            page,
            limit,
            total,
            pages,
            has_next_page: page < pages,
            has_previous_page: page > 1,
        }
    }
}

/// Diagnostic view of a single entry.
#[derive(Debug, Clone, Serialize)]
pub struct EntryDebug {
    pub key: String,
    pub created_at: DateTime<Utc>,
    pub age_ms: u64,
    pub ttl_ms: u64,
    pub remaining_ttl_ms: u64,
    pub expired: bool,
    /// Sorted tag list
    pub tags: Vec<String>,
}

/// Diagnostic snapshot of the whole store, returned by `debug()`.
#[derive(Debug, Clone, Serialize)]
pub struct DebugSnapshot {
    pub size: usize,
    /// Entries ordered by key
    pub entries: Vec<EntryDebug>,
    /// Key count per tag
    pub tags: BTreeMap<String, usize>,
    pub stats: CacheStats,
}

impl DebugSnapshot {
    /// Looks up the diagnostic view of one key.
    pub fn entry(&self, key: &str) -> Option<&EntryDebug> {
        self.entries.iter().find(|e| e.key == key)
    }
}
