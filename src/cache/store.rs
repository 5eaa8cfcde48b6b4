//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with a tag index and TTL expiry.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::cache::pattern::glob_matches;
use crate::cache::{CacheEntry, CacheStats, TagIndex};
use crate::models::{DebugSnapshot, EntryDebug};

// == Cache Store ==
/// Key-value storage with TTL expiry and tag-based bulk invalidation.
///
/// Every tag on a stored entry has a matching `tag -> key` record in the tag
/// index and vice versa. All removal paths go through `remove_entry` to keep
/// both sides in step.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Reverse index tag -> keys
    tags: TagIndex,
    /// Performance statistics
    stats: CacheStats,
    /// TTL for entries stored without an explicit one
    default_ttl: Duration,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore with the given default TTL.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            tags: TagIndex::new(),
            stats: CacheStats::new(),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    // == Set ==
    /// Stores `data` under `key`, replacing any previous entry.
    ///
    /// The previous entry's tags are scrubbed before the new ones are
    /// registered. Empty tags are ignored and duplicates collapse.
    pub fn set(&mut self, key: String, data: Value, ttl: Option<Duration>, tags: Vec<String>) {
        self.remove_entry(&key);

        let tags: HashSet<String> = tags.into_iter().filter(|t| !t.is_empty()).collect();
        let ttl = ttl.unwrap_or(self.default_ttl);

        self.tags.register(&key, &tags);
        self.entries.insert(key, CacheEntry::new(data, ttl, tags));
        self.stats.set_total_entries(self.entries.len());
    }

    // == Get ==
    /// Retrieves a copy of the payload stored under `key`.
    ///
    /// Returns None if the key is absent or expired. Expired entries are
    /// removed on the spot.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(),
            None => {
                self.stats.record_miss();
                debug!(key = %key, "cache miss");
                return None;
            }
        };

        if expired {
            self.remove_entry(key);
            self.stats.record_expirations(1);
            self.stats.record_miss();
            debug!(key = %key, "cache miss (expired)");
            return None;
        }

        self.stats.record_hit();
        debug!(key = %key, "cache hit");
        self.entries.get(key).map(|entry| entry.data.clone())
    }

    // == Delete ==
    /// Removes an entry by key. Returns whether an entry was present.
    pub fn delete(&mut self, key: &str) -> bool {
        self.remove_entry(key).is_some()
    }

    // == Clear ==
    /// Drops every entry, or only the keys matching a `*` glob pattern.
    ///
    /// Returns the number of entries removed.
    pub fn clear(&mut self, pattern: Option<&str>) -> usize {
        let removed = match pattern {
            None => {
                let count = self.entries.len();
                self.entries.clear();
                self.tags.clear();
                count
            }
            Some(pattern) => {
                let matching: Vec<String> = self
                    .entries
                    .keys()
                    .filter(|key| glob_matches(pattern, key))
                    .cloned()
                    .collect();
                for key in &matching {
                    self.remove_entry(key);
                }
                matching.len()
            }
        };

        self.stats.record_invalidations(removed);
        self.stats.set_total_entries(self.entries.len());
        removed
    }

    // == Invalidate By Tag ==
    /// Deletes every key registered under `tag`. Returns the number deleted.
    pub fn invalidate_by_tag(&mut self, tag: &str) -> usize {
        let keys = self.tags.keys_for(tag);
        let removed = keys
            .iter()
            .filter(|key| self.remove_entry(key).is_some())
            .count();

        self.stats.record_invalidations(removed);
        removed
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Expiry is evaluated against the live entry at sweep time, so an entry
    /// re-set under an old key is never swept on behalf of its predecessor.
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.remove_entry(key);
        }

        self.stats.record_expirations(expired_keys.len());
        expired_keys.len()
    }

    // == Length ==
    /// Returns the current number of entries, including expired ones not yet
    /// reclaimed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Debug ==
    /// Builds a diagnostic snapshot. Has no side effects.
    pub fn debug(&self) -> DebugSnapshot {
        let mut entries: Vec<EntryDebug> = self
            .entries
            .iter()
            .map(|(key, entry)| {
                let mut tags: Vec<String> = entry.tags.iter().cloned().collect();
                tags.sort();
                EntryDebug {
                    key: key.clone(),
                    created_at: entry.created_at_utc,
                    age_ms: entry.age().as_millis() as u64,
                    ttl_ms: entry.ttl.as_millis() as u64,
                    remaining_ttl_ms: entry.ttl_remaining().as_millis() as u64,
                    expired: entry.is_expired(),
                    tags,
                }
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));

        DebugSnapshot {
            size: self.entries.len(),
            entries,
            tags: self.tags.summary(),
            stats: self.stats(),
        }
    }

    /// Removes the entry and scrubs its key from every tag it carried.
    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.tags.unregister(key, &entry.tags);
        self.stats.set_total_entries(self.entries.len());
        Some(entry)
    }

    /// Panics if the entry map and tag index disagree.
    #[cfg(test)]
    pub(crate) fn assert_tag_index_consistent(&self) {
        for (key, entry) in &self.entries {
            for tag in &entry.tags {
                assert!(
                    self.tags.contains(tag, key),
                    "entry '{}' carries tag '{}' missing from the index",
                    key,
                    tag
                );
            }
        }
        for (tag, keys) in self.tags.iter() {
            assert!(!keys.is_empty(), "tag '{}' has an empty key set", tag);
            for key in keys {
                let entry = self.entries.get(key);
                assert!(
                    entry.is_some_and(|e| e.has_tag(tag)),
                    "index maps tag '{}' to '{}' which does not carry it",
                    tag,
                    key
                );
            }
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> CacheStore {
        CacheStore::new(Duration::from_secs(300))
    }

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_store_new() {
        let store = store();
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.default_ttl(), Duration::from_secs(300));
    }

    #[test]
    fn test_store_set_and_get() {
        let mut store = store();

        store.set("key1".to_string(), json!("value1"), None, vec![]);
        assert_eq!(store.get("key1"), Some(json!("value1")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let mut store = store();
        assert!(store.get("nonexistent").is_none());
    }

    #[test]
    fn test_store_delete() {
        let mut store = store();

        store.set("key1".to_string(), json!(1), None, tags(&["a"]));
        assert!(store.delete("key1"));

        assert!(store.is_empty());
        assert!(store.get("key1").is_none());
        assert_eq!(store.debug().tags.len(), 0);
    }

    #[test]
    fn test_store_delete_nonexistent() {
        let mut store = store();
        assert!(!store.delete("nonexistent"));
    }

    #[test]
    fn test_store_overwrite_replaces_tags() {
        let mut store = store();

        store.set("key1".to_string(), json!(1), None, tags(&["a", "b"]));
        store.set("key1".to_string(), json!(2), None, tags(&["c"]));

        assert_eq!(store.get("key1"), Some(json!(2)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.invalidate_by_tag("a"), 0);
        assert_eq!(store.invalidate_by_tag("c"), 1);
        store.assert_tag_index_consistent();
    }

    #[test]
    fn test_store_ignores_empty_and_duplicate_tags() {
        let mut store = store();

        store.set("key1".to_string(), json!(1), None, tags(&["", "a", "a"]));

        let snapshot = store.debug();
        assert_eq!(snapshot.entry("key1").unwrap().tags, vec!["a"]);
        assert_eq!(snapshot.tags.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_ttl_expiration() {
        let mut store = store();

        store.set("key1".to_string(), json!(1), Some(Duration::from_secs(1)), vec![]);
        assert!(store.get("key1").is_some());

        tokio::time::advance(Duration::from_millis(1001)).await;

        assert!(store.get("key1").is_none());
        assert!(store.is_empty(), "Expired entry should be removed on read");
        assert_eq!(store.stats().expirations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_default_ttl_applies() {
        let mut store = CacheStore::new(Duration::from_secs(5));

        store.set("key1".to_string(), json!(1), None, tags(&["a"]));
        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(store.get("key1").is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.get("key1").is_none());
        store.assert_tag_index_consistent();
    }

    #[test]
    fn test_invalidate_by_tag() {
        let mut store = store();

        store.set("k1".to_string(), json!("v1"), None, tags(&["a"]));
        store.set("k2".to_string(), json!("v2"), None, tags(&["a", "b"]));
        store.set("k3".to_string(), json!("v3"), None, tags(&["c"]));

        assert_eq!(store.invalidate_by_tag("a"), 2);
        assert_eq!(store.invalidate_by_tag("b"), 0);
        assert!(store.get("k2").is_none());
        assert!(store.get("k3").is_some());
        store.assert_tag_index_consistent();
    }

    #[test]
    fn test_invalidate_unknown_tag() {
        let mut store = store();
        assert_eq!(store.invalidate_by_tag("nothing"), 0);
    }

    #[test]
    fn test_clear_all() {
        let mut store = store();

        store.set("k1".to_string(), json!(1), None, tags(&["a"]));
        store.set("k2".to_string(), json!(2), None, vec![]);

        assert_eq!(store.clear(None), 2);
        assert!(store.is_empty());
        assert_eq!(store.debug().tags.len(), 0);
    }

    #[test]
    fn test_clear_with_pattern() {
        let mut store = store();

        store.set("user:1".to_string(), json!(1), None, tags(&["users"]));
        store.set("user:2".to_string(), json!(2), None, tags(&["users"]));
        store.set("service:1".to_string(), json!(3), None, tags(&["services"]));

        assert_eq!(store.clear(Some("user:*")), 2);
        assert_eq!(store.len(), 1);
        assert!(store.get("service:1").is_some());
        store.assert_tag_index_consistent();
    }

    #[test]
    fn test_store_stats() {
        let mut store = store();

        store.set("key1".to_string(), json!(1), None, vec![]);
        store.get("key1"); // hit
        store.get("nonexistent"); // miss

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_cleanup_expired() {
        let mut store = store();

        store.set("key1".to_string(), json!(1), Some(Duration::from_secs(1)), tags(&["a"]));
        store.set("key2".to_string(), json!(2), Some(Duration::from_secs(10)), tags(&["a"]));

        tokio::time::advance(Duration::from_millis(1100)).await;

        assert_eq!(store.cleanup_expired(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.get("key2").is_some());
        store.assert_tag_index_consistent();
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_entry_survives_predecessor_expiry() {
        let mut store = store();

        store.set("key1".to_string(), json!("old"), Some(Duration::from_secs(1)), vec![]);
        tokio::time::advance(Duration::from_millis(900)).await;
        store.set("key1".to_string(), json!("new"), Some(Duration::from_secs(10)), vec![]);
        tokio::time::advance(Duration::from_millis(500)).await;

        assert_eq!(store.cleanup_expired(), 0);
        assert_eq!(store.get("key1"), Some(json!("new")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_debug_snapshot() {
        let mut store = store();

        store.set("k1".to_string(), json!(1), Some(Duration::from_secs(10)), tags(&["b", "a"]));
        tokio::time::advance(Duration::from_secs(3)).await;

        let snapshot = store.debug();
        let entry = snapshot.entry("k1").unwrap();
        assert_eq!(snapshot.size, 1);
        assert_eq!(entry.age_ms, 3_000);
        assert_eq!(entry.remaining_ttl_ms, 7_000);
        assert_eq!(entry.tags, vec!["a", "b"]);
        assert!(!entry.expired);
        // debug() does not count as a read
        assert_eq!(snapshot.stats.hits, 0);
    }
}
