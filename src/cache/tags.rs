//! Tag Index Module
//!
//! Reverse index from tag to the keys registered under it.

use std::collections::{BTreeMap, HashMap, HashSet};

// == Tag Index ==
/// Maps each tag to the set of keys carrying it.
///
/// Empty key sets are dropped so `tag_count` only reports live tags.
#[derive(Debug, Default)]
pub struct TagIndex {
    by_tag: HashMap<String, HashSet<String>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `key` under every tag in `tags`.
    pub fn register<'a>(&mut self, key: &str, tags: impl IntoIterator<Item = &'a String>) {
        for tag in tags {
            self.by_tag
                .entry(tag.clone())
                .or_default()
                .insert(key.to_string());
        }
    }

    /// Removes `key` from every tag in `tags`.
    pub fn unregister<'a>(&mut self, key: &str, tags: impl IntoIterator<Item = &'a String>) {
        for tag in tags {
            if let Some(keys) = self.by_tag.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.by_tag.remove(tag);
                }
            }
        }
    }

    /// Returns the keys currently registered under `tag`.
    pub fn keys_for(&self, tag: &str) -> Vec<String> {
        self.by_tag
            .get(tag)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, tag: &str, key: &str) -> bool {
        self.by_tag.get(tag).is_some_and(|keys| keys.contains(key))
    }

    /// Number of tags with at least one key.
    pub fn tag_count(&self) -> usize {
        self.by_tag.len()
    }

    /// Per-tag key counts, ordered by tag.
    pub fn summary(&self) -> BTreeMap<String, usize> {
        self.by_tag
            .iter()
            .map(|(tag, keys)| (tag.clone(), keys.len()))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &HashSet<String>)> {
        self.by_tag.iter()
    }

    pub fn clear(&mut self) {
        self.by_tag.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_register_and_lookup() {
        let mut index = TagIndex::new();
        index.register("k1", &tags(&["a"]));
        index.register("k2", &tags(&["a", "b"]));

        let mut keys = index.keys_for("a");
        keys.sort();
        assert_eq!(keys, vec!["k1", "k2"]);
        assert_eq!(index.keys_for("b"), vec!["k2"]);
        assert!(index.keys_for("missing").is_empty());
    }

    #[test]
    fn test_unregister_drops_empty_tags() {
        let mut index = TagIndex::new();
        index.register("k1", &tags(&["a", "b"]));
        index.unregister("k1", &tags(&["a", "b"]));

        assert_eq!(index.tag_count(), 0);
        assert!(!index.contains("a", "k1"));
    }

    #[test]
    fn test_unregister_unknown_is_noop() {
        let mut index = TagIndex::new();
        index.register("k1", &tags(&["a"]));
        index.unregister("k2", &tags(&["a", "z"]));

        assert!(index.contains("a", "k1"));
        assert_eq!(index.tag_count(), 1);
    }

    #[test]
    fn test_summary_counts() {
        let mut index = TagIndex::new();
        index.register("k1", &tags(&["a"]));
        index.register("k2", &tags(&["a", "b"]));

        let summary = index.summary();
        assert_eq!(summary.get("a"), Some(&2));
        assert_eq!(summary.get("b"), Some(&1));
    }
}
