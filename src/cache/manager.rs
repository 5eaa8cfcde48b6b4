//! Cache Manager Module
//!
//! Cloneable async handle over a shared `CacheStore`. One manager is created
//! at application start and handed to every consumer that needs the cache.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::cache::{CacheStats, CacheStore};
use crate::config::Config;
use crate::error::Result;
use crate::models::DebugSnapshot;

/// Per-key gates used by `get_or_set_coalesced`.
type InFlight = Arc<StdMutex<HashMap<String, Gate>>>;

#[derive(Debug)]
struct Gate {
    turn: Arc<Mutex<()>>,
    /// Calls currently holding or waiting on `turn`
    users: usize,
}

/// Releases one use of a gate, removing it when the last user leaves.
/// Runs on drop so a cancelled call cleans up too.
struct GateTicket<'a> {
    in_flight: &'a StdMutex<HashMap<String, Gate>>,
    key: &'a str,
}

impl Drop for GateTicket<'_> {
    fn drop(&mut self) {
        let mut gates = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(gate) = gates.get_mut(self.key) {
            gate.users = gate.users.saturating_sub(1);
            if gate.users == 0 {
                gates.remove(self.key);
            }
        }
    }
}

// == Cache Manager ==
/// Shared handle to the cache store.
///
/// Cloning is cheap; all clones see the same entries. Payloads are copied in
/// on `set` (serialized) and copied out on `get` (deserialized), so callers
/// never alias stored data.
#[derive(Clone, Debug)]
pub struct CacheManager {
    /// Thread-safe cache store
    store: Arc<RwLock<CacheStore>>,
    in_flight: InFlight,
}

impl CacheManager {
    /// Creates a new manager over an empty store.
    pub fn new(default_ttl: Duration) -> Self {
        Self::from_store(CacheStore::new(default_ttl))
    }

    /// Creates a new manager around an existing store.
    pub fn from_store(store: CacheStore) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            in_flight: Arc::new(StdMutex::new(HashMap::new())),
        }
    }

    /// Creates a new manager from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.default_ttl())
    }

    // == Set ==
    /// Stores a copy of `data` under `key`, replacing any previous entry.
    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        data: &T,
        ttl: Option<Duration>,
        tags: &[&str],
    ) -> Result<()> {
        let value = serde_json::to_value(data)?;
        let tags = tags.iter().map(|t| t.to_string()).collect();

        self.store
            .write()
            .await
            .set(key.to_string(), value, ttl, tags);
        Ok(())
    }

    // == Get ==
    /// Returns a copy of the fresh value stored under `key`, if any.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        // Write lock: an expired entry is removed during the read
        let value = self.store.write().await.get(key);
        match value {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    // == Delete ==
    /// Removes `key`. Returns whether an entry was present.
    pub async fn delete(&self, key: &str) -> bool {
        self.store.write().await.delete(key)
    }

    // == Clear ==
    /// Drops everything, or only keys matching a `*` glob pattern.
    pub async fn clear(&self, pattern: Option<&str>) -> usize {
        let removed = self.store.write().await.clear(pattern);
        info!(
            "Cache cleared: pattern={}, removed {} entries",
            pattern.unwrap_or("<all>"),
            removed
        );
        removed
    }

    // == Invalidate By Tag ==
    /// Deletes every entry registered under `tag`.
    pub async fn invalidate_by_tag(&self, tag: &str) -> usize {
        let removed = self.store.write().await.invalidate_by_tag(tag);
        if removed > 0 {
            info!("Invalidated tag '{}': removed {} entries", tag, removed);
        } else {
            debug!("Invalidated tag '{}': no entries", tag);
        }
        removed
    }

    // == Get Or Set ==
    /// Returns the cached value for `key`, or runs `producer` and caches its
    /// result.
    ///
    /// The store lock is not held while `producer` runs, so concurrent misses
    /// on the same key each run their own producer. Use
    /// [`CacheManager::get_or_set_coalesced`] when that matters. A failing
    /// producer writes nothing and its error is returned as
    /// `CacheError::Fetch`.
    pub async fn get_or_set<T, F, Fut>(
        &self,
        key: &str,
        producer: F,
        ttl: Option<Duration>,
        tags: &[&str],
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        if let Some(cached) = self.get(key).await? {
            return Ok(cached);
        }

        let data = producer().await?;
        self.set(key, &data, ttl, tags).await?;
        Ok(data)
    }

    /// Like [`CacheManager::get_or_set`], but concurrent misses on the same
    /// key wait for the first producer instead of running their own.
    ///
    /// Waiters re-check the cache once the gate opens. If the first producer
    /// failed, the next waiter runs its producer.
    pub async fn get_or_set_coalesced<T, F, Fut>(
        &self,
        key: &str,
        producer: F,
        ttl: Option<Duration>,
        tags: &[&str],
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let (turn, _ticket) = self.enter_gate(key);
        let _turn = turn.lock().await;
        self.get_or_set(key, producer, ttl, tags).await
    }

    fn enter_gate<'a>(&'a self, key: &'a str) -> (Arc<Mutex<()>>, GateTicket<'a>) {
        let mut gates = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        let gate = gates.entry(key.to_string()).or_insert_with(|| Gate {
            turn: Arc::new(Mutex::new(())),
            users: 0,
        });
        gate.users += 1;
        let ticket = GateTicket {
            in_flight: &self.in_flight,
            key,
        };
        (Arc::clone(&gate.turn), ticket)
    }

    #[cfg(test)]
    fn gates_in_flight(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    // == Introspection ==
    /// Number of stored entries.
    pub async fn size(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    /// Diagnostic snapshot (age, remaining TTL and tags per entry).
    pub async fn debug(&self) -> DebugSnapshot {
        self.store.read().await.debug()
    }

    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    // == Cleanup Expired ==
    /// Removes every expired entry. Returns the number removed.
    pub async fn cleanup_expired(&self) -> usize {
        self.store.write().await.cleanup_expired()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::{assert_err, assert_ok};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Service {
        id: u32,
        name: String,
        price_cents: u32,
    }

    fn haircut() -> Service {
        Service {
            id: 1,
            name: "Haircut".to_string(),
            price_cents: 3_500,
        }
    }

    fn manager() -> CacheManager {
        CacheManager::new(Duration::from_secs(300))
    }

    #[tokio::test]
    async fn test_set_and_get_typed() {
        let cache = manager();

        assert_ok!(cache.set("service:1", &haircut(), None, &["services"]).await);
        let cached: Option<Service> = assert_ok!(cache.get("service:1").await);

        assert_eq!(cached, Some(haircut()));
        assert_eq!(cache.size().await, 1);
    }

    #[tokio::test]
    async fn test_values_are_copied() {
        let cache = manager();
        let mut original = haircut();

        cache.set("service:1", &original, None, &[]).await.unwrap();
        original.price_cents = 0;

        let mut first: Service = cache.get("service:1").await.unwrap().unwrap();
        first.name.push_str(" & Beard");
        let second: Service = cache.get("service:1").await.unwrap().unwrap();

        assert_eq!(second, haircut());
    }

    #[tokio::test]
    async fn test_get_wrong_type_is_serialization_error() {
        let cache = manager();
        cache.set("service:1", &haircut(), None, &[]).await.unwrap();

        let result = cache.get::<u64>("service:1").await;
        assert!(matches!(result, Err(CacheError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = manager();
        cache.set("k", &1, None, &["a"]).await.unwrap();

        assert!(cache.delete("k").await);
        assert!(!cache.delete("k").await);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_tag_invalidation_scenario() {
        let cache = manager();
        cache.set("k1", &"v1", None, &["a"]).await.unwrap();
        cache.set("k2", &"v2", None, &["a", "b"]).await.unwrap();

        assert_eq!(cache.invalidate_by_tag("a").await, 2);
        assert_eq!(cache.invalidate_by_tag("b").await, 0);
        assert_eq!(cache.get::<String>("k2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear_pattern_and_all() {
        let cache = manager();
        cache.set("user:1", &1, None, &[]).await.unwrap();
        cache.set("user:2", &2, None, &[]).await.unwrap();
        cache.set("review:1", &3, None, &[]).await.unwrap();

        assert_eq!(cache.clear(Some("user:*")).await, 2);
        assert_eq!(cache.size().await, 1);
        assert_eq!(cache.clear(None).await, 1);
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry_through_manager() {
        let cache = manager();
        cache
            .set("k", &"v", Some(Duration::from_secs(2)), &[])
            .await
            .unwrap();

        tokio::time::advance(Duration::from_millis(1_999)).await;
        assert_eq!(cache.get::<String>("k").await.unwrap().as_deref(), Some("v"));

        tokio::time::advance(Duration::from_millis(2)).await;
        assert_eq!(cache.get::<String>("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_or_set_memoizes() {
        let cache = manager();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let value: Service = cache
                .get_or_set(
                    "service:1",
                    || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(haircut())
                    },
                    None,
                    &["services"],
                )
                .await
                .unwrap();
            assert_eq!(value, haircut());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_set_failure_writes_nothing() {
        let cache = manager();

        let result: Result<Service> = cache
            .get_or_set(
                "service:1",
                || async { Err(anyhow::anyhow!("backend unavailable")) },
                None,
                &["services"],
            )
            .await;

        let err = assert_err!(result);
        assert_eq!(err.to_string(), "backend unavailable");
        assert!(cache.is_empty().await);
        assert!(cache.debug().await.tags.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_or_set_runs_producers_concurrently_on_miss() {
        let cache = manager();
        let calls = Arc::new(AtomicUsize::new(0));

        let run = |cache: CacheManager, calls: Arc<AtomicUsize>| async move {
            cache
                .get_or_set(
                    "slow",
                    || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(42u32)
                    },
                    None,
                    &[],
                )
                .await
        };

        let (a, b) = tokio::join!(
            run(cache.clone(), calls.clone()),
            run(cache.clone(), calls.clone())
        );
        assert_eq!(a.unwrap(), 42);
        assert_eq!(b.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_or_set_coalesced_runs_one_producer() {
        let cache = manager();
        let calls = Arc::new(AtomicUsize::new(0));

        let run = |cache: CacheManager, calls: Arc<AtomicUsize>| async move {
            cache
                .get_or_set_coalesced(
                    "slow",
                    || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(42u32)
                    },
                    None,
                    &[],
                )
                .await
        };

        let (a, b, c) = tokio::join!(
            run(cache.clone(), calls.clone()),
            run(cache.clone(), calls.clone()),
            run(cache.clone(), calls.clone())
        );
        assert_eq!(a.unwrap(), 42);
        assert_eq!(b.unwrap(), 42);
        assert_eq!(c.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.gates_in_flight(), 0);
    }

    #[tokio::test]
    async fn test_get_or_set_coalesced_retries_after_failure() {
        let cache = manager();

        let failed: Result<u32> = cache
            .get_or_set_coalesced("k", || async { Err(anyhow::anyhow!("boom")) }, None, &[])
            .await;
        assert!(failed.is_err());

        let value: u32 = cache
            .get_or_set_coalesced("k", || async { Ok(7) }, None, &[])
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_or_set_coalesced_cancelled_call_releases_gate() {
        let cache = manager();

        let cancelled = tokio::time::timeout(
            Duration::from_millis(10),
            cache.get_or_set_coalesced(
                "slow",
                || async {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    Ok(1u32)
                },
                None,
                &[],
            ),
        )
        .await;

        assert!(cancelled.is_err());
        assert_eq!(cache.gates_in_flight(), 0);
        assert!(cache.is_empty().await);

        let value: u32 = cache
            .get_or_set_coalesced("slow", || async { Ok(2) }, None, &[])
            .await
            .unwrap();
        assert_eq!(value, 2);
        assert_eq!(cache.gates_in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_expired_through_manager() {
        let cache = manager();
        cache
            .set("short", &1, Some(Duration::from_secs(1)), &["a"])
            .await
            .unwrap();
        cache.set("long", &2, None, &["a"]).await.unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(cache.cleanup_expired().await, 1);
        assert_eq!(cache.size().await, 1);
        assert_eq!(cache.stats().await.expirations, 1);
    }
}
