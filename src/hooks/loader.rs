//! Data Loader
//!
//! Loading/error/success state for a single cached value stored under an
//! explicit key.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::cache::CacheManager;
use crate::error::Result;
use crate::hooks::state::{error_message, FetchStatus, RequestTracker};

/// Boxed single-value fetch function.
pub type ValueFetcher<T> = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync>;

/// Construction options for a [`DataLoader`].
#[derive(Debug, Clone)]
pub struct DataOptions {
    /// Cache key the value is stored under
    pub key: String,
    pub tag: Option<String>,
    /// Entry TTL; the store default when None
    pub ttl: Option<Duration>,
    /// Suppress every fetch until `set_skip(false)`
    pub skip: bool,
    /// Message shown when a failure carries no text
    pub error_message: Option<String>,
}

impl DataOptions {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            tag: None,
            ttl: None,
            skip: false,
            error_message: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_skip(mut self, skip: bool) -> Self {
        self.skip = skip;
        self
    }

    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

/// Observable state of a [`DataLoader`].
#[derive(Debug, Clone, PartialEq)]
pub struct DataState<T> {
    pub status: FetchStatus,
    pub data: Option<T>,
    pub is_loading: bool,
    pub error: Option<String>,
}

struct Shared<T> {
    cache: CacheManager,
    fetch_fn: ValueFetcher<T>,
    options: DataOptions,
    state: watch::Sender<DataState<T>>,
    requests: RequestTracker,
    skip: AtomicBool,
}

/// Cache-backed loader for one value.
///
/// Must be created inside a tokio runtime. Dropping the loader disposes it.
pub struct DataLoader<T> {
    shared: Arc<Shared<T>>,
}

impl<T> DataLoader<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Creates a loader and starts loading unless `options.skip` is set.
    pub fn new<F, Fut>(cache: CacheManager, fetch_fn: F, options: DataOptions) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let skip = options.skip;
        let (state, _) = watch::channel(DataState {
            status: if skip {
                FetchStatus::Idle
            } else {
                FetchStatus::Loading
            },
            data: None,
            is_loading: !skip,
            error: None,
        });

        let loader = Self {
            shared: Arc::new(Shared {
                cache,
                fetch_fn: Arc::new(move || fetch_fn().boxed()),
                options,
                state,
                requests: RequestTracker::new(),
                skip: AtomicBool::new(skip),
            }),
        };
        loader.load(false);
        loader
    }

    pub fn key(&self) -> &str {
        &self.shared.options.key
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> DataState<T> {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DataState<T>> {
        self.shared.state.subscribe()
    }

    /// Waits until no fetch is pending and returns that state.
    pub async fn settled(&self) -> DataState<T> {
        if self.shared.requests.is_disposed() {
            return self.state();
        }
        let mut rx = self.shared.state.subscribe();
        let settled = match rx.wait_for(|state| !state.is_loading).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        settled
    }

    /// Fetches a fresh value without reading the cache, then stores it under
    /// the same key and tag. Does nothing while skipped.
    pub fn refetch(&self) {
        self.load(true);
    }

    /// Turns fetching off or on. Turning it on loads through the cache.
    pub fn set_skip(&self, skip: bool) {
        self.shared.skip.store(skip, Ordering::SeqCst);
        if skip {
            self.shared.state.send_if_modified(|state| {
                // Anything still in flight is now stale
                self.shared.requests.issue();
                let was_loading = state.is_loading;
                if was_loading {
                    state.is_loading = false;
                    state.status = FetchStatus::Idle;
                }
                was_loading
            });
        } else {
            self.load(false);
        }
    }

    /// Stops applying fetch results to this loader.
    pub fn dispose(&self) {
        self.shared.requests.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.requests.is_disposed()
    }

    fn load(&self, bypass_cache: bool) {
        let shared = &self.shared;
        if shared.requests.is_disposed() || shared.skip.load(Ordering::SeqCst) {
            return;
        }

        let mut token = 0;
        shared.state.send_modify(|state| {
            state.is_loading = true;
            state.status = FetchStatus::Loading;
            token = shared.requests.issue();
        });

        tokio::spawn(Shared::fetch(Arc::clone(shared), token, bypass_cache));
    }
}

impl<T> Shared<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn tags(&self) -> Vec<&str> {
        self.options.tag.as_deref().into_iter().collect()
    }

    async fn fetch(self: Arc<Self>, token: u64, bypass_cache: bool) {
        let key = self.options.key.as_str();
        let ttl = self.options.ttl;
        let fetch_fn = Arc::clone(&self.fetch_fn);

        let result = if bypass_cache {
            self.fetch_and_store(key, ttl).await
        } else {
            self.cache
                .get_or_set(key, move || fetch_fn(), ttl, &self.tags())
                .await
        };

        self.apply(token, result);
    }

    async fn fetch_and_store(&self, key: &str, ttl: Option<Duration>) -> Result<T> {
        let value = (self.fetch_fn)().await?;
        self.cache.set(key, &value, ttl, &self.tags()).await?;
        Ok(value)
    }

    fn apply(&self, token: u64, result: Result<T>) {
        if self.requests.is_disposed() {
            debug!("Loader for {} disposed, dropping response", self.options.key);
            return;
        }

        self.state.send_if_modified(|state| {
            if !self.requests.is_current(token) {
                debug!("Discarding stale value for {} (request {})", self.options.key, token);
                return false;
            }

            match result {
                Ok(value) => {
                    state.data = Some(value);
                    state.error = None;
                    state.status = FetchStatus::Success;
                }
                Err(err) => {
                    let message = error_message(&err, self.options.error_message.as_deref());
                    warn!("Fetch failed for {}: {}", self.options.key, message);
                    state.data = None;
                    state.error = Some(message);
                    state.status = FetchStatus::Error;
                }
            }
            state.is_loading = false;
            true
        });
    }
}

impl<T> Drop for DataLoader<T> {
    fn drop(&mut self) {
        self.shared.requests.dispose();
    }
}
