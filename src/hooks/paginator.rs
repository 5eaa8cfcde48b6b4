//! Paginator
//!
//! Binds page navigation state to the pagination cache. Every page or limit
//! change publishes a `loading` state and starts a cache-backed fetch on a
//! tokio task; the settled result is published through a watch channel.

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

use crate::config::Config;
use crate::error::Result;
use crate::hooks::state::{error_message, FetchStatus, RequestTracker};
use crate::models::{PaginatedResponse, PaginationParams, SortOrder};
use crate::pagination::{pagination_key, PaginationCache};

/// Boxed page fetch function.
pub type PageFetcher<T> = Arc<
    dyn Fn(PaginationParams) -> BoxFuture<'static, anyhow::Result<PaginatedResponse<T>>>
        + Send
        + Sync,
>;

/// Construction options for a [`Paginator`].
#[derive(Debug, Clone)]
pub struct PaginationOptions {
    /// First page to load. Not checked against the page count, which is only
    /// known after the first response. A start past the last page stays put:
    /// `previous_page` targets a page that is still out of range, so use
    /// `go_to_page` with a valid page to recover.
    pub initial_page: u64,
    pub initial_limit: u64,
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
    /// Page TTL; the pagination cache default when None
    pub ttl: Option<Duration>,
    /// Extra tag attached to every cached page
    pub tag: Option<String>,
    /// Suppress fetching until `set_skip(false)`
    pub skip: bool,
    /// Message shown when a failure carries no text
    pub error_message: Option<String>,
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self {
            initial_page: 1,
            initial_limit: 10,
            sort_by: None,
            sort_order: SortOrder::Asc,
            ttl: None,
            tag: None,
            skip: false,
            error_message: None,
        }
    }
}

impl PaginationOptions {
    /// Defaults with the configured page size.
    pub fn from_config(config: &Config) -> Self {
        Self {
            initial_limit: config.default_page_limit,
            ..Self::default()
        }
    }

    pub fn with_page(mut self, page: u64) -> Self {
        self.initial_page = page;
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.initial_limit = limit;
        self
    }

    pub fn with_sort(mut self, sort_by: impl Into<String>, sort_order: SortOrder) -> Self {
        self.sort_by = Some(sort_by.into());
        self.sort_order = sort_order;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
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

/// Observable state of a [`Paginator`].
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationState<T> {
    pub status: FetchStatus,
    pub data: Vec<T>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    /// Zero until the first successful response
    pub pages: u64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl<T> PaginationState<T> {
    fn initial(page: u64, limit: u64, skip: bool) -> Self {
        Self {
            status: if skip {
                FetchStatus::Idle
            } else {
                FetchStatus::Loading
            },
            data: Vec::new(),
            is_loading: !skip,
            error: None,
            page,
            limit,
            total: 0,
            pages: 0,
            has_next_page: false,
            has_previous_page: false,
        }
    }

    /// `(page, limit)` to move to, or None when `page` is out of range.
    fn target(&self, page: u64) -> Option<(u64, u64)> {
        if page < 1 || (self.pages > 0 && page > self.pages) {
            return None;
        }
        Some((page, self.limit))
    }
}

struct Shared<T> {
    cache: PaginationCache,
    endpoint: String,
    fetch_fn: PageFetcher<T>,
    options: PaginationOptions,
    state: watch::Sender<PaginationState<T>>,
    requests: RequestTracker,
    skip: AtomicBool,
}

/// Page navigation over a cached, paginated collection.
///
/// Must be created inside a tokio runtime. Dropping the paginator disposes it:
/// in-flight fetches still complete (and populate the cache) but no longer
/// update its state.
pub struct Paginator<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Paginator<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Creates a paginator over `endpoint` and fetches the initial page unless
    /// `options.skip` is set.
    pub fn new<F, Fut>(
        cache: PaginationCache,
        endpoint: impl Into<String>,
        fetch_fn: F,
        options: PaginationOptions,
    ) -> Self
    where
        F: Fn(PaginationParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<PaginatedResponse<T>>> + Send + 'static,
    {
        let page = options.initial_page.max(1);
        let limit = options.initial_limit.max(1);
        let (state, _) = watch::channel(PaginationState::initial(page, limit, options.skip));
        let fetch_fn: PageFetcher<T> = Arc::new(move |params| fetch_fn(params).boxed());

        let paginator = Self {
            shared: Arc::new(Shared {
                cache,
                endpoint: endpoint.into(),
                fetch_fn,
                skip: AtomicBool::new(options.skip),
                options,
                state,
                requests: RequestTracker::new(),
            }),
        };
        paginator.navigate(false, |state| Some((state.page, state.limit)));
        paginator
    }

    pub fn endpoint(&self) -> &str {
        &self.shared.endpoint
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> PaginationState<T> {
        self.shared.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<PaginationState<T>> {
        self.shared.state.subscribe()
    }

    /// Waits until no fetch is pending and returns that state.
    ///
    /// Returns the current state immediately once disposed.
    pub async fn settled(&self) -> PaginationState<T> {
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

    /// Moves to page `page`. Ignored when `page < 1` or, once the page count
    /// is known, `page > pages`.
    pub fn go_to_page(&self, page: u64) {
        self.navigate(false, |state| state.target(page));
    }

    /// Moves forward one page when the last response reported a next page.
    pub fn next_page(&self) {
        self.navigate(false, |state| {
            if state.has_next_page {
                state.target(state.page + 1)
            } else {
                None
            }
        });
    }

    /// Moves back one page when the last response reported a previous page.
    pub fn previous_page(&self) {
        self.navigate(false, |state| {
            if state.has_previous_page {
                state.target(state.page.saturating_sub(1))
            } else {
                None
            }
        });
    }

    /// Changes the page size and starts over from page 1. Ignores zero.
    pub fn set_limit(&self, limit: u64) {
        self.navigate(false, |_| (limit > 0).then_some((1, limit)));
    }

    /// Drops the cached copy of the current page and fetches it again.
    pub fn refetch(&self) {
        self.navigate(true, |state| Some((state.page, state.limit)));
    }

    /// Turns fetching off or on. Turning it on fetches the current page.
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
            self.navigate(false, |state| Some((state.page, state.limit)));
        }
    }

    /// Stops applying fetch results to this paginator.
    pub fn dispose(&self) {
        self.shared.requests.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.requests.is_disposed()
    }

    /// Applies a page/limit change and starts the matching fetch.
    ///
    /// `change` returns the new `(page, limit)` or None to leave everything
    /// untouched. The token is issued under the state lock so it orders with
    /// the state it was issued for.
    fn navigate<C>(&self, bypass_cache: bool, change: C)
    where
        C: FnOnce(&PaginationState<T>) -> Option<(u64, u64)>,
    {
        let shared = &self.shared;
        if shared.requests.is_disposed() {
            return;
        }
        let skip = shared.skip.load(Ordering::SeqCst);

        let mut request = None;
        shared.state.send_if_modified(|state| {
            let Some((page, limit)) = change(&*state) else {
                return false;
            };
            state.page = page;
            state.limit = limit;
            if skip {
                return true;
            }
            state.is_loading = true;
            state.status = FetchStatus::Loading;
            request = Some((shared.requests.issue(), shared.params(page, limit)));
            true
        });

        if let Some((token, params)) = request {
            tokio::spawn(Shared::fetch(Arc::clone(shared), token, params, bypass_cache));
        }
    }
}

impl<T> Shared<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn params(&self, page: u64, limit: u64) -> PaginationParams {
        PaginationParams {
            page,
            limit,
            sort_by: self.options.sort_by.clone(),
            sort_order: self.options.sort_order,
        }
    }

    async fn fetch(self: Arc<Self>, token: u64, params: PaginationParams, bypass_cache: bool) {
        if bypass_cache {
            let key = pagination_key(&self.endpoint, &params);
            self.cache.cache().delete(&key).await;
        }

        let fetch_fn = Arc::clone(&self.fetch_fn);
        let result = self
            .cache
            .get_paginated(
                &self.endpoint,
                &params,
                move |params| fetch_fn(params),
                self.options.ttl,
                self.options.tag.as_deref(),
            )
            .await;

        self.apply(token, result);
    }

    fn apply(&self, token: u64, result: Result<PaginatedResponse<T>>) {
        if self.requests.is_disposed() {
            debug!("Paginator for {} disposed, dropping response", self.endpoint);
            return;
        }

        self.state.send_if_modified(|state| {
            if !self.requests.is_current(token) {
                debug!(
                    "Discarding stale response for {} (request {})",
                    self.endpoint, token
                );
                return false;
            }

            match result {
                Ok(response) => {
                    state.data = response.data;
                    state.total = response.total;
                    state.pages = response.pages;
                    state.has_next_page = response.has_next_page;
                    state.has_previous_page = response.has_previous_page;
                    state.error = None;
                    state.status = FetchStatus::Success;
                }
                Err(err) => {
                    let message = error_message(&err, self.options.error_message.as_deref());
                    warn!("Fetch failed for {} page {}: {}", self.endpoint, state.page, message);
                    state.data.clear();
                    state.error = Some(message);
                    state.status = FetchStatus::Error;
                }
            }
            state.is_loading = false;
            true
        });
    }
}

impl<T> Drop for Paginator<T> {
    fn drop(&mut self) {
        self.shared.requests.dispose();
    }
}
