//! Pagination Cache
//!
//! Caches whole page envelopes in the shared store under deterministic keys.

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::cache::CacheManager;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{PaginatedResponse, PaginationParams};
use crate::pagination::keys::{endpoint_tag, pagination_key};

/// Page-shaped front end to a [`CacheManager`].
#[derive(Clone, Debug)]
pub struct PaginationCache {
    cache: CacheManager,
    /// TTL for pages stored without an explicit one
    default_ttl: Duration,
}

impl PaginationCache {
    pub fn new(cache: CacheManager, default_ttl: Duration) -> Self {
        Self { cache, default_ttl }
    }

    pub fn from_config(cache: CacheManager, config: &Config) -> Self {
        Self::new(cache, config.pagination_ttl())
    }

    /// The underlying shared store.
    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// Returns one page of `endpoint`, from cache when possible.
    ///
    /// On a miss `fetch_fn(params)` is called and its response is stored
    /// verbatim, tagged with `{endpoint}:pagination` and with `tag` when given.
    /// Invalid params are rejected before any lookup.
    pub async fn get_paginated<T, F, Fut>(
        &self,
        endpoint: &str,
        params: &PaginationParams,
        fetch_fn: F,
        ttl: Option<Duration>,
        tag: Option<&str>,
    ) -> Result<PaginatedResponse<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(PaginationParams) -> Fut,
        Fut: Future<Output = anyhow::Result<PaginatedResponse<T>>>,
    {
        if let Some(message) = params.validate() {
            return Err(CacheError::InvalidRequest(message));
        }

        let key = pagination_key(endpoint, params);
        let scope = endpoint_tag(endpoint);
        let mut tags = vec![scope.as_str()];
        if let Some(tag) = tag {
            tags.push(tag);
        }

        let request = params.clone();
        self.cache
            .get_or_set(
                &key,
                move || {
                    debug!("Fetching page: {}", key_for_log(endpoint, &request));
                    fetch_fn(request)
                },
                Some(ttl.unwrap_or(self.default_ttl)),
                &tags,
            )
            .await
    }

    /// Invalidates every cached page of `endpoint`.
    pub async fn invalidate_endpoint(&self, endpoint: &str) -> usize {
        let removed = self.cache.invalidate_by_tag(&endpoint_tag(endpoint)).await;
        info!("Invalidated {} cached pages for {}", removed, endpoint);
        removed
    }

    /// Drops the entire underlying store, not only pagination entries.
    pub async fn clear_all(&self) {
        self.cache.clear(None).await;
    }
}

fn key_for_log(endpoint: &str, params: &PaginationParams) -> String {
    format!("{} page={} limit={}", endpoint, params.page, params.limit)
}
