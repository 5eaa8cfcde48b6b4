//! Cache key and tag derivation for paginated collections.
//!
//! Key layout: `pagination:{endpoint}:{page}:{limit}:{sortBy|default}:{asc|desc}`.
//! Free-text parts escape `%` and `:` so distinct inputs can never produce the
//! same key.

use std::borrow::Cow;

use crate::models::PaginationParams;

pub const KEY_PREFIX: &str = "pagination";

const DEFAULT_SORT: &str = "default";

/// Derives the cache key for one page of `endpoint`.
pub fn pagination_key(endpoint: &str, params: &PaginationParams) -> String {
    let sort_by = params.sort_by.as_deref().unwrap_or(DEFAULT_SORT);
    format!(
        "{}:{}:{}:{}:{}:{}",
        KEY_PREFIX,
        escape(endpoint),
        params.page,
        params.limit,
        escape(sort_by),
        params.sort_order
    )
}

/// Tag carried by every cached page of `endpoint`.
pub fn endpoint_tag(endpoint: &str) -> String {
    format!("{}:{}", endpoint, KEY_PREFIX)
}

fn escape(part: &str) -> Cow<'_, str> {
    if part.contains(|c: char| c == '%' || c == ':') {
        Cow::Owned(part.replace('%', "%25").replace(':', "%3A"))
    } else {
        Cow::Borrowed(part)
    }
}
