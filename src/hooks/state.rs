//! Fetch lifecycle state shared by the paginator and the data loader.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::Serialize;

use crate::error::CacheError;

/// Message used when a failure carries no text and the caller gave no fallback.
pub const DEFAULT_ERROR_MESSAGE: &str = "Failed to load data";

/// Lifecycle of the most recent fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    /// Nothing requested yet (or fetching is skipped)
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// Turns a fetch failure into the string exposed as `error`.
///
/// Uses the failure's own text, then `fallback`, then [`DEFAULT_ERROR_MESSAGE`].
pub fn error_message(err: &CacheError, fallback: Option<&str>) -> String {
    let message = err.to_string();
    if !message.trim().is_empty() {
        return message;
    }
    fallback.unwrap_or(DEFAULT_ERROR_MESSAGE).to_string()
}

/// Issues request tokens and tracks disposal for one hook instance.
///
/// Only the response to the most recently issued token may be applied.
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: AtomicU64,
    disposed: AtomicBool,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a new token, superseding every earlier one.
    pub fn issue(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, token: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == token
    }

    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}
