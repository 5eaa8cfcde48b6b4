//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache layer.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Invalid request parameters (e.g. page or limit of zero)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Payload could not be copied into or out of the store
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The fetch function or producer failed
    #[error(transparent)]
    Fetch(#[from] anyhow::Error),
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;
