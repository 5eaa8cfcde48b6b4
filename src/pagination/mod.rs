//! Pagination Module
//!
//! Deterministic page keys and the page-shaped cache built on the shared store.

mod cache;
pub mod keys;

pub use cache::PaginationCache;
pub use keys::{endpoint_tag, pagination_key};
