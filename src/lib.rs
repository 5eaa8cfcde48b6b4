//! Barbershop Cache - client-side caching for the booking platform
//!
//! In-memory TTL cache with tag invalidation, a page-keyed cache for list
//! endpoints, and fetch hooks that expose loading/error/success state.

pub mod cache;
pub mod config;
pub mod error;
pub mod hooks;
pub mod models;
pub mod pagination;
pub mod tasks;

pub use cache::CacheManager;
pub use config::Config;
pub use error::{CacheError, Result};
pub use hooks::{DataLoader, DataOptions, PaginationOptions, Paginator};
pub use models::{PaginatedResponse, PaginationParams, SortOrder};
pub use pagination::PaginationCache;
pub use tasks::spawn_cleanup_task;
