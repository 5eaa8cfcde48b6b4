//! Data-Fetch Hooks
//!
//! Observable loading/error/success state on top of the cache: a
//! [`Paginator`] for page-shaped endpoints and a [`DataLoader`] for single
//! keyed values. State changes are published through `tokio::sync::watch`.

mod loader;
mod paginator;
mod state;

pub use loader::{DataLoader, DataOptions, DataState, ValueFetcher};
pub use paginator::{PageFetcher, PaginationOptions, PaginationState, Paginator};
pub use state::{error_message, FetchStatus, RequestTracker, DEFAULT_ERROR_MESSAGE};
