//! Request and Response models for the cache layer
//!
//! This module defines the page parameters and envelopes exchanged with
//! fetch functions, plus the store's diagnostic snapshot.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{PaginationParams, SortOrder};
pub use responses::{DebugSnapshot, EntryDebug, PaginatedResponse};
