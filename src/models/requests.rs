//! Request models for paginated fetches
//!
//! Defines the parameters handed to a page fetch function.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sort direction for a paginated collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for one page of a collection.
///
/// # Fields
/// - `page`: 1-based page number
/// - `limit`: page size
/// - `sort_by`: optional sort field
/// - `sort_order`: sort direction (ascending unless specified)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationParams {
    pub page: u64,
    pub limit: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl PaginationParams {
    /// Creates params for `page` of size `limit`, unsorted.
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page,
            limit,
            sort_by: None,
            sort_order: SortOrder::Asc,
        }
    }

    /// Sets the sort field and direction.
    pub fn with_sort(mut self, sort_by: impl Into<String>, sort_order: SortOrder) -> Self {
        self.sort_by = Some(sort_by.into());
        self.sort_order = sort_order;
        self
    }

    /// Number of items preceding this page.
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    /// Validates the params
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.page < 1 {
            return Some("page must be at least 1".to_string());
        }
        if self.limit < 1 {
            return Some("limit must be at least 1".to_string());
        }
        None
    }
}
