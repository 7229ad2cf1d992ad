//! Offset-based pagination shared by resource and message listings.

use serde::Serialize;

/// Fixed page size for the resource listing.
pub const RESOURCE_PAGE_SIZE: i64 = 10;

/// Default page size for category feeds.
pub const DEFAULT_MESSAGE_LIMIT: i64 = 20;

/// Largest page a caller may request from a category feed.
pub const MAX_MESSAGE_LIMIT: i64 = 100;

/// A normalized page request (1-based page, positive limit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    /// Build a request, clamping the page to at least 1 and the limit to `1..=max_limit`.
    pub fn new(page: Option<i64>, limit: i64, max_limit: i64) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.clamp(1, max_limit.max(1)),
        }
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Pagination block returned alongside listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(total: i64, request: PageRequest) -> Self {
        let pages = if total <= 0 {
            0
        } else {
            (total + request.limit - 1) / request.limit
        };

        Self {
            total,
            page: request.page,
            pages,
        }
    }
}
