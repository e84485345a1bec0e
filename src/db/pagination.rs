//! Pagination Module
//!
//! Page-size clamping, offset math and result bookkeeping for list queries.

use serde::{Deserialize, Serialize};

/// Smallest page size a list query will use.
pub const MIN_ITEMS_PER_PAGE: i64 = 10;

/// Largest page size a list query will use.
pub const MAX_ITEMS_PER_PAGE: i64 = 100;

// == Pagination Metadata ==
/// Caller-owned page request that the repository fills with result counts.
///
/// The accessor methods normalize the raw fields in place, so a value read
/// back after a list query reflects the page that was actually served.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMetadata {
    /// Requested page size, clamped to [10, 100] on use
    pub items_per_page: i64,
    /// Number of records on the returned page
    pub item_count: i64,
    /// Number of records matching the query across all pages
    pub total_item: i64,
    /// Requested page (1-based), clamped to >= 1 on use
    pub current_page: i64,
    /// Number of pages at the effective page size
    pub total_page: i64,
}

impl PaginationMetadata {
    // == Constructor ==
    /// Creates a page request. Out-of-range values are clamped on use.
    pub fn new(current_page: i64, items_per_page: i64) -> Self {
        Self {
            items_per_page,
            current_page,
            ..Self::default()
        }
    }

    // == Items Per Page ==
    /// Returns the page size clamped into [10, 100], storing it back.
    pub fn effective_items_per_page(&mut self) -> i64 {
        self.items_per_page = self
            .items_per_page
            .clamp(MIN_ITEMS_PER_PAGE, MAX_ITEMS_PER_PAGE);
        self.items_per_page
    }

    // == Current Page ==
    /// Returns the current page clamped to at least 1, storing it back.
    pub fn effective_current_page(&mut self) -> i64 {
        self.current_page = self.current_page.max(1);
        self.current_page
    }

    // == Normalize ==
    /// Clamps both request fields once. Idempotent.
    pub fn normalize(&mut self) {
        self.effective_items_per_page();
        self.effective_current_page();
    }

    // == Offset ==
    /// Number of records to skip for the current page. Never negative.
    pub fn offset(&mut self) -> i64 {
        let page = self.effective_current_page();
        let per_page = self.effective_items_per_page();
        (page - 1).saturating_mul(per_page)
    }

    // == Apply Count ==
    /// Records the total match count and derives the page count from it.
    pub fn apply_count(&mut self, total_item: i64) {
        let per_page = self.effective_items_per_page();
        self.total_item = total_item.max(0);
        self.total_page = self.total_item / per_page + i64::from(self.total_item % per_page != 0);
    }

    // == Apply Page Length ==
    /// Records how many records the fetched page holds.
    pub fn apply_page_len(&mut self, len: usize) {
        self.item_count = i64::try_from(len).unwrap_or(i64::MAX);
    }
}
