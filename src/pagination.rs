// src/pagination.rs

use serde::{Deserialize, Serialize};

/// Fixed page size used by every paginated listing.
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Query parameters shared by page-numbered listings.
#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
}

impl PageParams {
    /// 1-based page number, clamped to at least 1.
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }
}

/// Pagination metadata returned alongside every page of items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_items: i64,
    pub items_per_page: i64,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page: Option<i64>,
    pub previous_page: Option<i64>,
}

impl Pagination {
    pub fn new(page: i64, page_size: i64, total_items: i64) -> Self {
        let page = page.max(1);
        let total_pages = (total_items + page_size - 1) / page_size;
        let has_next = page < total_pages;
        let has_previous = page > 1;

        Self {
            current_page: page,
            total_pages,
            total_items,
            items_per_page: page_size,
            has_next,
            has_previous,
            next_page: has_next.then(|| page + 1),
            previous_page: has_previous.then(|| page - 1),
        }
    }

    /// An empty page, used when the privacy gate denies an author listing.
    pub fn empty(page: i64, page_size: i64) -> Self {
        Self::new(page, page_size, 0)
    }
}

/// SQL OFFSET for a 1-based page number.
pub fn offset(page: i64, page_size: i64) -> i64 {
    (page.max(1) - 1) * page_size
}
