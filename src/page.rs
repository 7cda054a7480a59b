//! Pagination arithmetic for list endpoints.
//!
//! Pure functions only, no store access. Out-of-range inputs are corrected
//! silently instead of rejected.

use serde::Serialize;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 200;

/// One page's worth of range, derived from the request's query params.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub page_size: u32,
}

impl Page {
    pub fn from_params(page: Option<u32>, page_size: Option<u32>) -> Self {
        let page = page.unwrap_or(DEFAULT_PAGE).max(1);
        let page_size = page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        Page { page, page_size }
    }

    /// Widened to u64 so `page = u32::MAX` cannot overflow the multiply.
    pub fn offset(&self) -> u64 {
        (u64::from(self.page) - 1) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u32 {
        self.page_size
    }
}

/// The pagination block attached to list responses.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PageMeta {
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub pages: u64,
}

impl PageMeta {
    pub fn new(total: u64, page: &Page) -> Self {
        PageMeta {
            total,
            page: page.page,
            page_size: page.page_size,
            pages: page_count(total, page.page_size),
        }
    }
}

fn page_count(total: u64, page_size: u32) -> u64 {
    if page_size == 0 {
        // unreachable after clamping, defined as 1 anyway
        return 1;
    }
    total.div_ceil(page_size as u64)
}
