//! Pagination view state.

use serde::Serialize;

use crate::api::PageMeta;

/// Page position shown under a list. Derived from the most recent
/// fresh-load response; never authoritative on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationState {
    pub current_page: u32,
    pub per_page: u32,
    pub total: u64,
    pub last_page: u32,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self::new(10)
    }
}

impl PaginationState {
    pub fn new(per_page: u32) -> Self {
        Self {
            current_page: 1,
            per_page: per_page.max(1),
            total: 0,
            last_page: 1,
        }
    }

    /// Request a page. The page is clamped to `[1, last_page]` and the
    /// applied value is returned.
    pub fn change_page(&mut self, page: u32) -> u32 {
        let page = page.clamp(1, self.last_page.max(1));
        self.current_page = page;
        page
    }

    /// Change the page size and go back to the first page.
    pub fn set_per_page(&mut self, per_page: u32) {
        self.per_page = per_page.max(1);
        self.current_page = 1;
    }

    /// Go back to the first page, e.g. after the search text changed.
    pub fn reset_page(&mut self) {
        self.current_page = 1;
    }

    /// Overwrite the state from server metadata.
    ///
    /// Applies only to a fresh load: a background refetch leaves the state
    /// untouched so a push notification never moves the user's page.
    /// Returns whether the metadata was applied.
    pub fn apply_server_meta(&mut self, meta: &PageMeta, refetching: bool) -> bool {
        if refetching {
            return false;
        }
        *self = Self {
            current_page: meta.current_page,
            per_page: meta.items_per_page,
            total: meta.total_items,
            last_page: meta.total_pages.max(1),
        };
        true
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.last_page
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    /// 1-based index range of the rows on the current page, for "11-20 of 25".
    pub fn visible_range(&self, rows_on_page: usize) -> Option<(u64, u64)> {
        if rows_on_page == 0 {
            return None;
        }
        let start = u64::from(self.current_page - 1) * u64::from(self.per_page) + 1;
        Some((start, start + rows_on_page as u64 - 1))
    }
}
