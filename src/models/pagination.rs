//! Pagination types shared by list endpoints

use serde::{Deserialize, Serialize};

/// Maximum page size a client may request
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pagination parameters for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 6,
        }
    }
}

impl ListParams {
    /// Create new pagination parameters
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    /// Create a new paginated result
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    /// Calculate the total number of pages
    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 || self.total <= 0 {
            return 0;
        }
        let total = self.total as u64;
        let per_page = self.per_page as u64;
        total.div_ceil(per_page) as u32
    }

    /// Check if there is a next page
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Check if there is a previous page
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Transform the items, keeping the paging metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_params_clamps() {
        let params = ListParams::new(0, 1000);
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, MAX_PAGE_SIZE);

        let params = ListParams::new(3, 0);
        assert_eq!(params.per_page, 1);
        assert_eq!(params.offset(), 2);
    }

    #[test]
    fn test_list_params_offset() {
        let params = ListParams::new(3, 6);
        assert_eq!(params.offset(), 12);
        assert_eq!(params.limit(), 6);
    }

    #[test]
    fn test_paged_result_navigation() {
        let params = ListParams::new(2, 6);
        let page = PagedResult::new(vec![1, 2, 3, 4, 5, 6], 13, &params);

        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());
        assert!(page.has_prev());

        let last = PagedResult::new(vec![13], 13, &ListParams::new(3, 6));
        assert!(!last.has_next());
    }

    #[test]
    fn test_paged_result_empty() {
        let page: PagedResult<i32> = PagedResult::new(vec![], 0, &ListParams::default());
        assert_eq!(page.total_pages(), 0);
        assert!(!page.has_next());
        assert!(!page.has_prev());
    }

    #[test]
    fn test_paged_result_map() {
        let page = PagedResult::new(vec![1, 2], 2, &ListParams::new(1, 6));
        let mapped = page.map(|n| n * 10);
        assert_eq!(mapped.items, vec![10, 20]);
        assert_eq!(mapped.total, 2);
    }
}
