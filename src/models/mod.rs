use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod cron_job;
pub mod execution_log;

pub use cron_job::*;
pub use execution_log::*;

use crate::config::defaults::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use crate::errors::{AppError, AppResult};

/// Page request shared by every listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number
    pub page: u64,
    pub limit: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl PageRequest {
    pub fn new(page: u64, limit: u64) -> AppResult<Self> {
        if page < 1 {
            return Err(AppError::validation("page must be >= 1"));
        }
        if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
            return Err(AppError::validation(format!(
                "limit must be between 1 and {MAX_PAGE_LIMIT}"
            )));
        }
        Ok(Self { page, limit })
    }

    /// Rows to skip (0-based)
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1) * self.limit
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaginationInfo {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

/// One page of results plus the pagination block
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub pagination: PaginationInfo,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: PageRequest) -> Self {
        Self {
            items,
            pagination: PaginationInfo {
                page: page.page,
                limit: page.limit,
                total,
                total_pages: total.div_ceil(page.limit.max(1)),
            },
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> PaginatedResponse<U> {
        PaginatedResponse {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_bounds() {
        assert!(PageRequest::new(0, 10).is_err());
        assert!(PageRequest::new(1, 0).is_err());
        assert!(PageRequest::new(1, 101).is_err());
        assert_eq!(PageRequest::new(3, 20).unwrap().offset(), 40);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let page = PageRequest::new(1, 20).unwrap();
        let response = PaginatedResponse::new(vec![1, 2, 3], 41, page);
        assert_eq!(response.pagination.total_pages, 3);

        let empty: PaginatedResponse<u8> = PaginatedResponse::new(vec![], 0, page);
        assert_eq!(empty.pagination.total_pages, 0);
    }
}
