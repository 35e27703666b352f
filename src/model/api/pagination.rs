use rocket::FromForm;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 500;

/// Pagination query parameters: `page_num` is 1-based.
#[derive(Debug, Clone, Copy, FromForm)]
pub struct PaginationRequest {
    #[field(default = 1)]
    page_num: u32,
    #[field(default = DEFAULT_PAGE_SIZE)]
    page_size: u32,
}

impl PaginationRequest {
    pub fn new(page_num: u32, page_size: u32) -> Self {
        Self {
            page_num,
            page_size,
        }
    }

    /// Reject zero page numbers/sizes and oversized pages.
    pub fn validate(self) -> Result<Self> {
        if self.page_num == 0 || self.page_size == 0 {
            return Err(Error::bad_request(
                "page_num and page_size must be at least 1",
            ));
        }
        if self.page_size > MAX_PAGE_SIZE {
            return Err(Error::bad_request(format!(
                "page_size must be at most {MAX_PAGE_SIZE}"
            )));
        }
        Ok(self)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of items to skip to reach the requested page.
    pub fn skip(&self) -> u64 {
        u64::from(self.page_num.saturating_sub(1)) * u64::from(self.page_size)
    }

    pub fn to_paginated<T>(self, total: u64, items: Vec<T>) -> Paginated<T> {
        Paginated {
            items,
            pagination: PaginationResult {
                page_num: self.page_num,
                page_size: self.page_size,
                total,
            },
        }
    }
}

impl Default for PaginationRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationResult {
    pub page_num: u32,
    pub page_size: u32,
    pub total: u64,
}

/// A page of results plus the information needed to fetch the others.
#[derive(Debug, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: PaginationResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_counts_previous_pages() {
        assert_eq!(PaginationRequest::new(1, 50).skip(), 0);
        assert_eq!(PaginationRequest::new(3, 20).skip(), 40);
    }

    #[test]
    fn validation_bounds() {
        assert!(PaginationRequest::new(0, 10).validate().is_err());
        assert!(PaginationRequest::new(1, 0).validate().is_err());
        assert!(PaginationRequest::new(1, MAX_PAGE_SIZE + 1).validate().is_err());
        assert!(PaginationRequest::new(2, MAX_PAGE_SIZE).validate().is_ok());
    }
}
