use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;
pub const MAX_PAGE: i64 = 1_000_000;

/// `?page=&limit=` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl Pagination {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
        }
    }

    /// Rejects pages past `MAX_PAGE`
    pub fn validate(&self) -> AppResult<()> {
        match self.page {
            Some(page) if page > MAX_PAGE => Err(AppError::Validation(format!(
                "page must be at most {}",
                MAX_PAGE
            ))),
            _ => Ok(()),
        }
    }

    /// 1-based page, clamped to `1..=MAX_PAGE`
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).clamp(1, MAX_PAGE)
    }

    /// Clamped to `1..=MAX_PAGE_SIZE`
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }
}

/// One page of results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, pagination: Pagination, total: i64) -> Self {
        Self {
            items,
            page: pagination.page(),
            limit: pagination.limit(),
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = Pagination::default();
        assert_eq!(p.page(), 1);
        assert_eq!(p.limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_clamping() {
        let p = Pagination::new(0, 1000);
        assert_eq!(p.page(), 1);
        assert_eq!(p.limit(), MAX_PAGE_SIZE);

        let p = Pagination::new(3, 0);
        assert_eq!(p.limit(), 1);
        assert_eq!(p.offset(), 2);
    }

    #[test]
    fn test_page_upper_bound() {
        let p = Pagination::new(i64::MAX, 20);
        assert!(matches!(p.validate(), Err(AppError::Validation(_))));
        assert_eq!(p.page(), MAX_PAGE);
        assert_eq!(p.offset(), (MAX_PAGE - 1) * 20);

        assert!(Pagination::new(MAX_PAGE, MAX_PAGE_SIZE).validate().is_ok());
        assert!(Pagination::new(-5, 10).validate().is_ok());
        assert!(Pagination::default().validate().is_ok());
    }
}
