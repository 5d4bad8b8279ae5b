use serde::{Deserialize, Serialize};

use crate::constants::MAX_PAGE_SIZE;

/// `page` is 1-based; `limit` falls back to the endpoint's page size.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn page_size(&self, default: i64) -> i64 {
        self.limit.unwrap_or(default).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Saturates for huge pages, which then read past the last row.
    pub fn offset(&self, default: i64) -> i64 {
        (self.page() - 1).saturating_mul(self.page_size(default))
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PageContext<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

impl<T> PageContext<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, page_size: i64, current_page: i64) -> Self {
        if rows.is_empty() {
            return Self::no_rows(total_rows, current_page);
        }
        let next = if current_page.saturating_mul(page_size) < total_rows {
            Some(current_page + 1)
        } else {
            None
        };

        Self {
            count: total_rows,
            next,
            previous: Self::previous_page(current_page),
            results: rows,
        }
    }

    pub fn no_rows(total_rows: i64, current_page: i64) -> Self {
        Self {
            count: total_rows,
            next: None,
            previous: Self::previous_page(current_page),
            results: vec![],
        }
    }

    fn previous_page(current_page: i64) -> Option<i64> {
        if current_page > 1 {
            Some(current_page - 1)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_links_forward_only() {
        let page = PageContext::from_rows(vec![1, 2], 5, 2, 1);

        assert_eq!(page.count, 5);
        assert_eq!(page.next, Some(2));
        assert_eq!(page.previous, None);
    }

    #[test]
    fn last_page_links_backward_only() {
        let page = PageContext::from_rows(vec![5], 5, 2, 3);

        assert_eq!(page.next, None);
        assert_eq!(page.previous, Some(2));
    }

    #[test]
    fn query_clamps_limit_and_page() {
        let query = PageQuery {
            page: Some(0),
            limit: Some(10_000),
        };

        assert_eq!(query.page(), 1);
        assert_eq!(query.page_size(6), MAX_PAGE_SIZE);
        assert_eq!(query.offset(6), 0);

        let query = PageQuery {
            page: Some(3),
            limit: None,
        };
        assert_eq!(query.offset(6), 12);
    }

    #[test]
    fn huge_page_saturates_offset() {
        let query = PageQuery {
            page: Some(i64::MAX),
            limit: Some(100),
        };

        assert_eq!(query.page(), i64::MAX);
        assert_eq!(query.offset(6), i64::MAX);

        let page = PageContext::<i32>::from_rows(vec![], 3, 100, query.page());
        assert_eq!(page.count, 3);
        assert_eq!(page.next, None);
        assert_eq!(page.previous, Some(i64::MAX - 1));
    }
}
