//! Pagination and filtering types for recipe listings.

use serde::Serialize;

/// Filter applied to recipe listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    /// Free-text search, matched against the normalized search text
    pub search: Option<String>,
}

impl RecipeFilter {
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
        }
    }
}

/// One page of results plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    /// Number of pages needed to show `total` items at `limit` per page.
    pub fn total_pages(&self, limit: u64) -> u64 {
        if limit == 0 {
            return 0;
        }
        self.total.div_ceil(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages() {
        let page = Page::<u8> { items: vec![], total: 21 };
        assert_eq!(page.total_pages(10), 3);
        assert_eq!(page.total_pages(21), 1);
        assert_eq!(page.total_pages(0), 0);
        assert_eq!(Page::<u8> { items: vec![], total: 0 }.total_pages(10), 0);
    }
}
