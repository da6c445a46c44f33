use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// One page of a ranked listing plus the envelope callers use to navigate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    /// Builds the envelope. `page` and `page_size` must already be clamped.
    pub fn new(items: Vec<T>, total_count: u64, page: u32, page_size: u32) -> Self {
        let total_pages = total_count.div_ceil(u64::from(page_size));
        Self {
            items,
            total_count,
            page,
            page_size,
            total_pages,
            has_next: u64::from(page) < total_pages,
            has_previous: page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_navigation_for_middle_page() {
        let page = Page::new(vec![(); 10], 25, 2, 10);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next);
        assert!(page.has_previous);
    }

    #[test]
    fn last_page_has_no_next() {
        let page = Page::new(vec![(); 5], 25, 3, 10);
        assert!(!page.has_next);
        assert!(page.has_previous);
    }

    #[test]
    fn empty_listing_has_zero_pages() {
        let page: Page<()> = Page::new(vec![], 0, 1, 20);
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_next);
        assert!(!page.has_previous);
    }

    #[test]
    fn exact_multiple_does_not_add_a_page() {
        let page: Page<()> = Page::new(vec![], 30, 1, 10);
        assert_eq!(page.total_pages, 3);
    }
}
