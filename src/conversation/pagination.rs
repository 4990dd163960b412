//! Fixed-size pages over an already materialised list.

/// Items per page for listings and search results.
pub const PAGE_SIZE: usize = 5;

/// A resolved page: the requested index clamped into range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Zero-based page index.
    pub index: usize,
    pub total_pages: usize,
    /// Item range covered by this page.
    pub start: usize,
    pub end: usize,
}

impl Page {
    /// Resolves page `requested` over `total_items`.
    ///
    /// An empty list still has one (empty) page so callers never divide by
    /// zero or index out of range.
    #[must_use]
    pub fn resolve(requested: usize, total_items: usize, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        let total_pages = total_items.div_ceil(page_size).max(1);
        let index = requested.min(total_pages - 1);
        let start = index * page_size;
        let end = (start + page_size).min(total_items);

        Self {
            index,
            total_pages,
            start: start.min(total_items),
            end,
        }
    }

    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.index > 0
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.index + 1 < self.total_pages
    }

    /// Index after one step back, saturating at the first page.
    #[must_use]
    pub const fn prev(&self) -> usize {
        self.index.saturating_sub(1)
    }

    /// Index after one step forward, saturating at the last page.
    #[must_use]
    pub const fn next(&self) -> usize {
        if self.has_next() { self.index + 1 } else { self.index }
    }

    /// Slice of `items` covered by this page.
    #[must_use]
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[self.start..self.end]
    }

    /// `Page x of y` label.
    #[must_use]
    pub fn label(&self) -> String {
        format!("Page {} of {}", self.index + 1, self.total_pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_pages() {
        let page = Page::resolve(0, 12, 5);
        assert_eq!((page.start, page.end, page.total_pages), (0, 5, 3));
        assert!(!page.has_prev());
        assert!(page.has_next());

        let page = Page::resolve(2, 12, 5);
        assert_eq!((page.start, page.end), (10, 12));
        assert!(page.has_prev());
        assert!(!page.has_next());
        assert_eq!(page.label(), "Page 3 of 3");
    }

    #[test]
    fn test_out_of_range_page_is_clamped() {
        let page = Page::resolve(9, 6, 5);
        assert_eq!(page.index, 1);
        assert_eq!((page.start, page.end), (5, 6));
    }

    #[test]
    fn test_empty_list_has_one_page() {
        let page = Page::resolve(3, 0, 5);
        assert_eq!(page.index, 0);
        assert_eq!(page.total_pages, 1);
        assert!(page.slice::<u8>(&[]).is_empty());
    }

    #[test]
    fn test_prev_next_saturate() {
        let first = Page::resolve(0, 10, 5);
        assert_eq!(first.prev(), 0);
        assert_eq!(first.next(), 1);

        let last = Page::resolve(1, 10, 5);
        assert_eq!(last.next(), 1);
        assert_eq!(last.prev(), 0);
    }

    #[test]
    fn test_exact_multiple() {
        let page = Page::resolve(1, 10, 5);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.slice(&(0..10).collect::<Vec<_>>()), &[5, 6, 7, 8, 9]);
    }
}
