use crate::posts::DEFAULT_PAGE_SIZE;

/// Pagination position of the feed being displayed.
///
/// The API has no total count, so `has_more_hint` is only a guess: it is set
/// when the last page came back full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedCursor {
    pub next_page: i64,
    pub limit: i64,
    pub has_more_hint: bool,
}

impl Default for FeedCursor {
    fn default() -> Self {
        Self {
            next_page: 1,
            limit: DEFAULT_PAGE_SIZE,
            has_more_hint: true,
        }
    }
}

impl FeedCursor {
    pub fn reset(&mut self) {
        *self = Self {
            limit: self.limit,
            ..Self::default()
        };
    }

    /// Advances past a page that returned `len` posts.
    pub fn record_page(&mut self, len: usize) {
        self.has_more_hint = len as i64 >= self.limit;
        self.next_page += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_page_hints_more() {
        let mut cursor = FeedCursor::default();
        cursor.record_page(10);
        assert!(cursor.has_more_hint);
        assert_eq!(cursor.next_page, 2);
    }

    #[test]
    fn short_page_ends_the_feed() {
        let mut cursor = FeedCursor::default();
        cursor.record_page(3);
        assert!(!cursor.has_more_hint);
    }

    #[test]
    fn reset_keeps_page_size() {
        let mut cursor = FeedCursor {
            next_page: 4,
            limit: 5,
            has_more_hint: false,
        };
        cursor.reset();
        assert_eq!(cursor.next_page, 1);
        assert_eq!(cursor.limit, 5);
        assert!(cursor.has_more_hint);
    }
}
