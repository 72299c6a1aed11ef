pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Row window a 1-based page number maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: i64,
    pub limit: i64,
}

/// Turns page numbers into `(offset, limit)` windows.
///
/// Page 1 and anything below it map to offset 0; page `n` starts at
/// `page_size * (n - 1)`. There is no upper bound, past-the-end pages simply
/// come back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindower {
    page_size: i64,
}

impl PageWindower {
    pub fn new(page_size: i64) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    pub fn window(&self, page: i64) -> PageWindow {
        let offset = if page <= 1 {
            0
        } else {
            self.page_size.saturating_mul(page - 1)
        };
        PageWindow {
            offset,
            limit: self.page_size,
        }
    }
}

impl Default for PageWindower {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_page_offsets() {
        let pages = PageWindower::default();
        assert_eq!(pages.window(1).offset, 0);
        assert_eq!(pages.window(2).offset, 10);
        assert_eq!(pages.window(5).offset, 40);
        assert_eq!(pages.window(5).limit, 10);
    }

    #[test]
    fn zero_and_negative_pages_start_at_zero() {
        let pages = PageWindower::default();
        assert_eq!(pages.window(0), PageWindow { offset: 0, limit: 10 });
        assert_eq!(pages.window(-3).offset, 0);
        assert_eq!(pages.window(i64::MIN).offset, 0);
    }

    #[test]
    fn custom_page_size() {
        let pages = PageWindower::new(25);
        assert_eq!(pages.window(3), PageWindow { offset: 50, limit: 25 });
    }

    #[test]
    fn huge_page_saturates() {
        let pages = PageWindower::default();
        assert_eq!(pages.window(i64::MAX).offset, i64::MAX);
    }
}
